//! HTTP API route definitions.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{
    divergence, health, live_analysis, live_projection, metrics_text, projection, AppState,
};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        // Projection endpoints
        .route("/api/v1/projection", post(projection))
        .route("/api/v1/projection/live", post(live_projection))
        // Analysis endpoints
        .route("/api/v1/divergence", post(divergence))
        .route("/api/v1/analysis/live", post(live_analysis))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
