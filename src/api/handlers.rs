//! HTTP API handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::DivergenceResult;
use crate::error::ValidationError;
use crate::market::{LiveObservation, Trajectory};
use crate::metrics;
use crate::projection::validate_minute;
use crate::report::{LiveReport, MatchAnalyzer, PreMatchReport};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Analyzer shared read-only across requests.
    pub analyzer: Arc<MatchAnalyzer>,
    /// Prometheus handle, present when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state with default tables and no metrics exporter.
    pub fn new() -> Self {
        Self::with_analyzer(MatchAnalyzer::default())
    }

    /// Create app state around a configured analyzer.
    pub fn with_analyzer(analyzer: MatchAnalyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `GET /metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Rejected request, rendered as 422 with a JSON body.
#[derive(Debug)]
pub struct ApiError(pub ValidationError);

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %self.0, "request rejected");
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
    }
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable reason.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Full projection request.
#[derive(Debug, Deserialize)]
pub struct ProjectionRequest {
    /// Opening side A price.
    pub initial_side_a: Decimal,
}

/// Live continuation request.
#[derive(Debug, Deserialize)]
pub struct LiveProjectionRequest {
    /// Opening side A price.
    pub initial_side_a: Decimal,
    /// Live side A price.
    pub current_side_a: Decimal,
    /// Current match minute.
    pub minute: u32,
}

/// Live continuation response.
#[derive(Debug, Serialize)]
pub struct LiveProjectionResponse {
    /// Minute the continuation starts after.
    pub minute: u32,
    /// Points for the remaining minutes.
    pub trajectory: Trajectory,
}

/// Divergence request.
#[derive(Debug, Deserialize)]
pub struct DivergenceRequest {
    /// Live side A price.
    pub current_side_a: Decimal,
    /// Projected side A price.
    pub expected_side_a: Decimal,
    /// Current match minute.
    pub minute: u32,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Full 90-minute projection with milestones and entry windows.
pub async fn projection(
    State(state): State<AppState>,
    Json(request): Json<ProjectionRequest>,
) -> Json<PreMatchReport> {
    let start = Instant::now();
    let report = state.analyzer.pre_match(request.initial_side_a);
    metrics::record_http_latency(start, "projection");
    Json(report)
}

/// Continuation from a live price to full time.
pub async fn live_projection(
    State(state): State<AppState>,
    Json(request): Json<LiveProjectionRequest>,
) -> Result<Json<LiveProjectionResponse>, ApiError> {
    let start = Instant::now();
    let trajectory = state.analyzer.engine().project_from_live(
        request.initial_side_a,
        request.current_side_a,
        request.minute,
    )?;
    metrics::record_http_latency(start, "live_projection");

    Ok(Json(LiveProjectionResponse {
        minute: request.minute,
        trajectory,
    }))
}

/// Classify a live price against a projected one.
pub async fn divergence(
    State(state): State<AppState>,
    Json(request): Json<DivergenceRequest>,
) -> Result<Json<DivergenceResult>, ApiError> {
    let start = Instant::now();
    validate_minute(request.minute)?;
    let result = state.analyzer.divergence().analyze(
        request.current_side_a,
        request.expected_side_a,
        request.minute,
    );
    metrics::record_http_latency(start, "divergence");
    Ok(Json(result))
}

/// Full in-play analysis of a live observation.
pub async fn live_analysis(
    State(state): State<AppState>,
    Json(observation): Json<LiveObservation>,
) -> Result<Json<LiveReport>, ApiError> {
    let start = Instant::now();
    let report = state.analyzer.live(&observation)?;
    metrics::record_http_latency(start, "live_analysis");
    Ok(Json(report))
}

/// Prometheus text exposition, or 404 when no exporter is installed.
pub async fn metrics_text(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_state_defaults_without_metrics() {
        let state = AppState::new();
        assert!(state.metrics.is_none());
        assert_eq!(
            state.analyzer.engine().expected_final(Decimal::new(42, 0)),
            Decimal::new(154, 2)
        );
    }

    #[test]
    fn validation_error_maps_to_422() {
        let err = ApiError::from(ValidationError::MinuteOutOfRange {
            minute: 0,
            min: 1,
            max: 90,
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
