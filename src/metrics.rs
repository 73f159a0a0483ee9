//! Prometheus metrics for projection and analysis activity.
//!
//! This module provides:
//! - Projection latency
//! - Counters for projections, divergence analyses and entry candidates
//! - HTTP request latency for the API layer
//!
//! Without an installed recorder every call here is a no-op, so the engine
//! can record unconditionally.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Full-trajectory projection latency metric name.
pub const METRIC_PROJECTION_LATENCY: &str = "projection_latency_ms";
/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// Full projections counter metric name.
pub const METRIC_PROJECTIONS: &str = "projections_total";
/// Live continuation projections counter metric name.
pub const METRIC_LIVE_PROJECTIONS: &str = "live_projections_total";
/// Divergence analyses counter metric name.
pub const METRIC_DIVERGENCE_ANALYSES: &str = "divergence_analyses_total";
/// Entry candidates counter metric name.
pub const METRIC_ENTRY_CANDIDATES: &str = "entry_candidates_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_PROJECTION_LATENCY,
        "Time to build a full 90-minute projection in milliseconds"
    );
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );

    describe_counter!(METRIC_PROJECTIONS, "Total number of full projections built");
    describe_counter!(
        METRIC_LIVE_PROJECTIONS,
        "Total number of live continuation projections built"
    );
    describe_counter!(
        METRIC_DIVERGENCE_ANALYSES,
        "Total number of divergence analyses, by tier"
    );
    describe_counter!(
        METRIC_ENTRY_CANDIDATES,
        "Total number of entry candidates found, by side"
    );

    debug!("Metrics initialized");
}

/// Record HTTP request latency.
pub fn record_http_latency(start: Instant, endpoint: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint.to_string()).record(latency_ms);
}

/// Increment full projections counter.
pub fn inc_projections() {
    counter!(METRIC_PROJECTIONS).increment(1);
}

/// Increment live projections counter.
pub fn inc_live_projections() {
    counter!(METRIC_LIVE_PROJECTIONS).increment(1);
}

/// Increment divergence analyses counter for a tier.
pub fn inc_divergence_analyses(tier: &str) {
    counter!(METRIC_DIVERGENCE_ANALYSES, "tier" => tier.to_string()).increment(1);
}

/// Add found entry candidates for a side.
pub fn add_entry_candidates(side: &str, count: usize) {
    counter!(METRIC_ENTRY_CANDIDATES, "side" => side.to_string()).increment(count as u64);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.metric_name).record(latency_ms);
    }
}

/// Create a latency timer for a full projection.
pub fn timer_projection() -> LatencyTimer {
    LatencyTimer::new(METRIC_PROJECTION_LATENCY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn latency_timer_measures_time() {
        let timer = LatencyTimer::new("test_metric");
        sleep(Duration::from_millis(10));
        let elapsed = timer.elapsed_ms();
        assert!(elapsed >= 9.0);
    }

    #[test]
    fn counters_are_noops_without_recorder() {
        inc_projections();
        inc_live_projections();
        inc_divergence_analyses("balanced");
        add_entry_candidates("under", 3);
    }
}
