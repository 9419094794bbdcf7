//! Prometheus metrics.
//!
//! Recording is always cheap: without an installed exporter the `metrics`
//! macros are no-ops. `main` installs the exporter only when `METRICS_BIND`
//! is configured.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Start a Prometheus scrape endpoint at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Game Metrics
// ============================================================================

pub fn matches_started_total() {
    metrics::counter!("matches_started_total").increment(1);
}

/// Count a settled match and the diamonds that changed hands
pub fn matches_finished_total(diamonds_moved: u64) {
    metrics::counter!("matches_finished_total").increment(1);
    metrics::counter!("match_diamonds_moved_total").increment(diamonds_moved);
}

pub fn rewards_claimed_total(kind: &'static str) {
    metrics::counter!("rewards_claimed_total", "kind" => kind).increment(1);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Increment login attempts counter.
pub fn login_attempts_total(success: bool) {
    metrics::counter!("login_attempts_total",
        "success" => success.to_string()
    )
    .increment(1);
}
