//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): forwarded requests by method, status, registry
//! - `proxy_request_duration_seconds` (histogram): latency until upstream headers
//! - `proxy_admission_rejections_total` (counter): rejected requests by reason
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels stay low-cardinality (no paths, no hosts)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a request that reached an upstream (or failed trying).
pub fn record_request(method: &str, status: u16, registry: &str, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    let registry = registry.to_string();
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.clone(),
        "status" => status.clone(),
        "registry" => registry.clone()
    )
    .increment(1);
    metrics::histogram!(
        "proxy_request_duration_seconds",
        "method" => method,
        "status" => status,
        "registry" => registry
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record an admission rejection.
pub fn record_rejection(reason: &'static str) {
    metrics::counter!("proxy_admission_rejections_total", "reason" => reason).increment(1);
}
