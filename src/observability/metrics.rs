//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, backend
//! - `gateway_request_duration_seconds` (histogram): latency per backend
//! - `gateway_upstream_errors_total` (counter): upstream failures by kind
//!
//! Recording is atomic and cheap; when no exporter is installed the calls
//! are no-ops, so the request path never depends on metrics being enabled.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(err) => tracing::error!(error = %err, "Failed to install metrics exporter"),
    }
}

/// Record one completed (or failed) request.
pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);

    histogram!(
        "gateway_request_duration_seconds",
        "backend" => backend.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record an upstream failure by error kind.
pub fn record_upstream_error(backend: &str, kind: &'static str) {
    counter!(
        "gateway_upstream_errors_total",
        "backend" => backend.to_string(),
        "kind" => kind
    )
    .increment(1);
}
