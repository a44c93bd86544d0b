//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, circuit state, probes)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-service metrics
//!
//! # Metrics
//! - `gateway_requests_total` (counter): proxied requests by service, status
//! - `gateway_upstream_duration_seconds` (histogram): upstream latency by service
//! - `gateway_circuit_rejections_total` (counter): requests rejected by an open circuit
//! - `gateway_circuit_open` (gauge): 1=open, 0=closed
//! - `gateway_health_checks_total` (counter): probes by service, result
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels for service and status code

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed proxy request.
pub fn record_request(service: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "service" => service.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_upstream_duration_seconds", "service" => service.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a request rejected by an open circuit.
pub fn record_circuit_rejection(service: &str) {
    metrics::counter!("gateway_circuit_rejections_total", "service" => service.to_string()).increment(1);
}

/// Record the circuit state for a service.
pub fn record_circuit_state(service: &str, open: bool) {
    metrics::gauge!("gateway_circuit_open", "service" => service.to_string())
        .set(if open { 1.0 } else { 0.0 });
}

/// Record a health probe result.
pub fn record_health_check(service: &str, healthy: bool) {
    let result = if healthy { "success" } else { "failure" };
    metrics::counter!(
        "gateway_health_checks_total",
        "service" => service.to_string(),
        "result" => result
    )
    .increment(1);
}
