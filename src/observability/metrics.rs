//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, mapping
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_rate_limited_total` (counter): 429s by mapping
//! - `gateway_breaker_rejections_total` (counter): 503s by mapping
//! - `gateway_breaker_transitions_total` (counter): open/closed transitions
//! - `gateway_store_degraded_total` (counter): state store outages observed

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`. Failure is logged, not fatal:
/// the gateway keeps proxying without a metrics endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, mapping: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "mapping" => mapping.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "mapping" => mapping.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(mapping: &str) {
    counter!("gateway_rate_limited_total", "mapping" => mapping.to_string()).increment(1);
}

pub fn record_breaker_rejection(mapping: &str) {
    counter!("gateway_breaker_rejections_total", "mapping" => mapping.to_string()).increment(1);
}

pub fn record_breaker_transition(mapping: &str, to: &'static str) {
    counter!(
        "gateway_breaker_transitions_total",
        "mapping" => mapping.to_string(),
        "to" => to
    )
    .increment(1);
}

pub fn record_store_degraded(component: &'static str) {
    counter!("gateway_store_degraded_total", "component" => component).increment(1);
}
