//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by method, status, route
//! - `edge_request_duration_seconds` (histogram): latency distribution
//! - `pipeline_stage_total` (counter): pipeline stage outcomes
//!
//! # Design Decisions
//! - Updates are cheap atomic operations; recording never fails the caller
//! - The Prometheus endpoint is optional and bound to its own address

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to start metrics endpoint"),
    }
}

/// Record one edge request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    counter!(
        "edge_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string(),
    )
    .increment(1);
    histogram!(
        "edge_request_duration_seconds",
        "route" => route.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record one pipeline stage outcome.
pub fn record_stage(stage: &str, outcome: &str) {
    counter!(
        "pipeline_stage_total",
        "stage" => stage.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);
}
