//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rotator_iterations_total` (counter): completed outer iterations
//! - `rotator_cycles_total` (counter): adapter invocations by strategy, outcome
//! - `rotator_probe_failures_total` (counter): failed IP probes by route
//!
//! # Design Decisions
//! - Exporter is opt-in (`observability.metrics_address`)
//! - Recording without an installed exporter is a no-op

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_iteration() {
    metrics::counter!("rotator_iterations_total").increment(1);
}

pub fn record_cycle(strategy: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("rotator_cycles_total", "strategy" => strategy, "outcome" => outcome)
        .increment(1);
}

pub fn record_probe_failure(route: &'static str) {
    metrics::counter!("rotator_probe_failures_total", "route" => route).increment(1);
}
