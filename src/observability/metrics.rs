//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_requests_admitted_total` (counter): requests that passed every guard, by route
//! - `gate_requests_rejected_total` (counter): rejections, by stage and reason
//! - `gate_rate_limit_entries` (gauge): tracked rate-limit entries after a sweep
//! - `gate_sweep_evicted_total` (counter): entries removed by the sweeper
//! - `gate_self_check_total` (counter): self health check probes, by outcome
//!
//! Recording is a no-op until a recorder is installed, so tests never need one.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

pub fn record_admitted(route: &str) {
    counter!("gate_requests_admitted_total", "route" => route.to_string()).increment(1);
}

pub fn record_rejection(stage: &str, reason: &str) {
    counter!(
        "gate_requests_rejected_total",
        "stage" => stage.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

pub fn record_sweep(evicted: usize, tracked: usize) {
    counter!("gate_sweep_evicted_total").increment(evicted as u64);
    gauge!("gate_rate_limit_entries").set(tracked as f64);
}

pub fn record_self_check(outcome: &str) {
    counter!("gate_self_check_total", "outcome" => outcome.to_string()).increment(1);
}
