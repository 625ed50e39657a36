//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lifecycle_running_state` (gauge): 0=init 1=starting 2=ready 3=listening 4=shuttingDown
//! - `lifecycle_dispatch_total` (counter): dispatches by category, result
//! - `lifecycle_gated_requests_total` (counter): gate decisions by outcome
//! - `lifecycle_listeners_active` (gauge): listeners in the listening state
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Prometheus exporter serves its own scrape endpoint

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

use crate::events::EventCategory;
use crate::lifecycle::RunningState;

/// Install the Prometheus exporter with a scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

pub fn record_state(state: RunningState) {
    ::metrics::gauge!("lifecycle_running_state").set(state as u8 as f64);
}

pub fn record_dispatch(category: EventCategory, ok: bool) {
    let result = if ok { "ok" } else { "failed" };
    ::metrics::counter!(
        "lifecycle_dispatch_total",
        "category" => category.as_str(),
        "result" => result
    )
    .increment(1);
}

/// `outcome` is one of `health`, `routed`, `unavailable`.
pub fn record_gated_request(outcome: &'static str) {
    ::metrics::counter!("lifecycle_gated_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_active_listeners(count: usize) {
    ::metrics::gauge!("lifecycle_listeners_active").set(count as f64);
}
