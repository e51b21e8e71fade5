//! Metrics collection and exposition.
//!
//! # Metrics
//! - `classify_requests_total` (counter): classifications by recognizer
//! - `classify_recognizer_failures_total` (counter): contained recognizer failures
//! - `catalog_generation` (gauge): current catalog generation
//! - `catalog_items` (gauge): items in the current generation
//! - `catalog_refresh_total` (counter): refresh cycles by outcome
//! - `listener_forced_closes_total` (counter): listeners that missed their grace window

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_classification(recognizer: &'static str) {
    counter!("classify_requests_total", "recognizer" => recognizer).increment(1);
}

pub fn record_recognizer_failure(recognizer: &'static str) {
    counter!("classify_recognizer_failures_total", "recognizer" => recognizer).increment(1);
}

pub fn record_catalog_installed(generation: u64, items: usize) {
    gauge!("catalog_generation").set(generation as f64);
    gauge!("catalog_items").set(items as f64);
}

pub fn record_catalog_refresh(outcome: &'static str) {
    counter!("catalog_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_forced_close(transport: String) {
    counter!("listener_forced_closes_total", "transport" => transport).increment(1);
}
