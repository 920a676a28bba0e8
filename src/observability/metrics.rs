//! Metrics collection and exposition.
//!
//! # Metrics
//! - `coverage_proxy_requests_total` (counter): proxied requests by method, status
//! - `coverage_proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `coverage_proxy_exchanges_enqueued_total` (counter): exchanges handed to ingestion
//! - `coverage_proxy_exchanges_dropped_total` (counter): exchanges lost, by reason
//! - `coverage_proxy_exchanges_ingested_total` (counter): ingested, by matched
//! - `coverage_proxy_undocumented_status_total` (counter): statuses absent from the description

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "coverage_proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("coverage_proxy_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_exchange_enqueued() {
    metrics::counter!("coverage_proxy_exchanges_enqueued_total").increment(1);
}

pub fn record_exchange_dropped(reason: &'static str) {
    metrics::counter!("coverage_proxy_exchanges_dropped_total", "reason" => reason).increment(1);
}

pub fn record_exchange_ingested(matched: bool) {
    let matched = if matched { "true" } else { "false" };
    metrics::counter!("coverage_proxy_exchanges_ingested_total", "matched" => matched)
        .increment(1);
}

pub fn record_undocumented_status() {
    metrics::counter!("coverage_proxy_undocumented_status_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("GET", 200, Instant::now());
        record_exchange_enqueued();
        record_exchange_dropped("queue_full");
        record_exchange_ingested(false);
        record_undocumented_status();
    }
}
