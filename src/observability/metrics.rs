//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Mirror per-instance engine counters to the global `metrics` facade
//! - Expose a Prometheus-compatible scrape endpoint when enabled
//!
//! # Metrics
//! - `txengine_tx_sent_total` (counter): transactions accepted by the node
//! - `txengine_tx_failed_total` (counter): send attempts that failed, by stage
//! - `txengine_send_duration_seconds` (histogram): end-to-end send latency
//! - `txengine_proofs_generated_total` (counter): proofs built from chain data
//! - `txengine_proof_cache_total` (counter): proof cache lookups, by result
//! - `txengine_proof_verifications_total` (counter): verifications, by outcome
//! - `txengine_batch_requests_total` (counter): batch requests, by outcome
//! - `txengine_batch_queue_depth` / `txengine_batch_results_depth` (gauges)
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Label values are fixed strings, never addresses or hashes

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_tx_sent(start: Instant) {
    ::metrics::counter!("txengine_tx_sent_total").increment(1);
    ::metrics::histogram!("txengine_send_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_tx_failed(stage: &'static str) {
    ::metrics::counter!("txengine_tx_failed_total", "stage" => stage).increment(1);
}

pub fn record_proof_generated() {
    ::metrics::counter!("txengine_proofs_generated_total").increment(1);
}

pub fn record_proof_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    ::metrics::counter!("txengine_proof_cache_total", "result" => result).increment(1);
}

pub fn record_verification(outcome: &'static str) {
    ::metrics::counter!("txengine_proof_verifications_total", "outcome" => outcome).increment(1);
}

pub fn record_batch_request(outcome: &'static str) {
    ::metrics::counter!("txengine_batch_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_batch_depths(queue: usize, results: usize) {
    ::metrics::gauge!("txengine_batch_queue_depth").set(queue as f64);
    ::metrics::gauge!("txengine_batch_results_depth").set(results as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_tx_sent(Instant::now());
        record_tx_failed("submit");
        record_proof_generated();
        record_proof_cache(true);
        record_proof_cache(false);
        record_verification("valid");
        record_batch_request("queued");
        record_batch_depths(3, 1);
    }
}
