// ABOUTME: Metric names and recording helpers built on the `metrics` facade
// ABOUTME: The binary decides whether an exporter is installed; without one these are no-ops

use std::time::Duration;

pub const MESSAGES_RECEIVED: &str = "lmgram_messages_received_total";
pub const INFERENCE_REQUESTS: &str = "lmgram_inference_requests_total";
pub const INFERENCE_DURATION: &str = "lmgram_inference_duration_seconds";
pub const PURGE_MESSAGES: &str = "lmgram_purge_messages_total";

/// Count an inbound message by kind ("command", "chat", "ignored")
pub fn record_message_received(kind: &'static str) {
    metrics::counter!(MESSAGES_RECEIVED, "kind" => kind).increment(1);
}

/// Count one inference call and record its latency.
/// `outcome` is "ok" or an error kind.
pub fn record_inference(outcome: &'static str, elapsed: Duration) {
    metrics::counter!(INFERENCE_REQUESTS, "outcome" => outcome).increment(1);
    metrics::histogram!(INFERENCE_DURATION).record(elapsed.as_secs_f64());
}

pub fn record_purge(deleted: usize, denied: usize) {
    metrics::counter!(PURGE_MESSAGES, "result" => "deleted").increment(deleted as u64);
    metrics::counter!(PURGE_MESSAGES, "result" => "denied").increment(denied as u64);
}
