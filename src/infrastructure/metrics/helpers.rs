//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    NETWORK_TRANSITIONS_TOTAL, PERSISTENCE_FAILURES_TOTAL, QUEUE_DELIVERED_TOTAL,
    QUEUE_DROPPED_TOTAL, QUEUE_ENQUEUED_TOTAL, QUEUE_PASSES_TOTAL, QUEUE_PENDING,
    QUEUE_RETRIED_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording offline queue metrics
pub struct QueueMetrics;

impl QueueMetrics {
    pub fn record_enqueued() {
        QUEUE_ENQUEUED_TOTAL.inc();
    }

    pub fn record_delivered() {
        QUEUE_DELIVERED_TOTAL.inc();
    }

    pub fn record_retried() {
        QUEUE_RETRIED_TOTAL.inc();
    }

    pub fn record_dropped() {
        QUEUE_DROPPED_TOTAL.inc();
    }

    pub fn record_pass() {
        QUEUE_PASSES_TOTAL.inc();
    }

    /// Set the pending gauge to the current queue length
    pub fn set_pending(len: usize) {
        QUEUE_PENDING.set(len as i64);
    }
}

/// Helper struct for recording persistence metrics
pub struct PersistenceMetrics;

impl PersistenceMetrics {
    pub fn record_load_failure() {
        PERSISTENCE_FAILURES_TOTAL.with_label_values(&["load"]).inc();
    }

    pub fn record_save_failure() {
        PERSISTENCE_FAILURES_TOTAL.with_label_values(&["save"]).inc();
    }

    pub fn record_erase_failure() {
        PERSISTENCE_FAILURES_TOTAL.with_label_values(&["erase"]).inc();
    }
}

/// Helper struct for recording network metrics
pub struct NetworkMetrics;

impl NetworkMetrics {
    pub fn record_transition(connected: bool) {
        let label = if connected { "online" } else { "offline" };
        NETWORK_TRANSITIONS_TOTAL.with_label_values(&[label]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics_contains_queue_counters() {
        QueueMetrics::record_enqueued();
        QueueMetrics::set_pending(1);
        PersistenceMetrics::record_save_failure();

        let output = encode_metrics().unwrap();
        assert!(output.contains("chat_queue_enqueued_total"));
        assert!(output.contains("chat_queue_pending"));
        assert!(output.contains("chat_persistence_failures_total"));
    }

    #[test]
    fn test_counters_increase() {
        let before = QUEUE_DROPPED_TOTAL.get();
        QueueMetrics::record_dropped();
        assert!(QUEUE_DROPPED_TOTAL.get() > before);
    }
}
