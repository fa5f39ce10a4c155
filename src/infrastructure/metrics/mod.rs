//! Prometheus metrics for the offline delivery queue.
//!
//! - Queue metrics (enqueued, delivered, retried, dropped, pending)
//! - Persistence metrics (failed loads/saves/erases)
//! - Network metrics (connectivity transitions)

mod helpers;

pub use helpers::{encode_metrics, NetworkMetrics, PersistenceMetrics, QueueMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "chat";

lazy_static! {
    // ============================================================================
    // Queue Metrics
    // ============================================================================

    /// Total messages placed in the offline queue
    pub static ref QUEUE_ENQUEUED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queue_enqueued_total", METRIC_PREFIX),
        "Total messages placed in the offline queue"
    ).unwrap();

    /// Total queued messages delivered by a queue pass
    pub static ref QUEUE_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queue_delivered_total", METRIC_PREFIX),
        "Total queued messages delivered to the backend"
    ).unwrap();

    /// Total failed delivery attempts that left the message queued
    pub static ref QUEUE_RETRIED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queue_retried_total", METRIC_PREFIX),
        "Total failed delivery attempts kept for retry"
    ).unwrap();

    /// Total messages dropped after exhausting their retries
    pub static ref QUEUE_DROPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queue_dropped_total", METRIC_PREFIX),
        "Total queued messages dropped after exhausting retries"
    ).unwrap();

    /// Messages currently waiting in the queue
    pub static ref QUEUE_PENDING: IntGauge = register_int_gauge!(
        format!("{}_queue_pending", METRIC_PREFIX),
        "Messages currently waiting in the offline queue"
    ).unwrap();

    /// Total queue passes started
    pub static ref QUEUE_PASSES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queue_passes_total", METRIC_PREFIX),
        "Total queue processing passes started"
    ).unwrap();

    // ============================================================================
    // Persistence Metrics
    // ============================================================================

    /// Persistence failures by operation (load, save, erase)
    pub static ref PERSISTENCE_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_persistence_failures_total", METRIC_PREFIX),
        "Total failed persistence operations",
        &["operation"]
    ).unwrap();

    // ============================================================================
    // Network Metrics
    // ============================================================================

    /// Connectivity transitions observed by the queue
    pub static ref NETWORK_TRANSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_network_transitions_total", METRIC_PREFIX),
        "Total connectivity transitions observed",
        &["to"]
    ).unwrap();
}
