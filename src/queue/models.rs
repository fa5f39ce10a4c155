//! Queue data models and error types

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::QueueSettings;

/// Failed attempts after which a queued message is dropped
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Storage key holding the serialized queue
pub const DEFAULT_STORAGE_KEY: &str = "@message_queue";

/// Configuration for the offline queue
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Key under which the whole queue is persisted
    pub storage_key: String,
    /// Retry ceiling; an entry whose retry count reaches it is removed
    pub max_retries: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl From<&QueueSettings> for QueueConfig {
    fn from(settings: &QueueSettings) -> Self {
        Self {
            storage_key: settings.storage_key.clone(),
            // A ceiling of 0 would drop entries that never failed
            max_retries: settings.max_retries.max(1),
        }
    }
}

/// An outbound chat message waiting for delivery.
///
/// Serialized in camelCase so the persisted array keeps the
/// `{id, userId, text, timestamp, retryCount}` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMessage {
    /// Local id, `temp_<created ms>_<random>`
    pub id: String,
    pub user_id: i64,
    pub text: String,
    /// Creation time in milliseconds since the epoch
    pub timestamp: i64,
    /// Failed delivery attempts so far
    pub retry_count: u32,
}

impl QueuedMessage {
    /// Create a new queued message with a fresh id
    pub fn new(user_id: i64, text: impl Into<String>) -> Self {
        let timestamp = Utc::now().timestamp_millis();
        Self {
            id: generate_id(timestamp),
            user_id,
            text: text.into(),
            timestamp,
            retry_count: 0,
        }
    }
}

/// Build a local message id from a creation timestamp and a random component.
pub(crate) fn generate_id(timestamp_ms: i64) -> String {
    format!("temp_{}_{}", timestamp_ms, Uuid::new_v4().simple())
}

/// A message removed from the queue after exhausting its retries
#[derive(Debug, Clone)]
pub struct DroppedMessage {
    pub message: QueuedMessage,
    /// Error of the final failed attempt
    pub last_error: String,
}

/// Error types for queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("offline queue already initialized")]
    AlreadyInitialized,
}
