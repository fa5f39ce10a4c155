//! Client send path: validate, try the backend, fall back to the offline queue.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::queue::OfflineQueue;
use crate::transport::{ChatMessage, MessageTransport};

/// Longest message body the backend accepts, in characters
pub const MAX_TEXT_LENGTH: usize = 1000;

/// Result of a send attempt
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// Accepted by the backend right away
    Delivered(ChatMessage),
    /// Stored in the offline queue for a later pass
    Queued { id: String },
}

/// Trim `text` and check it against the backend's rules.
pub fn validate_text(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("message text is required".to_string()));
    }
    if trimmed.chars().count() > MAX_TEXT_LENGTH {
        return Err(AppError::Validation(format!(
            "message text must be at most {} characters",
            MAX_TEXT_LENGTH
        )));
    }
    Ok(trimmed)
}

pub struct ChatSender {
    queue: Arc<OfflineQueue>,
    transport: Arc<dyn MessageTransport>,
}

impl ChatSender {
    pub fn new(queue: Arc<OfflineQueue>, transport: Arc<dyn MessageTransport>) -> Self {
        Self { queue, transport }
    }

    /// Send `text` as `user_id`.
    ///
    /// Only validation errors are returned. While offline, or when the direct
    /// attempt fails, the message is queued instead.
    pub async fn send(&self, user_id: i64, text: &str) -> Result<SendOutcome> {
        let text = validate_text(text)?;

        if self.queue.is_online() {
            match self.transport.send(user_id, text).await {
                Ok(message) => {
                    tracing::debug!(server_id = message.id, user_id, "Message delivered");
                    return Ok(SendOutcome::Delivered(message));
                }
                Err(e) => {
                    tracing::warn!(error = %e, user_id, "Direct send failed, queueing message");
                }
            }
        }

        let id = self.queue.enqueue(user_id, text).await;
        Ok(SendOutcome::Queued { id })
    }
}
