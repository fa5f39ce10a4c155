//! Message-send transport.
//!
//! The offline queue only needs one capability from the backend: deliver a
//! single message. `HttpTransport` implements it against the chat REST API.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by a transport.
///
/// The queue treats every variant the same way (retry, then drop).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced a response (connect failure, timeout, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Server rejected message (status {status}): {body}")]
    Rejected { status: u16, body: String },

    /// Transport-specific failure (test doubles, unavailable backends)
    #[error("{0}")]
    Other(String),
}

/// Message as stored and returned by the chat server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub created_at: String,
    #[serde(default)]
    pub user_name: String,
}

/// Body of `POST /api/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest<'a> {
    pub user_id: i64,
    pub text: &'a str,
}

/// Delivers one message to the backend.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, user_id: i64, text: &str) -> Result<ChatMessage, TransportError>;
}
