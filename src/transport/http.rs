//! REST transport for the chat backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::ApiConfig;

use super::{ChatMessage, CreateMessageRequest, MessageTransport, TransportError};

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/api/messages", self.base_url)
    }
}

#[async_trait]
impl MessageTransport for HttpTransport {
    async fn send(&self, user_id: i64, text: &str) -> Result<ChatMessage, TransportError> {
        let res = self
            .client
            .post(self.messages_url())
            .json(&CreateMessageRequest { user_id, text })
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let message: ChatMessage = res.json().await?;
        tracing::debug!(message_id = message.id, user_id, "Message created on server");
        Ok(message)
    }
}
