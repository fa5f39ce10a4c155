//! Persistence adapter: the whole queue as one JSON array under one key.

use std::sync::Arc;

use crate::storage::{KeyValueStore, StorageError};

use super::models::QueuedMessage;

pub struct QueueStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl QueueStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend_type(&self) -> &'static str {
        self.store.backend_type()
    }

    /// Read the persisted queue. A missing or blank value is an empty queue.
    pub async fn load(&self) -> Result<Vec<QueuedMessage>, StorageError> {
        match self.store.get(&self.key).await? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Replace the persisted queue with `queue`.
    pub async fn save(&self, queue: &[QueuedMessage]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(queue)?;
        self.store.set(&self.key, &raw).await
    }

    /// Delete the persisted queue entirely.
    pub async fn erase(&self) -> Result<(), StorageError> {
        self.store.remove(&self.key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn message(id: &str, retry_count: u32) -> QueuedMessage {
        QueuedMessage {
            id: id.to_string(),
            user_id: 1,
            text: format!("text {}", id),
            timestamp: 1_700_000_000_000,
            retry_count,
        }
    }

    #[tokio::test]
    async fn test_missing_and_blank_values_load_empty() {
        let store = Arc::new(MemoryStore::new());
        let queue_store = QueueStore::new(store.clone(), "@message_queue");
        assert!(queue_store.load().await.unwrap().is_empty());

        store.set("@message_queue", "  ").await.unwrap();
        assert!(queue_store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_keeps_order() {
        let queue_store = QueueStore::new(Arc::new(MemoryStore::new()), "@message_queue");
        let queue = vec![message("a", 0), message("b", 2), message("c", 1)];

        queue_store.save(&queue).await.unwrap();
        assert_eq!(queue_store.load().await.unwrap(), queue);
    }

    #[tokio::test]
    async fn test_invalid_json_is_error() {
        let store = Arc::new(MemoryStore::new());
        store.set("@message_queue", "{not json").await.unwrap();

        let queue_store = QueueStore::new(store, "@message_queue");
        assert!(matches!(
            queue_store.load().await,
            Err(StorageError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_erase_removes_key() {
        let store = Arc::new(MemoryStore::new());
        let queue_store = QueueStore::new(store.clone(), "@message_queue");
        queue_store.save(&[message("a", 0)]).await.unwrap();

        queue_store.erase().await.unwrap();
        assert_eq!(store.get("@message_queue").await.unwrap(), None);
    }
}
