//! Backend trait for persistent key-value storage.

use async_trait::async_trait;
use thiserror::Error;

use crate::redis::PoolError;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Redis operation failed
    #[error("Redis error: {0}")]
    Redis(#[from] PoolError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable string storage addressed by key.
///
/// Reading a missing key yields `None`, writing replaces the whole value and
/// removing a missing key is not an error.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the queue shares one store across tasks.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Backend type identifier, used in logs.
    fn backend_type(&self) -> &'static str;

    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key` entirely.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
