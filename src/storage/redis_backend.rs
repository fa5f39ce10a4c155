//! Redis-based key-value store.
//!
//! Each key is stored as a Redis string at `{prefix}:{key}` and survives
//! client restarts as long as Redis persists it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::redis::{RedisPool, RedisPoolExt};

use super::backend::{KeyValueStore, StorageError};

pub struct RedisStore {
    pool: Arc<RedisPool>,
    prefix: String,
}

impl RedisStore {
    pub fn new(pool: Arc<RedisPool>, prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
        }
    }

    /// Generate the Redis key for a store key.
    fn redis_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn backend_type(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.pool.get_string(&self.redis_key(key)).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let redis_key = self.redis_key(key);
        self.pool.set_string(&redis_key, value).await?;

        tracing::trace!(key = %redis_key, bytes = value.len(), "Stored value in Redis");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        Ok(self.pool.del(&self.redis_key(key)).await?)
    }
}
