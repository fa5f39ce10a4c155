//! Storage backend factory

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::redis::RedisPool;

use super::backend::KeyValueStore;
use super::file_backend::FileStore;
use super::memory_backend::MemoryStore;
use super::redis_backend::RedisStore;

/// Create a key-value store based on configuration.
///
/// Returns the appropriate backend implementation based on the `backend` setting:
/// - `"redis"`: `RedisStore` at `redis_url`, falling back to memory if the URL is invalid
/// - `"memory"`: `MemoryStore`
/// - `"file"` (default): `FileStore` rooted at `path`
pub fn create_store(settings: &StorageConfig) -> Arc<dyn KeyValueStore> {
    match settings.backend.as_str() {
        "redis" => match RedisPool::new(&settings.redis_url) {
            Ok(pool) => {
                tracing::info!(
                    backend = "redis",
                    prefix = %settings.redis_prefix,
                    "Creating Redis storage backend"
                );
                Arc::new(RedisStore::new(Arc::new(pool), settings.redis_prefix.clone()))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Redis backend requested but the URL is invalid, falling back to memory"
                );
                Arc::new(MemoryStore::new())
            }
        },
        "memory" => {
            tracing::info!(backend = "memory", "Creating memory storage backend");
            Arc::new(MemoryStore::new())
        }
        other => {
            if other != "file" {
                tracing::warn!(backend = %other, "Unknown storage backend, using file");
            }
            tracing::info!(backend = "file", path = %settings.path, "Creating file storage backend");
            Arc::new(FileStore::new(settings.path.clone()))
        }
    }
}
