//! Persistent key-value storage for the offline queue.
//!
//! The queue persists itself as one serialized value under a fixed key.
//! Backends:
//!
//! - `MemoryStore`: DashMap, lost on restart (tests, ephemeral clients)
//! - `FileStore`: one JSON file per key under a directory
//! - `RedisStore`: Redis string keys under a prefix
//!
//! Use `create_store()` to pick a backend from configuration.

pub mod backend;
mod factory;
pub mod file_backend;
pub mod memory_backend;
pub mod redis_backend;

pub use backend::{KeyValueStore, StorageError};
pub use factory::create_store;
pub use file_backend::FileStore;
pub use memory_backend::MemoryStore;
pub use redis_backend::RedisStore;
