//! Redis connection handling for the Redis storage backend.

pub mod pool;

pub use pool::{PoolError, RedisPool, RedisPoolExt};
