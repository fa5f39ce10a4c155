//! Infrastructure layer modules
//!
//! This module contains shared infrastructure components:
//! - `config`: Application configuration and settings
//! - `error`: Unified error types
//! - `metrics`: Prometheus metrics helpers
//! - `redis`: Redis connection pool used by the Redis storage backend

pub mod config;
pub mod error;
pub mod metrics;
pub mod redis;
