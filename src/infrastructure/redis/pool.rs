//! Redis connection pool for the persistent storage backend.
//!
//! Holds one lazily established multiplexed connection and drops it when
//! Redis reports a broken connection, so the next command reconnects.

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError, RedisResult};
use tokio::sync::RwLock;

/// Error type for Redis pool operations.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Redis operation failed
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    /// Connection not available
    #[error("Connection not available: {0}")]
    ConnectionUnavailable(String),
}

/// Redis connection pool for data operations.
pub struct RedisPool {
    /// Redis client for creating connections
    client: Client,

    /// Multiplexed connection (shared across tasks)
    connection: RwLock<Option<MultiplexedConnection>>,

    url: String,
}

impl RedisPool {
    /// Create a new Redis pool. No connection is made until the first command.
    pub fn new(url: &str) -> Result<Self, PoolError> {
        let client = Client::open(url)?;

        Ok(Self {
            client,
            connection: RwLock::new(None),
            url: url.to_string(),
        })
    }

    /// Get a connection from the pool.
    ///
    /// This will establish a new connection if none exists.
    pub async fn get_connection(&self) -> Result<MultiplexedConnection, PoolError> {
        {
            let conn = self.connection.read().await;
            if let Some(ref c) = *conn {
                return Ok(c.clone());
            }
        }

        self.connect().await
    }

    async fn connect(&self) -> Result<MultiplexedConnection, PoolError> {
        let mut conn_guard = self.connection.write().await;

        // Double-check in case another task connected while we waited
        if let Some(ref c) = *conn_guard {
            return Ok(c.clone());
        }

        match self.client.get_multiplexed_tokio_connection().await {
            Ok(conn) => {
                *conn_guard = Some(conn.clone());
                tracing::info!(url = %self.url, "Redis pool connection established");
                Ok(conn)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to Redis");
                Err(PoolError::ConnectionUnavailable(e.to_string()))
            }
        }
    }

    /// Run a command, resetting the cached connection on connection-level failures.
    pub async fn execute<F, T, Fut>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: std::future::Future<Output = RedisResult<T>>,
    {
        let conn = self.get_connection().await?;

        match f(conn).await {
            Ok(result) => Ok(result),
            Err(e) => {
                if e.is_connection_dropped() || e.is_io_error() {
                    let mut conn_guard = self.connection.write().await;
                    *conn_guard = None;
                }
                Err(PoolError::Redis(e))
            }
        }
    }

    /// Get the Redis URL (for debugging).
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Typed helpers for the string commands used by the storage backend.
#[async_trait::async_trait]
pub trait RedisPoolExt {
    /// Get a string value.
    async fn get_string(&self, key: &str) -> Result<Option<String>, PoolError>;

    /// Set a string value, replacing any previous one.
    async fn set_string(&self, key: &str, value: &str) -> Result<(), PoolError>;

    /// Delete a key.
    async fn del(&self, key: &str) -> Result<(), PoolError>;
}

#[async_trait::async_trait]
impl RedisPoolExt for RedisPool {
    async fn get_string(&self, key: &str) -> Result<Option<String>, PoolError> {
        let key = key.to_string();
        self.execute(|mut conn| async move { conn.get::<_, Option<String>>(key).await })
            .await
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<(), PoolError> {
        let key = key.to_string();
        let value = value.to_string();
        self.execute(|mut conn| async move { conn.set::<_, _, ()>(key, value).await })
            .await
    }

    async fn del(&self, key: &str) -> Result<(), PoolError> {
        let key = key.to_string();
        self.execute(|mut conn| async move { conn.del::<_, ()>(key).await })
            .await
    }
}
