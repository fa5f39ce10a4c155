use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub queue: QueueSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Chat backend REST endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// User the terminal client sends as
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    /// Key under which the serialized queue is stored
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Failed attempts after which a queued message is dropped
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Storage backend type: "file" (default), "memory" or "redis"
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    /// Directory used by the file backend
    #[serde(default = "default_storage_path")]
    pub path: String,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Key prefix used by the Redis backend
    #[serde(default = "default_redis_prefix")]
    pub redis_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Whether the health probe drives online/offline transitions
    #[serde(default = "default_probe_enabled")]
    pub probe_enabled: bool,
    /// Interval between health checks in milliseconds
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    /// Timeout of a single health check in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000 // 10 seconds
}

fn default_storage_key() -> String {
    "@message_queue".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_storage_backend() -> String {
    "file".to_string()
}

fn default_storage_path() -> String {
    "data".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_prefix() -> String {
    "chat".to_string()
}

fn default_probe_enabled() -> bool {
    true
}

fn default_probe_interval_ms() -> u64 {
    5_000
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        Self::base_builder()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // CHAT__API__BASE_URL, CHAT__STORAGE__BACKEND, CHAT__CLIENT__USER_ID, etc.
            .add_source(
                Environment::with_prefix("CHAT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Build settings from an inline TOML document layered over the defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::base_builder()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn base_builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("api.base_url", default_base_url())?
            .set_default("api.request_timeout_ms", default_request_timeout_ms() as i64)?
            .set_default("queue.storage_key", default_storage_key())?
            .set_default("queue.max_retries", default_max_retries() as i64)?
            .set_default("storage.backend", default_storage_backend())?
            .set_default("storage.path", default_storage_path())?
            .set_default("network.probe_enabled", default_probe_enabled())?
            .set_default("log.level", default_log_level())?
            .set_default("log.format", default_log_format())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: default_storage_path(),
            redis_url: default_redis_url(),
            redis_prefix: default_redis_prefix(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_enabled: default_probe_enabled(),
            probe_interval_ms: default_probe_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
