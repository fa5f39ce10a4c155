mod settings;

pub use settings::{
    ApiConfig, ClientConfig, LogConfig, NetworkConfig, QueueSettings, Settings, StorageConfig,
};
