// Infrastructure layer (shared components)
pub mod infrastructure;

pub use infrastructure::config;
pub use infrastructure::error;
pub use infrastructure::metrics;
pub use infrastructure::redis;

// Domain layer
pub mod queue;
pub mod sender;

// Adapters
pub mod network;
pub mod storage;
pub mod transport;

// Supporting modules
pub mod tasks;
pub mod telemetry;
