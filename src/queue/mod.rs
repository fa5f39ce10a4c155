//! Offline message queue.
//!
//! Outbound chat messages that cannot be delivered are kept in an ordered,
//! persisted queue and retried when the client comes back online. An entry
//! that fails `max_retries` times is dropped.
//!
//! - `OfflineQueue`: the queue itself, with enqueue/dequeue, replay passes
//!   and change notifications
//! - `QueueStore`: persists the whole queue as one JSON array under one key
//! - `Subscription`: handle for removing a change listener

mod models;
mod offline_queue;
pub mod persistence;
mod subscribers;

pub use models::{
    DroppedMessage, QueueConfig, QueueError, QueuedMessage, DEFAULT_MAX_RETRIES,
    DEFAULT_STORAGE_KEY,
};
pub use offline_queue::OfflineQueue;
pub use persistence::QueueStore;
pub use subscribers::{QueueListener, Subscription};
