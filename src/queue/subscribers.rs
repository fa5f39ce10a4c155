//! Observer list for queue snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;

use super::models::QueuedMessage;

/// Callback invoked with the queue contents after every change
pub type QueueListener = Arc<dyn Fn(&[QueuedMessage]) + Send + Sync>;

#[derive(Default)]
pub(crate) struct SubscriberSet {
    next_id: AtomicU64,
    listeners: DashMap<u64, QueueListener>,
}

impl SubscriberSet {
    pub(crate) fn insert(&self, listener: QueueListener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, listener);
        id
    }

    pub(crate) fn remove(&self, id: u64) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Call every listener in registration order.
    ///
    /// Listeners are cloned out first so a callback may unsubscribe itself.
    pub(crate) fn notify(&self, queue: &[QueuedMessage]) {
        let mut listeners: Vec<(u64, QueueListener)> = self
            .listeners
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        listeners.sort_by_key(|(id, _)| *id);

        for (_, listener) in listeners {
            listener(queue);
        }
    }
}

/// Handle returned by `OfflineQueue::subscribe`.
///
/// Dropping the handle keeps the listener registered; call `unsubscribe`
/// to remove it. Unsubscribing more than once is harmless.
pub struct Subscription {
    id: u64,
    subscribers: Weak<SubscriberSet>,
}

impl Subscription {
    pub(crate) fn new(id: u64, subscribers: &Arc<SubscriberSet>) -> Self {
        Self {
            id,
            subscribers: Arc::downgrade(subscribers),
        }
    }

    pub fn unsubscribe(&self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            if subscribers.remove(self.id) {
                tracing::trace!(subscription_id = self.id, "Queue listener removed");
            }
        }
    }
}
