//! Network-status observer.
//!
//! Publishes a boolean "connected" signal to every subscriber. The offline
//! queue subscribes once during initialization; `HealthProbe` (or any other
//! connectivity source) publishes into it.

use tokio::sync::broadcast;

/// Buffered events per subscriber before it starts lagging
const EVENT_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct NetworkObserver {
    tx: broadcast::Sender<bool>,
}

impl NetworkObserver {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Publish a connectivity event. Returns how many subscribers received it.
    pub fn publish(&self, connected: bool) -> usize {
        // No receivers is fine: nobody is listening yet
        self.tx.send(connected).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NetworkObserver {
    fn default() -> Self {
        Self::new()
    }
}
