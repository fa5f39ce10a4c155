//! The offline delivery queue.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::metrics::{NetworkMetrics, PersistenceMetrics, QueueMetrics};
use crate::network::NetworkObserver;
use crate::storage::KeyValueStore;
use crate::transport::MessageTransport;

use super::models::{generate_id, DroppedMessage, QueueConfig, QueueError, QueuedMessage};
use super::persistence::QueueStore;
use super::subscribers::{QueueListener, SubscriberSet, Subscription};

/// Buffered drop events per receiver
const DROPPED_CAPACITY: usize = 64;

/// Buffers outbound messages while delivery is impossible and drains them
/// when connectivity returns.
///
/// Every mutating call (change, save, notify) runs under an async gate, so
/// two mutations never interleave. `process_queue` releases the gate while a
/// send is in flight; `enqueue`/`dequeue` may run between sends of a pass.
///
/// Persistence and delivery failures are logged, never returned. Until
/// `initialize` has loaded the persisted queue, changes stay in memory and
/// are merged into the loaded queue instead of overwriting it.
pub struct OfflineQueue {
    config: QueueConfig,
    entries: Mutex<Vec<QueuedMessage>>,
    gate: tokio::sync::Mutex<()>,
    store: QueueStore,
    transport: Arc<dyn MessageTransport>,
    is_online: AtomicBool,
    initialized: AtomicBool,
    loaded: AtomicBool,
    processing: AtomicBool,
    /// A pass was requested while one was running
    rerun: AtomicBool,
    subscribers: Arc<SubscriberSet>,
    snapshot_tx: watch::Sender<Vec<QueuedMessage>>,
    dropped_tx: broadcast::Sender<DroppedMessage>,
}

/// What a failed send did to the live entry
enum FailureOutcome {
    Retained,
    Dropped,
    /// Entry was removed by someone else while the send was in flight
    Missing,
}

/// Clears the in-flight flag when a pass ends, including on early return
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl OfflineQueue {
    pub fn new(
        config: QueueConfig,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(Vec::new());
        let (dropped_tx, _) = broadcast::channel(DROPPED_CAPACITY);

        Self {
            store: QueueStore::new(store, config.storage_key.clone()),
            config,
            entries: Mutex::new(Vec::new()),
            gate: tokio::sync::Mutex::new(()),
            transport,
            is_online: AtomicBool::new(true),
            initialized: AtomicBool::new(false),
            loaded: AtomicBool::new(false),
            processing: AtomicBool::new(false),
            rerun: AtomicBool::new(false),
            subscribers: Arc::new(SubscriberSet::default()),
            snapshot_tx,
            dropped_tx,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Load the persisted queue and start listening for network changes.
    ///
    /// The returned task lives as long as the observer has senders.
    pub async fn initialize(
        self: &Arc<Self>,
        network: &NetworkObserver,
    ) -> Result<JoinHandle<()>, QueueError> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return Err(QueueError::AlreadyInitialized);
        }

        // Subscribe before loading so no event published meanwhile is missed
        let events = network.subscribe();
        self.load().await;

        let queue = Arc::clone(self);
        Ok(tokio::spawn(async move { queue.listen(events).await }))
    }

    async fn load(&self) {
        let _gate = self.gate.lock().await;

        let loaded = match self.store.load().await {
            Ok(messages) => messages,
            Err(e) => {
                PersistenceMetrics::record_load_failure();
                tracing::error!(
                    error = %e,
                    key = %self.store.key(),
                    "Failed to load message queue"
                );
                Vec::new()
            }
        };
        let loaded_len = loaded.len();

        let (snapshot, changed) = {
            let mut entries = self.entries();
            let early = std::mem::take(&mut *entries);
            let mut merged = self.repair(loaded);
            let repaired = merged.len() != loaded_len;

            // Messages enqueued before initialize() go after the persisted ones
            let mut seen: HashSet<String> = merged.iter().map(|m| m.id.clone()).collect();
            let early_len = early.len();
            merged.extend(early.into_iter().filter(|m| seen.insert(m.id.clone())));

            *entries = merged;
            (entries.clone(), repaired || early_len > 0)
        };

        self.loaded.store(true, Ordering::Release);
        if changed {
            self.persist(&snapshot).await;
        }

        tracing::info!(
            pending = snapshot.len(),
            backend = self.store.backend_type(),
            "Offline queue loaded"
        );
        self.publish(&snapshot);
    }

    /// Drop loaded entries that break the queue invariants.
    fn repair(&self, loaded: Vec<QueuedMessage>) -> Vec<QueuedMessage> {
        let mut seen = HashSet::new();
        loaded
            .into_iter()
            .filter(|message| {
                if message.retry_count >= self.config.max_retries {
                    tracing::warn!(
                        message_id = %message.id,
                        retry_count = message.retry_count,
                        "Discarding persisted message that already exhausted its retries"
                    );
                    return false;
                }
                if !seen.insert(message.id.clone()) {
                    tracing::warn!(message_id = %message.id, "Discarding duplicate persisted message");
                    return false;
                }
                true
            })
            .collect()
    }

    async fn listen(&self, mut events: broadcast::Receiver<bool>) {
        loop {
            match events.recv().await {
                Ok(connected) => {
                    self.handle_network_change(connected).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Network listener lagged, some events were skipped");
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("Network observer closed, listener stopping");
                    break;
                }
            }
        }
    }

    /// Apply a connectivity event.
    ///
    /// Only an offline→online transition triggers a pass; returns whether it
    /// did. If a pass is already running, it makes another round over the
    /// current queue before finishing.
    pub async fn handle_network_change(&self, connected: bool) -> bool {
        let was_online = self.is_online.swap(connected, Ordering::AcqRel);
        if was_online == connected {
            return false;
        }

        NetworkMetrics::record_transition(connected);
        if connected {
            tracing::info!(
                pending = self.pending_count(),
                "Back online, processing queued messages"
            );
            self.process_queue().await;
            true
        } else {
            tracing::info!("Went offline, outbound messages will be queued");
            false
        }
    }

    pub fn is_online(&self) -> bool {
        self.is_online.load(Ordering::Acquire)
    }

    /// Add a message to the end of the queue and return its id.
    pub async fn enqueue(&self, user_id: i64, text: impl Into<String>) -> String {
        let _gate = self.gate.lock().await;

        let (id, snapshot) = {
            let mut entries = self.entries();
            let mut message = QueuedMessage::new(user_id, text);
            while entries.iter().any(|m| m.id == message.id) {
                message.id = generate_id(message.timestamp);
            }
            let id = message.id.clone();
            entries.push(message);
            (id, entries.clone())
        };

        self.persist(&snapshot).await;
        QueueMetrics::record_enqueued();
        tracing::debug!(
            message_id = %id,
            user_id,
            queue_size = snapshot.len(),
            "Message queued for later delivery"
        );
        self.publish(&snapshot);

        id
    }

    /// Remove a message by id. Unknown ids are ignored.
    pub async fn dequeue(&self, id: &str) {
        let _gate = self.gate.lock().await;
        self.remove_entry(id).await;
    }

    /// Caller must hold the gate.
    async fn remove_entry(&self, id: &str) -> Option<QueuedMessage> {
        let (removed, snapshot) = {
            let mut entries = self.entries();
            let removed = entries
                .iter()
                .position(|m| m.id == id)
                .map(|index| entries.remove(index));
            (removed, entries.clone())
        };

        self.persist(&snapshot).await;
        self.publish(&snapshot);
        removed
    }

    /// Copy of the queue contents in send order.
    pub fn get_queue(&self) -> Vec<QueuedMessage> {
        self.entries().clone()
    }

    pub fn has_pending_messages(&self) -> bool {
        !self.entries().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.entries().len()
    }

    /// Try to deliver every message present when the pass starts, in order,
    /// one at a time.
    ///
    /// Delivered messages are removed immediately. A failure increments the
    /// live entry's retry count; reaching the ceiling drops the entry and
    /// announces it on `dropped()`. Messages removed after the snapshot was
    /// taken are skipped, and messages enqueued during the pass wait for the
    /// next one.
    ///
    /// Only one pass runs at a time. A call made while a pass is running
    /// returns at once and the running pass takes a fresh snapshot and goes
    /// again when its current round ends.
    pub async fn process_queue(&self) {
        self.rerun.store(true, Ordering::SeqCst);
        loop {
            if self.processing.swap(true, Ordering::SeqCst) {
                tracing::debug!("Queue pass already running, another round scheduled");
                return;
            }
            let pass = PassGuard(&self.processing);
            while self.rerun.swap(false, Ordering::SeqCst) {
                self.run_pass().await;
            }
            drop(pass);

            // A request may have landed between the last round and the release
            if !self.rerun.load(Ordering::SeqCst) {
                return;
            }
        }
    }

    async fn run_pass(&self) {
        let snapshot = self.get_queue();
        if snapshot.is_empty() {
            return;
        }

        QueueMetrics::record_pass();
        tracing::info!(pending = snapshot.len(), "Processing queued messages");

        let (mut delivered, mut retried, mut dropped, mut skipped) = (0usize, 0usize, 0usize, 0usize);

        for message in snapshot {
            if !self.contains(&message.id) {
                skipped += 1;
                tracing::debug!(message_id = %message.id, "Queued message removed before its turn");
                continue;
            }

            match self.transport.send(message.user_id, &message.text).await {
                Ok(sent) => {
                    let _gate = self.gate.lock().await;
                    self.remove_entry(&message.id).await;
                    QueueMetrics::record_delivered();
                    delivered += 1;
                    tracing::info!(
                        message_id = %message.id,
                        server_id = sent.id,
                        "Sent queued message"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        message_id = %message.id,
                        error = %e,
                        "Failed to send queued message"
                    );
                    match self.record_failure(&message.id, e.to_string()).await {
                        FailureOutcome::Retained => retried += 1,
                        FailureOutcome::Dropped => dropped += 1,
                        FailureOutcome::Missing => skipped += 1,
                    }
                }
            }
        }

        let remaining = {
            let _gate = self.gate.lock().await;
            let snapshot = self.get_queue();
            self.publish(&snapshot);
            snapshot.len()
        };

        tracing::info!(
            delivered,
            retried,
            dropped,
            skipped,
            remaining,
            "Queue pass finished"
        );
    }

    async fn record_failure(&self, id: &str, error: String) -> FailureOutcome {
        let _gate = self.gate.lock().await;

        let (dropped, snapshot) = {
            let mut entries = self.entries();
            let Some(index) = entries.iter().position(|m| m.id == id) else {
                return FailureOutcome::Missing;
            };

            entries[index].retry_count += 1;
            let dropped = if entries[index].retry_count >= self.config.max_retries {
                Some(entries.remove(index))
            } else {
                None
            };
            (dropped, entries.clone())
        };

        self.persist(&snapshot).await;

        match dropped {
            Some(message) => {
                QueueMetrics::record_dropped();
                tracing::warn!(
                    message_id = %message.id,
                    retry_count = message.retry_count,
                    "Removing message after exhausting retries"
                );
                self.publish(&snapshot);
                // No receivers is fine
                let _ = self.dropped_tx.send(DroppedMessage {
                    message,
                    last_error: error,
                });
                FailureOutcome::Dropped
            }
            None => {
                QueueMetrics::record_retried();
                FailureOutcome::Retained
            }
        }
    }

    /// Register a listener called with the queue contents after every change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[QueuedMessage]) + Send + Sync + 'static,
    {
        let listener: QueueListener = Arc::new(listener);
        let id = self.subscribers.insert(listener);
        Subscription::new(id, &self.subscribers)
    }

    /// Receiver that always holds the latest queue contents.
    pub fn watch(&self) -> watch::Receiver<Vec<QueuedMessage>> {
        self.snapshot_tx.subscribe()
    }

    /// Messages dropped after exhausting their retries.
    pub fn dropped(&self) -> broadcast::Receiver<DroppedMessage> {
        self.dropped_tx.subscribe()
    }

    /// Discard every pending message and the persisted copy.
    pub async fn clear(&self) {
        let _gate = self.gate.lock().await;

        let discarded = std::mem::take(&mut *self.entries()).len();
        if let Err(e) = self.store.erase().await {
            PersistenceMetrics::record_erase_failure();
            tracing::error!(error = %e, key = %self.store.key(), "Failed to erase message queue");
        }

        tracing::info!(discarded, "Offline queue cleared");
        self.publish(&[]);
    }

    fn contains(&self, id: &str) -> bool {
        self.entries().iter().any(|m| m.id == id)
    }

    fn entries(&self) -> MutexGuard<'_, Vec<QueuedMessage>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn persist(&self, snapshot: &[QueuedMessage]) {
        if !self.loaded.load(Ordering::Acquire) {
            return;
        }
        if let Err(e) = self.store.save(snapshot).await {
            PersistenceMetrics::record_save_failure();
            tracing::error!(error = %e, key = %self.store.key(), "Failed to save message queue");
        }
    }

    fn publish(&self, snapshot: &[QueuedMessage]) {
        QueueMetrics::set_pending(snapshot.len());
        self.snapshot_tx.send_replace(snapshot.to_vec());
        self.subscribers.notify(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};

    use async_trait::async_trait;

    use crate::storage::{MemoryStore, StorageError};
    use crate::transport::{ChatMessage, TransportError};

    /// Transport that answers from a per-text script, defaulting to success.
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<HashMap<String, VecDeque<bool>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn fail(&self, text: &str, times: usize) {
            self.script
                .lock()
                .unwrap()
                .entry(text.to_string())
                .or_default()
                .extend(std::iter::repeat(false).take(times));
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageTransport for ScriptedTransport {
        async fn send(&self, user_id: i64, text: &str) -> Result<ChatMessage, TransportError> {
            self.calls.lock().unwrap().push(text.to_string());
            let ok = self
                .script
                .lock()
                .unwrap()
                .get_mut(text)
                .and_then(|outcomes| outcomes.pop_front())
                .unwrap_or(true);

            if ok {
                Ok(ChatMessage {
                    id: 1,
                    user_id,
                    text: text.to_string(),
                    created_at: "2024-01-01T00:00:00Z".to_string(),
                    user_name: "tester".to_string(),
                })
            } else {
                Err(TransportError::Other("network down".to_string()))
            }
        }
    }

    /// Store whose writes always fail.
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        fn backend_type(&self) -> &'static str {
            "broken"
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(std::io::Error::other("disk gone").into())
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk gone").into())
        }

        async fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk gone").into())
        }
    }

    fn create_queue() -> (Arc<OfflineQueue>, Arc<ScriptedTransport>, Arc<MemoryStore>) {
        let transport = Arc::new(ScriptedTransport::default());
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(OfflineQueue::new(
            QueueConfig::default(),
            store.clone(),
            transport.clone(),
        ));
        (queue, transport, store)
    }

    async fn create_loaded_queue() -> (Arc<OfflineQueue>, Arc<ScriptedTransport>, Arc<MemoryStore>) {
        let (queue, transport, store) = create_queue();
        queue.initialize(&NetworkObserver::new()).await.unwrap();
        (queue, transport, store)
    }

    async fn persisted(store: &MemoryStore) -> Vec<QueuedMessage> {
        match store.get(DEFAULT_KEY).await.unwrap() {
            Some(raw) => serde_json::from_str(&raw).unwrap(),
            None => Vec::new(),
        }
    }

    const DEFAULT_KEY: &str = "@message_queue";

    #[tokio::test]
    async fn test_enqueue_appends_and_persists() {
        let (queue, _, store) = create_loaded_queue().await;

        let first = queue.enqueue(1, "hello").await;
        let second = queue.enqueue(1, "world").await;

        let entries = queue.get_queue();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, first);
        assert_eq!(entries[1].id, second);
        assert_eq!(entries[0].retry_count, 0);
        assert!(queue.has_pending_messages());
        assert_eq!(persisted(&store).await, entries);
    }

    #[tokio::test]
    async fn test_enqueue_dequeue_round_trip() {
        let (queue, _, store) = create_loaded_queue().await;

        let id = queue.enqueue(5, "hi").await;
        queue.dequeue(&id).await;

        assert!(queue.get_queue().is_empty());
        assert!(!queue.has_pending_messages());
        assert!(persisted(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_dequeue_unknown_id_is_noop() {
        let (queue, _, _) = create_queue();
        queue.enqueue(1, "keep").await;

        queue.dequeue("temp_0_missing").await;
        assert_eq!(queue.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_get_queue_is_a_copy() {
        let (queue, _, _) = create_queue();
        queue.enqueue(1, "original").await;

        let mut copy = queue.get_queue();
        copy[0].text = "changed".to_string();
        copy.clear();

        assert_eq!(queue.get_queue()[0].text, "original");
    }

    #[tokio::test]
    async fn test_process_empty_queue_is_noop() {
        let (queue, transport, _) = create_queue();
        let notified = Arc::new(Mutex::new(0));
        let counter = notified.clone();
        queue.subscribe(move |_queue: &[QueuedMessage]| *counter.lock().unwrap() += 1);

        queue.process_queue().await;

        assert!(transport.calls().is_empty());
        assert_eq!(*notified.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_process_sends_in_order_and_empties_queue() {
        let (queue, transport, store) = create_queue();
        for text in ["A", "B", "C"] {
            queue.enqueue(1, text).await;
        }

        queue.process_queue().await;

        assert_eq!(transport.calls(), vec!["A", "B", "C"]);
        assert!(queue.get_queue().is_empty());
        assert!(persisted(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_increments_retry_count() {
        let (queue, transport, store) = create_loaded_queue().await;
        queue.enqueue(1, "flaky").await;
        transport.fail("flaky", 1);

        queue.process_queue().await;

        let entries = queue.get_queue();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].retry_count, 1);
        assert_eq!(persisted(&store).await[0].retry_count, 1);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_pass() {
        let (queue, transport, _) = create_queue();
        queue.enqueue(1, "bad").await;
        queue.enqueue(1, "good").await;
        transport.fail("bad", 1);

        queue.process_queue().await;

        assert_eq!(transport.calls(), vec!["bad", "good"]);
        let entries = queue.get_queue();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "bad");
    }

    #[tokio::test]
    async fn test_dropped_after_three_failures() {
        let (queue, transport, store) = create_queue();
        let mut dropped = queue.dropped();
        queue.enqueue(1, "doomed").await;
        transport.fail("doomed", 3);

        queue.process_queue().await;
        queue.process_queue().await;
        assert_eq!(queue.get_queue()[0].retry_count, 2);

        queue.process_queue().await;
        assert!(queue.get_queue().is_empty());
        assert!(persisted(&store).await.is_empty());

        let event = dropped.try_recv().unwrap();
        assert_eq!(event.message.text, "doomed");
        assert_eq!(event.message.retry_count, 3);
        assert!(event.last_error.contains("network down"));
    }

    #[tokio::test]
    async fn test_success_on_third_attempt() {
        let (queue, transport, _) = create_queue();
        let mut dropped = queue.dropped();
        queue.enqueue(1, "eventually").await;
        transport.fail("eventually", 2);

        queue.process_queue().await;
        queue.process_queue().await;
        assert_eq!(queue.get_queue()[0].retry_count, 2);

        queue.process_queue().await;
        assert!(queue.get_queue().is_empty());
        assert_eq!(transport.calls().len(), 3);
        assert!(dropped.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_custom_ceiling() {
        let transport = Arc::new(ScriptedTransport::default());
        let config = QueueConfig {
            max_retries: 1,
            ..Default::default()
        };
        let queue = OfflineQueue::new(config, Arc::new(MemoryStore::new()), transport.clone());
        queue.enqueue(1, "once").await;
        transport.fail("once", 1);

        queue.process_queue().await;
        assert!(queue.get_queue().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_every_mutation() {
        let (queue, _, _) = create_queue();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscription =
            queue.subscribe(move |q: &[QueuedMessage]| sink.lock().unwrap().push(q.len()));

        let id = queue.enqueue(1, "a").await;
        queue.enqueue(1, "b").await;
        queue.dequeue(&id).await;
        queue.clear().await;

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 1, 0]);

        subscription.unsubscribe();
        subscription.unsubscribe();
        queue.enqueue(1, "c").await;
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_listener_may_read_queue() {
        let (queue, _, _) = create_queue();
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = observed.clone();
        let reader = queue.clone();
        queue.subscribe(move |_q: &[QueuedMessage]| {
            sink.lock().unwrap().push(reader.pending_count());
        });

        queue.enqueue(1, "a").await;
        assert_eq!(*observed.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_watch_replays_latest_snapshot() {
        let (queue, _, _) = create_queue();
        queue.enqueue(1, "a").await;
        queue.enqueue(1, "b").await;

        let rx = queue.watch();
        let latest = rx.borrow().clone();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[1].text, "b");
    }

    #[tokio::test]
    async fn test_clear_erases_store() {
        let (queue, _, store) = create_queue();
        queue.enqueue(1, "a").await;

        queue.clear().await;

        assert!(queue.get_queue().is_empty());
        assert_eq!(store.get(DEFAULT_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persistence_failures_are_swallowed() {
        let transport = Arc::new(ScriptedTransport::default());
        let queue = Arc::new(OfflineQueue::new(
            QueueConfig::default(),
            Arc::new(BrokenStore),
            transport.clone(),
        ));
        let network = NetworkObserver::new();
        queue.initialize(&network).await.unwrap();

        let id = queue.enqueue(1, "kept in memory").await;
        assert_eq!(queue.get_queue()[0].id, id);

        queue.process_queue().await;
        assert!(queue.get_queue().is_empty());

        queue.enqueue(1, "again").await;
        queue.clear().await;
        assert!(queue.get_queue().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_twice_fails() {
        let (queue, _, _) = create_queue();
        let network = NetworkObserver::new();

        queue.initialize(&network).await.unwrap();
        assert!(matches!(
            queue.initialize(&network).await,
            Err(QueueError::AlreadyInitialized)
        ));
    }

    #[tokio::test]
    async fn test_load_repairs_invalid_entries() {
        let (queue, _, store) = create_queue();
        let raw = serde_json::json!([
            {"id": "a", "userId": 1, "text": "ok", "timestamp": 1, "retryCount": 0},
            {"id": "b", "userId": 1, "text": "spent", "timestamp": 2, "retryCount": 3},
            {"id": "a", "userId": 1, "text": "dup", "timestamp": 3, "retryCount": 1}
        ]);
        store.set(DEFAULT_KEY, &raw.to_string()).await.unwrap();

        queue.initialize(&NetworkObserver::new()).await.unwrap();

        let entries = queue.get_queue();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "ok");
        assert_eq!(persisted(&store).await, entries);
    }

    #[tokio::test]
    async fn test_load_keeps_messages_enqueued_before_initialize() {
        let (queue, _, store) = create_queue();
        let raw = serde_json::json!([
            {"id": "old", "userId": 1, "text": "persisted", "timestamp": 1, "retryCount": 1}
        ]);
        store.set(DEFAULT_KEY, &raw.to_string()).await.unwrap();

        queue.enqueue(1, "early").await;
        assert_eq!(persisted(&store).await[0].text, "persisted");

        queue.initialize(&NetworkObserver::new()).await.unwrap();

        let texts: Vec<String> = queue.get_queue().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["persisted", "early"]);
        assert_eq!(persisted(&store).await, queue.get_queue());
    }

    #[tokio::test]
    async fn test_changes_before_initialize_stay_in_memory() {
        let (queue, transport, store) = create_queue();
        let raw = serde_json::json!([
            {"id": "old", "userId": 1, "text": "persisted", "timestamp": 1, "retryCount": 0}
        ]);
        store.set(DEFAULT_KEY, &raw.to_string()).await.unwrap();

        let id = queue.enqueue(1, "gone").await;
        queue.dequeue(&id).await;
        transport.fail("kept", 1);
        queue.enqueue(1, "kept").await;
        queue.process_queue().await;
        assert_eq!(persisted(&store).await.len(), 1);

        queue.initialize(&NetworkObserver::new()).await.unwrap();

        let entries = queue.get_queue();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "old");
        assert_eq!(entries[1].text, "kept");
        assert_eq!(entries[1].retry_count, 1);
    }

    #[tokio::test]
    async fn test_corrupt_store_loads_empty() {
        let (queue, _, store) = create_queue();
        store.set(DEFAULT_KEY, "not json").await.unwrap();

        queue.initialize(&NetworkObserver::new()).await.unwrap();
        assert!(queue.get_queue().is_empty());
    }

    #[tokio::test]
    async fn test_only_offline_to_online_triggers_pass() {
        let (queue, transport, _) = create_queue();
        queue.enqueue(1, "pending").await;
        transport.fail("pending", 2);

        assert!(queue.is_online());
        assert!(!queue.handle_network_change(true).await);
        assert!(!queue.handle_network_change(false).await);
        assert!(!queue.is_online());
        assert!(!queue.handle_network_change(false).await);
        assert!(transport.calls().is_empty());

        assert!(queue.handle_network_change(true).await);
        assert!(queue.is_online());
        assert_eq!(transport.calls().len(), 1);

        assert!(!queue.handle_network_change(true).await);
        assert_eq!(transport.calls().len(), 1);
    }
}
