use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use reqtrace_core::model::span::SpanRecord;
use tokio::sync::broadcast;
use tracing::warn;

pub const DEFAULT_CAPACITY: usize = 1000;

/// Emitted on the broadcast channel for every store mutation. An exporter
/// subscribes here and owns its own delivery and batching.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    Added(Arc<SpanRecord>),
    Cleared,
}

/// Observer of store mutations. A panic inside either callback is caught
/// and logged; it never aborts the store operation or starves the
/// remaining listeners.
pub trait TraceListener: Send + Sync {
    fn on_insert(&self, record: &SpanRecord);

    fn on_clear(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Buffer {
    records: VecDeque<Arc<SpanRecord>>,
    capacity: usize,
}

/// Bounded, newest-first buffer of finalized span records. Cheap to clone;
/// all clones share the same buffer. Records are shared out as `Arc`s and
/// never mutated after insertion, so snapshots stay stable while the store
/// keeps moving.
#[derive(Clone)]
pub struct TraceStore {
    buffer: Arc<RwLock<Buffer>>,
    listeners: Arc<Mutex<Vec<(ListenerId, Arc<dyn TraceListener>)>>>,
    next_listener: Arc<AtomicU64>,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl TraceStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(1024);
        Self {
            buffer: Arc::new(RwLock::new(Buffer {
                records: VecDeque::new(),
                capacity,
            })),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener: Arc::new(AtomicU64::new(1)),
            event_tx,
        }
    }

    /// Prepends the record, evicting from the tail past capacity, then
    /// notifies listeners and subscribers. Notification happens outside the
    /// write lock so a listener may read the store freely.
    pub fn insert(&self, record: SpanRecord) -> Arc<SpanRecord> {
        let record = Arc::new(record);
        {
            let mut buffer = self.write();
            buffer.records.push_front(record.clone());
            let capacity = buffer.capacity;
            buffer.records.truncate(capacity);
        }

        self.notify_insert(&record);
        let _ = self.event_tx.send(StoreEvent::Added(record.clone()));
        record
    }

    pub fn clear(&self) {
        self.write().records.clear();
        self.notify_clear();
        let _ = self.event_tx.send(StoreEvent::Cleared);
    }

    pub fn set_capacity(&self, capacity: usize) {
        let mut buffer = self.write();
        buffer.capacity = capacity;
        buffer.records.truncate(capacity);
    }

    pub fn capacity(&self) -> usize {
        self.read().capacity
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    /// Snapshot of the buffer, newest first. Later inserts or clears never
    /// alter a snapshot already taken.
    pub fn all(&self) -> Vec<Arc<SpanRecord>> {
        self.read().records.iter().cloned().collect()
    }

    pub fn add_listener(&self, listener: Arc<dyn TraceListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners().push((id, listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }

    fn snapshot_listeners(&self) -> Vec<Arc<dyn TraceListener>> {
        self.listeners()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    fn notify_insert(&self, record: &SpanRecord) {
        for listener in self.snapshot_listeners() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_insert(record)));
            if outcome.is_err() {
                warn!("trace listener panicked during insert notification");
            }
        }
    }

    fn notify_clear(&self) {
        for listener in self.snapshot_listeners() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_clear()));
            if outcome.is_err() {
                warn!("trace listener panicked during clear notification");
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Buffer> {
        self.buffer.read().expect("trace store lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Buffer> {
        self.buffer.write().expect("trace store lock poisoned")
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<(ListenerId, Arc<dyn TraceListener>)>> {
        self.listeners.lock().expect("listener registry poisoned")
    }
}

impl Default for TraceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingListener {
        inserts: AtomicUsize,
        clears: AtomicUsize,
    }

    impl CountingListener {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                inserts: AtomicUsize::new(0),
                clears: AtomicUsize::new(0),
            })
        }
    }

    impl TraceListener for CountingListener {
        fn on_insert(&self, _record: &SpanRecord) {
            self.inserts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_clear(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct PanickingListener;

    impl TraceListener for PanickingListener {
        fn on_insert(&self, _record: &SpanRecord) {
            panic!("listener blew up");
        }
    }

    #[test]
    fn keeps_newest_first_within_capacity() {
        let store = TraceStore::with_capacity(3);
        for i in 0..4 {
            store.insert(testkit::finalized("t", &format!("s{i}"), "GET", &format!("/u/{i}"), 200, 10));
        }

        let all = store.all();
        assert_eq!(store.len(), 3);
        assert_eq!(all[0].url, "/u/3");
        assert_eq!(all[2].url, "/u/1");
    }

    #[test]
    fn inserting_past_capacity_evicts_the_first_insert() {
        let store = TraceStore::with_capacity(1000);
        for i in 0..1001 {
            store.insert(testkit::finalized("t", &format!("s{i}"), "GET", &format!("/u/{i}"), 200, 10));
        }

        assert_eq!(store.len(), 1000);
        let all = store.all();
        assert_eq!(all.last().map(|r| r.url.clone()), Some("/u/1".to_string()));
    }

    #[test]
    fn set_capacity_truncates_from_the_tail() {
        let store = TraceStore::with_capacity(10);
        for i in 0..5 {
            store.insert(testkit::finalized("t", &format!("s{i}"), "GET", &format!("/u/{i}"), 200, 10));
        }

        store.set_capacity(2);
        assert_eq!(store.capacity(), 2);
        let all = store.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].url, "/u/4");
        assert_eq!(all[1].url, "/u/3");
    }

    #[test]
    fn snapshot_is_stable_across_later_mutations() {
        let store = TraceStore::with_capacity(10);
        store.insert(testkit::finalized("t1", "s1", "GET", "/a", 200, 10));
        let snapshot = store.all();

        store.insert(testkit::finalized("t2", "s2", "GET", "/b", 200, 10));
        store.clear();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].url, "/a");
    }

    #[test]
    fn listeners_observe_inserts_and_clears() {
        let store = TraceStore::new();
        let listener = CountingListener::new();
        let id = store.add_listener(listener.clone());

        store.insert(testkit::finalized("t1", "s1", "GET", "/a", 200, 10));
        store.clear();
        assert_eq!(listener.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(listener.clears.load(Ordering::SeqCst), 1);

        assert!(store.remove_listener(id));
        assert!(!store.remove_listener(id));
        store.insert(testkit::finalized("t2", "s2", "GET", "/b", 200, 10));
        assert_eq!(listener.inserts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_listener_does_not_affect_store_or_peers() {
        let store = TraceStore::new();
        store.add_listener(Arc::new(PanickingListener));
        let counting = CountingListener::new();
        store.add_listener(counting.clone());

        store.insert(testkit::finalized("t1", "s1", "GET", "/a", 200, 10));

        assert_eq!(store.len(), 1);
        assert_eq!(counting.inserts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscription_sees_adds_and_clears() {
        let store = TraceStore::new();
        let mut rx = store.subscribe();

        store.insert(testkit::finalized("t1", "s1", "GET", "/a", 200, 10));
        store.clear();

        assert!(matches!(rx.try_recv(), Ok(StoreEvent::Added(record)) if record.url == "/a"));
        assert!(matches!(rx.try_recv(), Ok(StoreEvent::Cleared)));
    }
}
