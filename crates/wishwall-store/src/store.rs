use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::debug;

use crate::error::Result;
use crate::types::{Snapshot, Submission, WishRecord};

/// Snapshot callback. Runs on the writer's thread while the store is locked,
/// so it must be cheap and must not call back into the store.
pub type Listener = Box<dyn Fn(&Snapshot) + Send + Sync>;

/// The wish collection as every view sees it.
///
/// Implementations must deliver the full ordered list to every subscriber
/// after each committed change, newest `created_at_ms` first.
pub trait RecordStore: Send + Sync {
    /// Insert a validated submission, assigning id and both timestamps.
    fn create(&self, submission: &Submission) -> Result<WishRecord>;

    /// Delete one record. Returns `false` (not an error) if the id is unknown.
    fn delete_one(&self, id: &str) -> Result<bool>;

    /// Delete every record present at the time of the call. Returns the count.
    fn clear_all(&self) -> Result<usize>;

    /// Current full list.
    fn snapshot(&self) -> Result<Snapshot>;

    /// Register a listener. It receives the current snapshot immediately and
    /// then one snapshot per change until the returned handle is dropped.
    fn subscribe(&self, listener: Listener) -> Result<Subscription>;
}

/// Handle returned by [`RecordStore::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    /// Stop delivery. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Listener table shared between a store and its outstanding subscriptions.
#[derive(Default)]
pub struct ListenerRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a listener, hand it `initial`, and return its handle.
    pub fn add(self: &Arc<Self>, listener: Listener, initial: &Snapshot) -> Subscription {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        listener(initial);
        inner.listeners.insert(id, listener);
        debug!(subscription = id, total = inner.listeners.len(), "snapshot listener added");
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) {
        let mut inner = self.lock();
        if inner.listeners.remove(&id).is_some() {
            debug!(subscription = id, total = inner.listeners.len(), "snapshot listener removed");
        }
    }

    /// Deliver `snapshot` to every registered listener.
    pub fn notify(&self, snapshot: &Snapshot) {
        let inner = self.lock();
        for listener in inner.listeners.values() {
            listener(snapshot);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
