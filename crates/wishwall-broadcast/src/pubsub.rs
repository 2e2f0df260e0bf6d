use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::Result;
use crate::kv::{read_json, write_json, KeyValueStore};

const LIVE_CAPACITY: usize = 16;

/// Single-slot publish/subscribe with two transports.
///
/// - live: a tokio broadcast channel. Best-effort; may be disabled, and a
///   publish with no receivers is not an error.
/// - durable: the last published value under `key`, readable by anyone who
///   missed the push.
///
/// Last value wins on both transports; no ordering beyond that is promised.
pub struct PubSub<T> {
    key: String,
    durable: Arc<dyn KeyValueStore>,
    live: Option<broadcast::Sender<T>>,
}

impl<T> PubSub<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + 'static,
{
    pub fn new(key: impl Into<String>, durable: Arc<dyn KeyValueStore>, live_enabled: bool) -> Self {
        let live = live_enabled.then(|| broadcast::channel(LIVE_CAPACITY).0);
        Self {
            key: key.into(),
            durable,
            live,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn live_available(&self) -> bool {
        self.live.is_some()
    }

    /// Persist `value`, then push it live.
    ///
    /// The live push happens even if persisting failed; the persistence error
    /// is still returned so the caller can report it.
    pub fn publish(&self, value: &T) -> Result<()> {
        let persisted = write_json(self.durable.as_ref(), &self.key, value);
        if let Err(ref e) = persisted {
            warn!(key = %self.key, error = %e, "persisting published value failed");
        }
        if let Some(tx) = &self.live {
            // Err only means nobody is listening right now
            let receivers = tx.send(value.clone()).unwrap_or(0);
            debug!(key = %self.key, receivers, "published live");
        }
        persisted
    }

    /// Live receiver, or `None` when the live transport is unavailable.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<T>> {
        self.live.as_ref().map(|tx| tx.subscribe())
    }

    /// Last persisted value. Corrupt or unreadable state reads as `None`.
    pub fn read_current(&self) -> Option<T> {
        read_json(self.durable.as_ref(), &self.key)
    }

    /// Erase the persisted value. Returns whether one was present.
    pub fn clear(&self) -> bool {
        match self.durable.remove(&self.key) {
            Ok(removed) => removed,
            Err(e) => {
                warn!(key = %self.key, error = %e, "clearing persisted value failed");
                false
            }
        }
    }

    /// Durable value first (if any), then live pushes.
    pub fn subscribe_merged(&self) -> MergedSubscription<T> {
        // Subscribe before reading so nothing published in between is lost.
        let live = self.subscribe();
        MergedSubscription {
            pending: self.read_current(),
            live,
        }
    }
}

/// Merged view over both transports, see [`PubSub::subscribe_merged`].
pub struct MergedSubscription<T> {
    pending: Option<T>,
    live: Option<broadcast::Receiver<T>>,
}

impl<T: Clone> MergedSubscription<T> {
    /// Next value. `None` means nothing more will arrive: either the live
    /// transport is unavailable and the durable value was already yielded,
    /// or the publisher was dropped.
    pub async fn recv(&mut self) -> Option<T> {
        if let Some(v) = self.pending.take() {
            return Some(v);
        }
        let rx = self.live.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(v) => return Some(v),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Only the newest value matters; keep reading.
                    debug!(skipped, "merged subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn has_live(&self) -> bool {
        self.live.is_some()
    }
}
