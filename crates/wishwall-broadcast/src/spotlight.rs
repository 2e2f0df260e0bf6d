use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::pubsub::{MergedSubscription, PubSub};

/// Persisted key holding the last spotlight event.
pub const SPOTLIGHT_KEY: &str = "spotlight";

/// A timed full-screen takeover message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotlightEvent {
    pub id: String,
    pub active: bool,
    pub message: String,
    /// Expiry instant, epoch milliseconds.
    pub until: i64,
    /// Full length of the takeover. Zero for events persisted without it.
    #[serde(default, rename = "durationMs")]
    pub duration_ms: i64,
}

impl SpotlightEvent {
    pub fn new(message: impl Into<String>, duration: Duration, now_ms: i64) -> Self {
        let duration_ms = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        Self {
            id: Uuid::new_v4().to_string(),
            active: true,
            message: message.into(),
            until: now_ms.saturating_add(duration_ms),
            duration_ms,
        }
    }

    /// Current only while active and not yet expired. An expired event is
    /// absent no matter what `active` says.
    pub fn is_current(&self, now_ms: i64) -> bool {
        self.active && self.until > now_ms
    }

    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        (self.until - now_ms).max(0)
    }
}

/// Spotlight propagation: a [`PubSub`] specialised to [`SpotlightEvent`].
pub struct SpotlightChannel {
    inner: PubSub<SpotlightEvent>,
}

impl SpotlightChannel {
    pub fn new(durable: Arc<dyn KeyValueStore>, live_enabled: bool) -> Self {
        Self {
            inner: PubSub::new(SPOTLIGHT_KEY, durable, live_enabled),
        }
    }

    /// Start a new takeover lasting `duration` from `now_ms`.
    pub fn trigger(&self, message: &str, duration: Duration, now_ms: i64) -> Result<SpotlightEvent> {
        let event = SpotlightEvent::new(message, duration, now_ms);
        info!(spotlight_id = %event.id, until = event.until, "spotlight triggered");
        self.inner.publish(&event)?;
        Ok(event)
    }

    pub fn publish(&self, event: &SpotlightEvent) -> Result<()> {
        self.inner.publish(event)
    }

    pub fn subscribe(&self) -> Option<broadcast::Receiver<SpotlightEvent>> {
        self.inner.subscribe()
    }

    pub fn subscribe_merged(&self) -> MergedSubscription<SpotlightEvent> {
        self.inner.subscribe_merged()
    }

    /// Raw persisted event, expired or not.
    pub fn read_persisted(&self) -> Option<SpotlightEvent> {
        self.inner.read_current()
    }

    /// The persisted event, only if it is still current.
    pub fn current(&self, now_ms: i64) -> Option<SpotlightEvent> {
        self.inner.read_current().filter(|e| e.is_current(now_ms))
    }

    /// Unconditionally erase the persisted event.
    pub fn clear(&self) -> bool {
        self.inner.clear()
    }

    /// Erase the persisted event only if it is still the one with `id`.
    ///
    /// A consumer finishing its countdown for an old event must not wipe a
    /// newer one the admin triggered in the meantime.
    pub fn clear_if(&self, id: &str) -> bool {
        match self.inner.read_current() {
            Some(e) if e.id == id => {
                let removed = self.inner.clear();
                if removed {
                    info!(spotlight_id = %id, "spotlight cleared");
                }
                removed
            }
            _ => false,
        }
    }

    pub fn live_available(&self) -> bool {
        self.inner.live_available()
    }
}
