//! `wishwall-broadcast`: last-value-wins propagation of transient state.
//!
//! A [`PubSub`] pairs a best-effort live channel (tokio broadcast) with a
//! durable slot in a [`KeyValueStore`], so a consumer that joins late, or
//! that runs without the live channel, can still recover the current value.

pub mod db;
pub mod error;
pub mod kv;
pub mod likes;
pub mod pubsub;
pub mod spotlight;

pub use error::{BroadcastError, Result};
pub use kv::{KeyValueStore, MemoryKv, SqliteKv};
pub use likes::{LikeCounter, LikeState};
pub use pubsub::{MergedSubscription, PubSub};
pub use spotlight::{SpotlightChannel, SpotlightEvent};
