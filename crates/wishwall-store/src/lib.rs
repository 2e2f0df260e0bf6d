//! `wishwall-store`: the wish record collection.
//!
//! Records live in a SQLite `wishes` table. Every committed change pushes the
//! complete, newest-first list to each subscriber; there are no diffs and no
//! update operation.

pub mod db;
pub mod error;
pub mod export;
pub mod sqlite;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use sqlite::SqliteRecordStore;
pub use store::{Listener, RecordStore, Subscription};
pub use types::{PublicWish, Snapshot, Submission, WishRecord};
