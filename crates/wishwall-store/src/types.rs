use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wishwall_core::types::WishId;

use crate::error::{Result, StoreError};

pub const MAX_NAME_CHARS: usize = 80;
pub const MAX_WISH_CHARS: usize = 500;

/// One attendee's name + song request.
///
/// Immutable once stored: the only lifecycle transitions are insert and delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishRecord {
    pub id: WishId,
    pub name: String,
    /// Only ever shown to the admin view.
    pub wish: String,
    /// Server timestamp; `None` until the server has confirmed the insert.
    pub created_at: Option<DateTime<Utc>>,
    /// Sort key, present from creation and never rewritten.
    pub created_at_ms: i64,
}

impl WishRecord {
    /// The shape the wall and stage views receive: no wish text.
    pub fn public(&self) -> PublicWish {
        PublicWish {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            created_at_ms: self.created_at_ms,
        }
    }

    /// Case-insensitive substring match on name or wish. Blank queries match all.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&q) || self.wish.to_lowercase().contains(&q)
    }

    /// Best display timestamp: server time when known, else the sort key.
    pub fn display_time(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .or_else(|| wishwall_core::clock::from_ms(self.created_at_ms))
    }
}

/// Public projection of a [`WishRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicWish {
    pub id: WishId,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub created_at_ms: i64,
}

/// The complete current list of records, newest first.
///
/// `version` increases with every committed change so a consumer holding two
/// snapshots can tell which one is newer.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub version: u64,
    pub records: Arc<[WishRecord]>,
}

impl Snapshot {
    pub fn new(version: u64, records: Vec<WishRecord>) -> Self {
        Self {
            version,
            records: records.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn public(&self) -> Vec<PublicWish> {
        self.records.iter().map(WishRecord::public).collect()
    }

    /// Admin search over the snapshot, order preserved.
    pub fn search(&self, query: &str) -> Vec<WishRecord> {
        self.records
            .iter()
            .filter(|r| r.matches(query))
            .cloned()
            .collect()
    }
}

/// A validated submission, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    name: String,
    wish: String,
    created_at_ms: Option<i64>,
}

impl Submission {
    /// Trim and validate. Empty fields are rejected before anything is written.
    pub fn new(name: &str, wish: &str) -> Result<Self> {
        let name = name.trim();
        let wish = wish.trim();
        if name.is_empty() || wish.is_empty() {
            return Err(StoreError::MissingFields);
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(StoreError::TooLong {
                field: "name",
                max: MAX_NAME_CHARS,
            });
        }
        if wish.chars().count() > MAX_WISH_CHARS {
            return Err(StoreError::TooLong {
                field: "wish",
                max: MAX_WISH_CHARS,
            });
        }
        Ok(Self {
            name: name.to_string(),
            wish: wish.to_string(),
            created_at_ms: None,
        })
    }

    /// Use the submitting client's clock as the sort key. Non-positive values
    /// are ignored and the server clock is used instead.
    pub fn with_created_at_ms(mut self, ms: i64) -> Self {
        self.created_at_ms = (ms > 0).then_some(ms);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wish(&self) -> &str {
        &self.wish
    }

    pub fn created_at_ms(&self) -> Option<i64> {
        self.created_at_ms
    }
}
