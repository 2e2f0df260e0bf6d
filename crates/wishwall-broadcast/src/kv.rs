use std::sync::{Mutex, MutexGuard};

use dashmap::DashMap;
use rusqlite::{Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::db::init_db;
use crate::error::Result;

/// Plain string key → string value persistence.
///
/// Stands in for per-device storage: the admin session flag, the like
/// counter and its voted flags, and the last spotlight event all live here.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Returns whether a value was present.
    fn remove(&self, key: &str) -> Result<bool>;
}

/// Read and decode a JSON value.
///
/// Missing keys, store failures and corrupt JSON all read as `None`; the
/// reader never fails because of bad persisted state.
pub fn read_json<T: DeserializeOwned>(kv: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "persisted state read failed");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(key, error = %e, "corrupt persisted state ignored");
            None
        }
    }
}

pub fn write_json<T: Serialize>(kv: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    kv.set(key, &raw)
}

/// SQLite-backed store on the `local_state` table.
pub struct SqliteKv {
    db: Mutex<Connection>,
}

impl SqliteKv {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let db = self.lock();
        let value = db
            .query_row(
                "SELECT value FROM local_state WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.lock();
        db.execute(
            "INSERT INTO local_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, now],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let db = self.lock();
        let n = db.execute("DELETE FROM local_state WHERE key = ?1", [key])?;
        Ok(n > 0)
    }
}

/// In-process store for tests and ephemeral deployments.
#[derive(Default)]
pub struct MemoryKv {
    map: DashMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.map.remove(key).is_some())
    }
}
