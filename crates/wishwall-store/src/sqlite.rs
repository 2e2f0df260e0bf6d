use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info, instrument, warn};
use wishwall_core::types::WishId;

use crate::db::init_db;
use crate::error::Result;
use crate::store::{Listener, ListenerRegistry, RecordStore, Subscription};
use crate::types::{Snapshot, Submission, WishRecord};

const SELECT_ORDERED: &str = "SELECT id, name, wish, created_at, created_at_ms
     FROM wishes
     ORDER BY created_at_ms DESC, id DESC";

/// SQLite-backed [`RecordStore`].
///
/// Wraps a single connection in a `Mutex`; every write, snapshot read and
/// listener notification happens under that lock, so subscribers observe
/// snapshots in commit order.
pub struct SqliteRecordStore {
    db: Mutex<Connection>,
    listeners: Arc<ListenerRegistry>,
    version: AtomicU64,
}

impl SqliteRecordStore {
    /// Wrap an open connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
            listeners: ListenerRegistry::new(),
            version: AtomicU64::new(0),
        })
    }

    /// Private in-memory store (tests, `export` on an empty path).
    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    fn lock_db(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current(&self, db: &Connection) -> Result<Snapshot> {
        let records = read_all(db)?;
        Ok(Snapshot::new(self.version.load(Ordering::Acquire), records))
    }

    /// Bump the version and push the new list to every listener.
    ///
    /// The write has already committed, so a failed re-read is logged rather
    /// than reported: the next change will deliver a complete snapshot.
    fn publish(&self, db: &Connection) {
        self.version.fetch_add(1, Ordering::AcqRel);
        match self.current(db) {
            Ok(snapshot) => {
                debug!(version = snapshot.version, len = snapshot.len(), "publishing snapshot");
                self.listeners.notify(&snapshot);
            }
            Err(e) => warn!(error = %e, "snapshot re-read failed after write"),
        }
    }
}

impl RecordStore for SqliteRecordStore {
    #[instrument(skip(self, submission), fields(name = %submission.name()))]
    fn create(&self, submission: &Submission) -> Result<WishRecord> {
        let now = Utc::now();
        let record = WishRecord {
            id: WishId::new(),
            name: submission.name().to_string(),
            wish: submission.wish().to_string(),
            created_at: Some(now),
            created_at_ms: submission
                .created_at_ms()
                .unwrap_or_else(|| now.timestamp_millis()),
        };

        let db = self.lock_db();
        db.execute(
            "INSERT INTO wishes (id, name, wish, created_at, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                record.id.as_str(),
                record.name,
                record.wish,
                now.to_rfc3339(),
                record.created_at_ms
            ],
        )?;
        info!(wish_id = %record.id, "wish created");
        self.publish(&db);
        Ok(record)
    }

    #[instrument(skip(self))]
    fn delete_one(&self, id: &str) -> Result<bool> {
        let db = self.lock_db();
        let n = db.execute("DELETE FROM wishes WHERE id = ?1", [id])?;
        if n == 0 {
            debug!(wish_id = %id, "delete of unknown wish ignored");
            return Ok(false);
        }
        info!(wish_id = %id, "wish deleted");
        self.publish(&db);
        Ok(true)
    }

    #[instrument(skip(self))]
    fn clear_all(&self) -> Result<usize> {
        let db = self.lock_db();
        let n = db.execute("DELETE FROM wishes", [])?;
        if n > 0 {
            info!(count = n, "all wishes cleared");
            self.publish(&db);
        }
        Ok(n)
    }

    fn snapshot(&self) -> Result<Snapshot> {
        let db = self.lock_db();
        self.current(&db)
    }

    fn subscribe(&self, listener: Listener) -> Result<Subscription> {
        let db = self.lock_db();
        let initial = self.current(&db)?;
        Ok(self.listeners.add(listener, &initial))
    }
}

fn read_all(db: &Connection) -> Result<Vec<WishRecord>> {
    let mut stmt = db.prepare_cached(SELECT_ORDERED)?;
    let records = stmt
        .query_map([], row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Map a SQLite row to a `WishRecord`.
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<WishRecord> {
    let created_at: Option<String> = row.get(3)?;
    // An unparsable server timestamp is shown as "pending" rather than failing the read
    let created_at = created_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(WishRecord {
        id: WishId(row.get(0)?),
        name: row.get(1)?,
        wish: row.get(2)?,
        created_at,
        created_at_ms: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn store() -> SqliteRecordStore {
        SqliteRecordStore::open_in_memory().expect("in-memory store")
    }

    fn submit(store: &SqliteRecordStore, name: &str, ms: i64) -> WishRecord {
        let s = Submission::new(name, "a song").unwrap().with_created_at_ms(ms);
        store.create(&s).expect("create")
    }

    /// Collects every snapshot a listener receives.
    fn recorder() -> (Listener, Arc<Mutex<Vec<Snapshot>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: Listener = Box::new(move |s: &Snapshot| sink.lock().unwrap().push(s.clone()));
        (listener, seen)
    }

    #[test]
    fn newest_first_by_sort_key() {
        let store = store();
        submit(&store, "Cleo", 100);
        submit(&store, "Anna", 300);
        submit(&store, "Bo", 200);

        let snap = store.snapshot().unwrap();
        assert_eq!(snap.names(), vec!["Anna", "Bo", "Cleo"]);
    }

    #[test]
    fn deleting_middle_record_keeps_order() {
        let store = store();
        submit(&store, "Cleo", 100);
        let bo = submit(&store, "Bo", 200);
        submit(&store, "Anna", 300);

        assert!(store.delete_one(bo.id.as_str()).unwrap());
        assert_eq!(store.snapshot().unwrap().names(), vec!["Anna", "Cleo"]);
    }

    #[test]
    fn create_assigns_both_timestamps() {
        let store = store();
        let r = store.create(&Submission::new("Anna", "song").unwrap()).unwrap();
        assert!(r.created_at.is_some());
        assert!(r.created_at_ms > 0);

        let stored = &store.snapshot().unwrap().records[0];
        assert_eq!(stored.created_at_ms, r.created_at_ms);
        assert_eq!(stored.id, r.id);
    }

    #[test]
    fn delete_unknown_id_is_silent_noop() {
        let store = store();
        submit(&store, "Anna", 1);
        let (listener, seen) = recorder();
        let _sub = store.subscribe(listener).unwrap();

        assert!(!store.delete_one("does-not-exist").unwrap());
        assert_eq!(store.snapshot().unwrap().names(), vec!["Anna"]);
        // only the initial delivery
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn subscribe_delivers_current_snapshot_immediately() {
        let store = store();
        submit(&store, "Anna", 1);
        let (listener, seen) = recorder();
        let _sub = store.subscribe(listener).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].names(), vec!["Anna"]);
    }

    #[test]
    fn every_subscriber_gets_full_snapshots() {
        let store = store();
        let (a, seen_a) = recorder();
        let (b, seen_b) = recorder();
        let _sa = store.subscribe(a).unwrap();
        let _sb = store.subscribe(b).unwrap();

        submit(&store, "Anna", 1);
        submit(&store, "Bo", 2);

        for seen in [seen_a, seen_b] {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 3);
            assert_eq!(seen[2].names(), vec!["Bo", "Anna"]);
            assert!(seen[1].version < seen[2].version);
        }
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let store = store();
        let (listener, seen) = recorder();
        let sub = store.subscribe(listener).unwrap();
        assert_eq!(store.subscriber_count(), 1);

        sub.unsubscribe();
        assert_eq!(store.subscriber_count(), 0);
        submit(&store, "Anna", 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let store = store();
        {
            let (listener, _seen) = recorder();
            let _sub = store.subscribe(listener).unwrap();
            assert_eq!(store.subscriber_count(), 1);
        }
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn clear_all_then_fresh_subscription_is_empty() {
        let store = store();
        submit(&store, "Anna", 1);
        submit(&store, "Bo", 2);

        assert_eq!(store.clear_all().unwrap(), 2);
        let (listener, seen) = recorder();
        let _sub = store.subscribe(listener).unwrap();
        assert!(seen.lock().unwrap()[0].is_empty());
    }

    #[test]
    fn clear_on_empty_store_does_not_notify() {
        let store = store();
        let (listener, seen) = recorder();
        let _sub = store.subscribe(listener).unwrap();
        assert_eq!(store.clear_all().unwrap(), 0);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn last_snapshot_matches_applied_operations() {
        let store = store();
        let (listener, seen) = recorder();
        let _sub = store.subscribe(listener).unwrap();

        let mut expected = BTreeSet::new();
        let mut ids = Vec::new();
        for i in 1..=8 {
            let r = submit(&store, &format!("guest-{i}"), i);
            expected.insert(r.id.clone());
            ids.push(r.id);
        }
        for id in ids.iter().step_by(3) {
            store.delete_one(id.as_str()).unwrap();
            expected.remove(id);
        }
        store.delete_one(ids[0].as_str()).unwrap(); // already gone

        let seen = seen.lock().unwrap();
        let last = seen.last().unwrap();
        let got: BTreeSet<_> = last.records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = std::env::temp_dir().join(format!("wishwall-store-{}", WishId::new()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("wishes.db");

        {
            let store = SqliteRecordStore::new(Connection::open(&path).unwrap()).unwrap();
            submit(&store, "Anna", 5);
        }
        let store = SqliteRecordStore::new(Connection::open(&path).unwrap()).unwrap();
        assert_eq!(store.snapshot().unwrap().names(), vec!["Anna"]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
