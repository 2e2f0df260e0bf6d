use rusqlite::Connection;

use crate::error::Result;

/// Initialise the key/value table backing persisted scalar state.
///
/// Safe to call on every startup: uses `IF NOT EXISTS`.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS local_state (
            key         TEXT NOT NULL PRIMARY KEY,
            value       TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        ) STRICT;",
    )?;
    Ok(())
}
