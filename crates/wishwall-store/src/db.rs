use rusqlite::Connection;

use crate::error::Result;

/// Initialise the wishes table and its sort index.
///
/// Safe to call on every startup: uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS wishes (
            id             TEXT    NOT NULL PRIMARY KEY,
            name           TEXT    NOT NULL,
            wish           TEXT    NOT NULL,
            created_at     TEXT,              -- RFC3339, NULL until server-confirmed
            created_at_ms  INTEGER NOT NULL   -- sort key, never changes
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_wishes_created
            ON wishes(created_at_ms DESC, id DESC);",
    )?;
    Ok(())
}
