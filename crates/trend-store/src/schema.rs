use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, StoreError};

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    // Non-fatal: in-memory DBs and fresh files legitimately fail this.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::info!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS trend_items (
            position INTEGER PRIMARY KEY,
            id       TEXT NOT NULL UNIQUE,
            score    TEXT NOT NULL
        );
        ",
    )?;

    match get_schema_version(conn)? {
        Some(SCHEMA_VERSION) => {}
        Some(other) => {
            return Err(StoreError::InvalidData(format!(
                "unsupported schema version {other} (expected {SCHEMA_VERSION})"
            )));
        }
        None => {
            conn.execute(
                "INSERT INTO metadata (key, value) VALUES ('schema_version', ?1)",
                [SCHEMA_VERSION.to_string()],
            )?;
        }
    }

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|v| {
        v.parse::<i64>()
            .map_err(|e| StoreError::InvalidData(format!("invalid schema_version '{v}': {e}")))
    })
    .transpose()
}
