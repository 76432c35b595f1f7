use std::path::Path;
use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use trend_core::{ItemKey, Score, TrackedItem, TrendSnapshot};

use crate::error::{Result, StoreError};
use crate::schema;

const KEY_SNAPSHOT_VERSION: &str = "snapshot_version";
const KEY_LAST_STEP: &str = "last_step";
const KEY_LAST_WALL_TIME: &str = "last_wall_time";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        tracing::info!("opened trend store at {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    /// `Ok(None)` only when the key is absent; any other failure propagates.
    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    // --- Save ---

    /// Replace the persisted snapshot in a single transaction.
    pub fn save_snapshot(&self, snapshot: &TrendSnapshot) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute("DELETE FROM trend_items", [])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO trend_items (position, id, score) VALUES (?1, ?2, ?3)")?;
            for (position, item) in snapshot.items.iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    item.id.as_str(),
                    item.score.value().to_string(),
                ])?;
            }
        }

        set_metadata_on(&tx, KEY_SNAPSHOT_VERSION, &snapshot.version)?;
        set_metadata_on(&tx, KEY_LAST_STEP, &snapshot.last_step.to_string())?;
        set_metadata_on(
            &tx,
            KEY_LAST_WALL_TIME,
            &snapshot.last_wall_time.to_string(),
        )?;

        tx.commit()?;
        tracing::debug!(
            items = snapshot.items.len(),
            last_step = snapshot.last_step,
            "saved trend snapshot"
        );
        Ok(())
    }

    // --- Load ---

    /// Load the persisted snapshot, or `None` if nothing has been saved yet.
    pub fn load_snapshot(&self) -> Result<Option<TrendSnapshot>> {
        let Some(version) = self.get_metadata(KEY_SNAPSHOT_VERSION)? else {
            return Ok(None);
        };

        let last_step = match self.get_metadata(KEY_LAST_STEP)? {
            Some(v) => parse_u64(KEY_LAST_STEP, &v)?,
            None => 0,
        };
        let last_wall_time = match self.get_metadata(KEY_LAST_WALL_TIME)? {
            Some(v) => parse_u64(KEY_LAST_WALL_TIME, &v)?,
            None => trend_core::DEFAULT_EPOCH_MILLIS,
        };

        Ok(Some(TrendSnapshot {
            version,
            items: self.load_items()?,
            last_step,
            last_wall_time,
        }))
    }

    fn load_items(&self) -> Result<Vec<TrackedItem>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, score FROM trend_items ORDER BY position")?;

        let rows: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(id, score)| {
                let id = ItemKey::new(id)
                    .ok_or_else(|| StoreError::InvalidData("empty item id".to_string()))?;
                Ok(TrackedItem {
                    score: parse_score(&id, &score)?,
                    id,
                })
            })
            .collect()
    }

    pub fn item_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM trend_items", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Fold the WAL back into the main database file.
    pub fn checkpoint_truncate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

fn set_metadata_on(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

fn parse_u64(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|e| StoreError::InvalidData(format!("invalid {key} '{value}': {e}")))
}

fn parse_score(id: &ItemKey, raw: &str) -> Result<Score> {
    let value = Decimal::from_str(raw)
        .map_err(|e| StoreError::InvalidData(format!("invalid score '{raw}' for {id}: {e}")))?;
    Score::new(value)
        .ok_or_else(|| StoreError::InvalidData(format!("negative score '{raw}' for {id}")))
}
