//! JSON serde for the persisted tracker snapshot.
//!
//! The wire format uses camelCase field names, decimal-string scores and an
//! ISO-8601 `lastWallTime`:
//!
//! ```json
//! {
//!   "version": "1",
//!   "items": [{ "id": "task-42", "score": "1.978" }],
//!   "lastStep": 88473612,
//!   "lastWallTime": "2026-10-14T08:30:00.000Z"
//! }
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, TrackerConfig};
use crate::constants::DEFAULT_EPOCH_MILLIS;
use crate::score::TrackedItem;
use crate::time::WallTime;
use crate::tracker::TrendTracker;

pub const SNAPSHOT_VERSION: &str = "1";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TrendSnapshot {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub items: Vec<TrackedItem>,
    #[serde(rename = "lastStep", default)]
    pub last_step: u64,
    /// Accepts either an ISO-8601 string or integer Unix milliseconds.
    #[serde(
        rename = "lastWallTime",
        default = "default_wall_time",
        with = "wall_time"
    )]
    pub last_wall_time: WallTime,
}

fn default_version() -> String {
    SNAPSHOT_VERSION.to_string()
}

fn default_wall_time() -> WallTime {
    DEFAULT_EPOCH_MILLIS
}

impl Default for TrendSnapshot {
    fn default() -> Self {
        Self::new(Vec::new(), 0, DEFAULT_EPOCH_MILLIS)
    }
}

impl TrendSnapshot {
    pub fn new(items: Vec<TrackedItem>, last_step: u64, last_wall_time: WallTime) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            items,
            last_step,
            last_wall_time,
        }
    }

    /// Check structural invariants before restoring.
    pub fn validate(&self, capacity: usize) -> Result<(), SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version.clone()));
        }
        if self.items.len() > capacity {
            return Err(SnapshotError::OverCapacity {
                len: self.items.len(),
                capacity,
            });
        }
        let mut seen = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if !seen.insert(item.id.as_str()) {
                return Err(SnapshotError::DuplicateItem(item.id.to_string()));
            }
        }
        Ok(())
    }
}

mod wall_time {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::time::{MAX_WALL_TIME, WallTime, millis_to_iso8601, parse_iso8601};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(u64),
        Iso(String),
    }

    pub fn serialize<S: Serializer>(millis: &WallTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&millis_to_iso8601(*millis))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<WallTime, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) if ms <= MAX_WALL_TIME => Ok(ms),
            Raw::Millis(ms) => Err(serde::de::Error::custom(format!(
                "timestamp out of range: {ms}"
            ))),
            Raw::Iso(s) => parse_iso8601(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}"))),
        }
    }
}

#[derive(Debug)]
pub enum SnapshotError {
    Json(serde_json::Error),
    Config(ConfigError),
    UnsupportedVersion(String),
    OverCapacity { len: usize, capacity: usize },
    DuplicateItem(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Json(e) => write!(f, "invalid snapshot JSON: {e}"),
            SnapshotError::Config(e) => write!(f, "invalid tracker config: {e}"),
            SnapshotError::UnsupportedVersion(v) => {
                write!(f, "unsupported snapshot version '{v}'")
            }
            SnapshotError::OverCapacity { len, capacity } => {
                write!(f, "snapshot holds {len} items, capacity is {capacity}")
            }
            SnapshotError::DuplicateItem(id) => write!(f, "duplicate item '{id}' in snapshot"),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Json(e)
    }
}

impl From<ConfigError> for SnapshotError {
    fn from(e: ConfigError) -> Self {
        SnapshotError::Config(e)
    }
}

/// Deserialize a snapshot JSON document into a tracker.
pub fn import_json(json: &str, config: TrackerConfig) -> Result<TrendTracker, SnapshotError> {
    let snapshot: TrendSnapshot = serde_json::from_str(json)?;
    TrendTracker::from_snapshot(snapshot, config)
}

/// Serialize a tracker's full state to pretty-printed snapshot JSON.
pub fn export_json(tracker: &TrendTracker) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&tracker.snapshot())
}
