use std::fs;
use std::path::Path;

use trend_core::{SnapshotError, TrackerConfig, TrendTracker};

use crate::error::{Result, StoreError};
use crate::store::Store;

impl Store {
    /// Import a snapshot JSON file into this store, replacing current state.
    pub fn import_json_file(&self, path: &Path, config: &TrackerConfig) -> Result<()> {
        let json = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        self.import_json_str(&json, config)
    }

    /// Import a snapshot JSON string, validating it against `config` first.
    pub fn import_json_str(&self, json: &str, config: &TrackerConfig) -> Result<()> {
        let tracker = trend_core::import_json(json, config.clone())?;
        self.save_snapshot(&tracker.snapshot())
    }

    /// Export the stored snapshot (or an empty one) to a JSON file.
    pub fn export_json_file(&self, path: &Path) -> Result<()> {
        let json = self.export_json_string()?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }

    /// Export the stored snapshot (or an empty one) as pretty-printed JSON.
    pub fn export_json_string(&self) -> Result<String> {
        let snapshot = self.load_snapshot()?.unwrap_or_default();
        serde_json::to_string_pretty(&snapshot)
            .map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
    }

    /// Load the persisted tracker, or a fresh one when nothing is stored.
    pub fn load_tracker(&self, config: &TrackerConfig) -> Result<TrendTracker> {
        match self.load_snapshot()? {
            Some(snapshot) => Ok(TrendTracker::from_snapshot(snapshot, config.clone())?),
            None => Ok(TrendTracker::with_config(config.clone()).map_err(SnapshotError::from)?),
        }
    }

    /// Persist a tracker's full state.
    pub fn save_tracker(&self, tracker: &TrendTracker) -> Result<()> {
        self.save_snapshot(&tracker.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use trend_core::{ItemKey, TrendSnapshot, export_json};

    const T0: u64 = 1_771_632_000_000;

    fn make_tracker() -> TrendTracker {
        let mut tracker = TrendTracker::new();
        for id in ["a", "b", "c"] {
            tracker.record_activation(&ItemKey::new(id).unwrap(), T0);
        }
        tracker
    }

    #[test]
    fn test_import_export_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let original = make_tracker();
        store.save_tracker(&original).unwrap();

        let json = store.export_json_string().unwrap();
        let store2 = Store::open_in_memory().unwrap();
        store2
            .import_json_str(&json, &TrackerConfig::default())
            .unwrap();

        let loaded = store2.load_tracker(&TrackerConfig::default()).unwrap();
        assert_eq!(loaded.snapshot(), original.snapshot());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trend.json");

        let store = Store::open_in_memory().unwrap();
        store.save_tracker(&make_tracker()).unwrap();
        store.export_json_file(&path).unwrap();

        let store2 = Store::open_in_memory().unwrap();
        store2
            .import_json_file(&path, &TrackerConfig::default())
            .unwrap();
        assert_eq!(store2.item_count().unwrap(), 3);
    }

    #[test]
    fn test_export_empty_store() {
        let store = Store::open_in_memory().unwrap();
        let snapshot: TrendSnapshot =
            serde_json::from_str(&store.export_json_string().unwrap()).unwrap();
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.last_wall_time, trend_core::DEFAULT_EPOCH_MILLIS);
    }

    #[test]
    fn test_import_rejects_over_capacity() {
        let store = Store::open_in_memory().unwrap();
        let json = export_json(&make_tracker()).unwrap();
        let small = TrackerConfig {
            capacity: 2,
            ..Default::default()
        };

        let err = store.import_json_str(&json, &small).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Snapshot(SnapshotError::OverCapacity { len: 3, capacity: 2 })
        ));
        assert!(store.load_snapshot().unwrap().is_none(), "nothing written");
    }

    #[test]
    fn test_missing_file_is_invalid_data() {
        let store = Store::open_in_memory().unwrap();
        let err = store
            .import_json_file(Path::new("/nonexistent/trend.json"), &TrackerConfig::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[test]
    fn test_load_tracker_fresh() {
        let store = Store::open_in_memory().unwrap();
        let tracker = store.load_tracker(&TrackerConfig::default()).unwrap();
        assert!(tracker.is_empty());
    }
}
