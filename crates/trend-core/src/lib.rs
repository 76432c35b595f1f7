//! Time-decayed top-K trend tracker.
//!
//! Tracks at most K items from a stream of activations. Every score decays
//! by α = 0.989 per 20-second step, and a gap longer than 24 hours resets
//! all scores to zero. A newcomer can only displace an item whose decayed
//! score has fallen below one fresh activation.
//!
//! Zero I/O. Persistence and transport live in `trend-store` and `trend-cli`.

pub mod clock;
pub mod config;
pub mod constants;
pub mod decay;
pub mod score;
pub mod snapshot;
pub mod time;
pub mod top_k;
pub mod tracker;

pub use clock::StepClock;
pub use config::{ConfigError, TrackerConfig};
pub use constants::{CAPACITY, DECAY_FACTOR, DEFAULT_EPOCH_MILLIS, HORIZON_STEPS, STEP_MILLIS};
pub use decay::DecayEngine;
pub use score::{ItemKey, Score, TrackedItem};
pub use snapshot::{SNAPSHOT_VERSION, SnapshotError, TrendSnapshot, export_json, import_json};
pub use time::{MAX_WALL_TIME, WallTime, millis_to_iso8601, now_unix_millis, parse_iso8601};
pub use top_k::{Admission, TopKStore};
pub use tracker::{SharedTracker, TrendTracker};
