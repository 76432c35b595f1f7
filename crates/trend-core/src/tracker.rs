use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::clock::StepClock;
use crate::config::{ConfigError, TrackerConfig};
use crate::decay::DecayEngine;
use crate::score::{ItemKey, TrackedItem};
use crate::snapshot::{SnapshotError, TrendSnapshot};
use crate::time::WallTime;
use crate::top_k::{Admission, TopKStore};

/// Time-decayed top-K frequency tracker.
///
/// Owns the step clock and the item store. All mutation goes through
/// [`TrendTracker::record_activation`]; wrap in a [`SharedTracker`] to use
/// from more than one thread.
#[derive(Clone, Debug)]
pub struct TrendTracker {
    config: TrackerConfig,
    clock: StepClock,
    decay: DecayEngine,
    store: TopKStore,
}

impl Default for TrendTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendTracker {
    /// Empty tracker with the reference constants and the default epoch.
    pub fn new() -> Self {
        Self::build(TrackerConfig::default())
    }

    pub fn with_config(config: TrackerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: TrackerConfig) -> Self {
        Self {
            clock: StepClock::new(config.step_millis),
            decay: DecayEngine::from_config(&config),
            store: TopKStore::new(config.capacity),
            config,
        }
    }

    /// Restore state verbatim from a validated snapshot.
    pub fn from_snapshot(
        snapshot: TrendSnapshot,
        config: TrackerConfig,
    ) -> Result<Self, SnapshotError> {
        config.validate()?;
        snapshot.validate(config.capacity)?;

        let mut tracker = Self::build(config);
        tracker.clock = StepClock::restore(
            snapshot.last_wall_time,
            snapshot.last_step,
            tracker.config.step_millis,
        );
        tracker.store.restore(snapshot.items);
        Ok(tracker)
    }

    /// Consistent copy of the full state.
    pub fn snapshot(&self) -> TrendSnapshot {
        TrendSnapshot::new(
            self.store.items().to_vec(),
            self.clock.last_step(),
            self.clock.last_wall_time(),
        )
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn clock(&self) -> &StepClock {
        &self.clock
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn items(&self) -> &[TrackedItem] {
        self.store.items()
    }

    /// Decay everything up to `now`, then apply one activation of `id`.
    ///
    /// A rejected activation still advances the clock.
    pub fn record_activation(&mut self, id: &ItemKey, now: WallTime) -> Admission {
        let steps = self.clock.steps_until(now);
        self.decay.apply_decay(steps, self.store.items_mut());
        self.clock.commit(now, steps);
        self.store.admit(id)
    }

    /// Tracked identifiers in store order. Not ranked.
    pub fn current_top_items(&self) -> Vec<ItemKey> {
        self.store.items().iter().map(|i| i.id.clone()).collect()
    }

    /// Tracked items by descending score; ties keep store order.
    pub fn ranked_items(&self) -> Vec<TrackedItem> {
        let mut ranked = self.store.items().to_vec();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }
}

/// Cloneable handle guarding one [`TrendTracker`] behind a single mutex.
///
/// Every method holds the lock for the whole operation, so readers never
/// observe a clock that has advanced without the matching score update.
#[derive(Clone, Debug, Default)]
pub struct SharedTracker {
    inner: Arc<Mutex<TrendTracker>>,
}

impl SharedTracker {
    pub fn new(tracker: TrendTracker) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tracker)),
        }
    }

    // Tracker methods never panic mid-update, so a poisoned lock still
    // guards consistent state.
    fn lock(&self) -> MutexGuard<'_, TrendTracker> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_activation(&self, id: &ItemKey, now: WallTime) -> Admission {
        self.lock().record_activation(id, now)
    }

    pub fn current_top_items(&self) -> Vec<ItemKey> {
        self.lock().current_top_items()
    }

    pub fn ranked_items(&self) -> Vec<TrackedItem> {
        self.lock().ranked_items()
    }

    pub fn snapshot(&self) -> TrendSnapshot {
        self.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
