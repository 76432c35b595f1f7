//! Exponential decay of tracked scores, discretized per clock step.
//!
//! `score' = score × α^steps`, with a hard reset to zero once the gap
//! exceeds the horizon.

use rust_decimal::{Decimal, MathematicalOps};

use crate::config::TrackerConfig;
use crate::score::{Score, TrackedItem};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecayEngine {
    factor: Decimal,
    horizon_steps: u64,
}

impl Default for DecayEngine {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}

impl DecayEngine {
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            factor: config.decay_factor,
            horizon_steps: config.horizon_steps,
        }
    }

    pub fn factor(&self) -> Decimal {
        self.factor
    }

    pub fn horizon_steps(&self) -> u64 {
        self.horizon_steps
    }

    /// Multiplier for `steps` elapsed steps. Past the horizon this is exactly zero.
    pub fn decay_factor(&self, steps: u64) -> Decimal {
        if steps == 0 {
            Decimal::ONE
        } else if steps > self.horizon_steps {
            Decimal::ZERO
        } else {
            self.factor.checked_powu(steps).unwrap_or(Decimal::ZERO)
        }
    }

    /// Rescale every score in place for `steps` elapsed steps.
    pub fn apply_decay(&self, steps: u64, items: &mut [TrackedItem]) {
        if steps == 0 {
            return;
        }

        if steps > self.horizon_steps {
            for item in items.iter_mut() {
                item.score = Score::ZERO;
            }
            return;
        }

        let decay = self.decay_factor(steps);
        for item in items.iter_mut() {
            item.score.scale(decay);
        }
    }
}
