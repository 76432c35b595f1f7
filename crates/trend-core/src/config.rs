use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{CAPACITY, DECAY_FACTOR, HORIZON_STEPS, STEP_MILLIS};

/// Tunables for a tracker instance. `Default` yields the reference constants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum tracked items (K)
    pub capacity: usize,
    /// Step width in milliseconds
    pub step_millis: u64,
    /// Per-step multiplicative decay, strictly between 0 and 1
    pub decay_factor: Decimal,
    /// Elapsed steps beyond which every score resets to zero
    pub horizon_steps: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            capacity: CAPACITY,
            step_millis: STEP_MILLIS,
            decay_factor: DECAY_FACTOR,
            horizon_steps: HORIZON_STEPS,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.step_millis == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if self.decay_factor <= Decimal::ZERO || self.decay_factor >= Decimal::ONE {
            return Err(ConfigError::DecayFactorOutOfRange(self.decay_factor));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroCapacity,
    ZeroStep,
    DecayFactorOutOfRange(Decimal),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroCapacity => write!(f, "capacity must be at least 1"),
            ConfigError::ZeroStep => write!(f, "step_millis must be at least 1"),
            ConfigError::DecayFactorOutOfRange(v) => {
                write!(f, "decay_factor must be in (0, 1), got {v}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
