use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque, non-empty item identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    /// Returns `None` for an empty identifier.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() { None } else { Some(Self(id)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ItemKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ItemKey::new(raw).ok_or_else(|| serde::de::Error::custom("item id must not be empty"))
    }
}

/// Non-negative decayed activation weight.
///
/// Backed by a 96-bit decimal so repeated multiplication by the decay
/// factor is exact up to 28 fractional digits and identical on every
/// platform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Score(Decimal);

impl Score {
    pub const ZERO: Score = Score(Decimal::ZERO);
    /// Weight of a single fresh activation.
    pub const ONE: Score = Score(Decimal::ONE);

    /// Returns `None` for negative values.
    pub fn new(value: Decimal) -> Option<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    /// Add one activation. Saturates at `Decimal::MAX`.
    pub fn increment(&mut self) {
        self.0 = self.0.saturating_add(Decimal::ONE);
    }

    /// Multiply by a factor in `[0, 1]`. Results too small for 28 digits round to zero.
    pub fn scale(&mut self, factor: Decimal) {
        self.0 = self.0.checked_mul(factor).unwrap_or(Decimal::ZERO).normalize();
    }

    /// True when this score would lose to a fresh activation.
    pub fn is_evictable(self) -> bool {
        self.0 < Decimal::ONE
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.normalize(), f)
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <Decimal as Deserialize>::deserialize(deserializer)?;
        Score::new(raw).ok_or_else(|| serde::de::Error::custom("score must not be negative"))
    }
}

/// A tracked identifier paired with its current score.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub id: ItemKey,
    pub score: Score,
}
