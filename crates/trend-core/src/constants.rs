use rust_decimal::Decimal;

/// Per-step decay factor α = 0.989
pub const DECAY_FACTOR: Decimal = Decimal::from_parts(989, 0, 0, false, 3);

/// Step duration: 20 seconds
pub const STEP_MILLIS: u64 = 20_000;

/// Steps beyond which every score is treated as exactly zero.
/// 4320 steps of 20s is 24 hours; 0.989^4320 is below 2e-21.
pub const HORIZON_STEPS: u64 = 4_320;

/// Maximum number of tracked items (K)
pub const CAPACITY: usize = 5;

/// Clock origin when no snapshot is available: 2001-07-08T02:00:00Z
pub const DEFAULT_EPOCH_MILLIS: u64 = 994_557_600_000;
