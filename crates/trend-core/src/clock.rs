use crate::constants::{DEFAULT_EPOCH_MILLIS, STEP_MILLIS};
use crate::time::WallTime;

/// Quantizes wall-clock time into fixed-width decay steps.
///
/// `last_wall_time` and `last_step` never move backward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepClock {
    last_wall_time: WallTime,
    last_step: u64,
    step_millis: u64,
}

impl Default for StepClock {
    fn default() -> Self {
        Self::new(STEP_MILLIS)
    }
}

impl StepClock {
    /// Clock starting at the default epoch with step counter 0.
    pub fn new(step_millis: u64) -> Self {
        Self::restore(DEFAULT_EPOCH_MILLIS, 0, step_millis)
    }

    /// Rebuild a clock from persisted state.
    pub fn restore(last_wall_time: WallTime, last_step: u64, step_millis: u64) -> Self {
        Self {
            last_wall_time,
            last_step,
            step_millis: step_millis.max(1),
        }
    }

    pub fn last_wall_time(&self) -> WallTime {
        self.last_wall_time
    }

    pub fn last_step(&self) -> u64 {
        self.last_step
    }

    pub fn step_millis(&self) -> u64 {
        self.step_millis
    }

    /// Steps elapsed between the last observation and `now`, rounded up.
    /// A regression or an identical timestamp yields 0.
    pub fn steps_until(&self, now: WallTime) -> u64 {
        match now.checked_sub(self.last_wall_time) {
            Some(elapsed) if elapsed > 0 => elapsed.div_ceil(self.step_millis),
            _ => 0,
        }
    }

    /// Record `now` as observed after `steps` have been consumed.
    pub fn commit(&mut self, now: WallTime, steps: u64) {
        if now > self.last_wall_time {
            self.last_wall_time = now;
        }
        self.last_step = self.last_step.saturating_add(steps);
    }

    /// `steps_until` followed by `commit`.
    pub fn advance(&mut self, now: WallTime) -> u64 {
        let steps = self.steps_until(now);
        self.commit(now, steps);
        steps
    }
}
