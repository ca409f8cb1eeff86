//! Wall-clock to piece-time conversion.

use std::time::Duration;

use tactus_types::{validate_rate, ClockSnapshot, EngineError};

use crate::beat_indexer::ceil_duration;

/// Logical piece time derived from a clock origin, a frozen offset and a
/// playback-rate multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBase {
    origin: Option<ClockSnapshot>,
    paused_offset: Duration,
    rate: f64,
}

impl TimeBase {
    pub fn new() -> Self {
        Self {
            origin: None,
            paused_offset: Duration::ZERO,
            rate: 1.0,
        }
    }

    /// Start extrapolating from `at_logical` as of `now`.
    pub fn start(&mut self, now: ClockSnapshot, at_logical: Duration) {
        self.origin = Some(now);
        self.paused_offset = at_logical;
    }

    /// Jump to `to`. Keeps running if running; stays frozen otherwise.
    pub fn seek(&mut self, now: ClockSnapshot, to: Duration) {
        if self.origin.is_some() {
            self.origin = Some(now);
        }
        self.paused_offset = to;
    }

    /// Freeze at the current logical time.
    pub fn pause(&mut self, now: ClockSnapshot) {
        self.paused_offset = self.logical_time(now);
        self.origin = None;
    }

    /// Back to a stopped zero state.
    pub fn reset(&mut self) {
        self.origin = None;
        self.paused_offset = Duration::ZERO;
    }

    pub fn is_running(&self) -> bool {
        self.origin.is_some()
    }

    pub fn logical_time(&self, now: ClockSnapshot) -> Duration {
        match self.origin {
            Some(origin) => {
                let elapsed = now.duration_since(origin);
                if self.rate == 1.0 {
                    self.paused_offset.saturating_add(elapsed)
                } else {
                    self.paused_offset.saturating_add(elapsed.mul_f64(self.rate))
                }
            }
            None => self.paused_offset,
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Change the rate without rescaling time already elapsed: the offset is
    /// re-based to the current logical time first.
    pub fn set_rate(&mut self, now: ClockSnapshot, rate: f64) -> Result<(), EngineError> {
        validate_rate(rate)?;
        if self.origin.is_some() {
            self.paused_offset = self.logical_time(now);
            self.origin = Some(now);
        }
        self.rate = rate;
        Ok(())
    }

    /// Wall-clock instant at which logical time reaches `logical`, if running
    /// and `logical` is not already behind.
    pub fn wall_time_of(&self, now: ClockSnapshot, logical: Duration) -> Option<ClockSnapshot> {
        self.origin?;
        let ahead = logical.checked_sub(self.logical_time(now))?;
        Some(now + ceil_duration(ahead.as_secs_f64() / self.rate))
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new()
    }
}
