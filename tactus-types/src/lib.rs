//! # tactus-types
//!
//! Shared type definitions for the Tactus beat-scheduling engine.
//! This crate contains the data model exchanged between tactus-core, the
//! score-loading and transport collaborators, and whatever front-end binds
//! to the engine's observable state.

mod effect;
mod error;
mod playback;
mod status;
mod tempo;

pub use effect::{Cue, Effect};
pub use error::EngineError;
pub use playback::{first_channel, NoteEvent, TransportSnapshot};
pub use status::{EngineStatus, LifecycleState};
pub use tempo::{
    validate_rate, BeatPosition, Mode, Subdivisions, TempoConfig, TimeSignature, MAX_BPM, MAX_RATE,
    MIN_RATE,
};

use std::ops::Add;
use std::time::Duration;

/// Monotonic timestamp, measured from the owning clock's epoch.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct ClockSnapshot(Duration);

impl ClockSnapshot {
    pub const ZERO: ClockSnapshot = ClockSnapshot(Duration::ZERO);

    pub fn from_duration(since_epoch: Duration) -> Self {
        Self(since_epoch)
    }

    pub fn since_epoch(self) -> Duration {
        self.0
    }

    /// Elapsed time from `earlier` to `self`, zero if `earlier` is later.
    pub fn duration_since(self, earlier: ClockSnapshot) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for ClockSnapshot {
    type Output = ClockSnapshot;

    fn add(self, rhs: Duration) -> ClockSnapshot {
        ClockSnapshot(self.0 + rhs)
    }
}

impl std::fmt::Display for ClockSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}s", self.0.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_since_saturates() {
        let a = ClockSnapshot::from_duration(Duration::from_millis(200));
        let b = ClockSnapshot::from_duration(Duration::from_millis(500));
        assert_eq!(b.duration_since(a), Duration::from_millis(300));
        assert_eq!(a.duration_since(b), Duration::ZERO);
    }

    #[test]
    fn add_duration() {
        let t = ClockSnapshot::ZERO + Duration::from_secs(2);
        assert_eq!(t.since_epoch(), Duration::from_secs(2));
        assert_eq!(t.to_string(), "2.000s");
    }
}
