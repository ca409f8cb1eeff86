//! Logical time to beat/subdivision indices.
//!
//! Always uses the nominal tempo. The playback-rate multiplier is already
//! folded into logical time by the time base; applying it here again would
//! count beats at rate² speed.

use std::time::Duration;

use tactus_types::{BeatPosition, TempoConfig};

/// Fraction of a subdivision forgiven when flooring, so positions computed
/// exactly on a boundary (e.g. 0.3 / 0.1) or a few nanoseconds before it
/// after `Duration` rounding do not land one subdivision short.
const BOUNDARY_EPSILON: f64 = 1e-6;

/// Seconds to `Duration`, rounded up to the next nanosecond. Timer deadlines
/// built this way never fall before the boundary they aim at.
pub fn ceil_duration(secs: f64) -> Duration {
    Duration::from_nanos((secs.max(0.0) * 1e9).ceil() as u64)
}

/// Absolute subdivision count since logical zero, not wrapped by measure.
pub fn total_subdivisions(logical_time: Duration, tempo: &TempoConfig) -> u64 {
    let subdivisions = logical_time.as_secs_f64() / tempo.subdivision_secs();
    (subdivisions + BOUNDARY_EPSILON).floor() as u64
}

/// Absolute beat count since logical zero.
pub fn total_beats(logical_time: Duration, tempo: &TempoConfig) -> u64 {
    total_subdivisions(logical_time, tempo) / tempo.subdivisions().count() as u64
}

pub fn beat_position(logical_time: Duration, tempo: &TempoConfig) -> BeatPosition {
    position_of(total_subdivisions(logical_time, tempo), tempo)
}

/// Wrap an absolute subdivision count into the measure.
pub fn position_of(total_subdivisions: u64, tempo: &TempoConfig) -> BeatPosition {
    let per_beat = tempo.subdivisions().count() as u64;
    let beats_per_measure = tempo.time_signature().beats_per_measure.max(1) as u64;
    BeatPosition {
        beat_index: ((total_subdivisions / per_beat) % beats_per_measure) as u32,
        subdivision_index: (total_subdivisions % per_beat) as u32,
    }
}

/// Logical instant at which the next subdivision after `logical_time` starts.
pub fn next_boundary(logical_time: Duration, tempo: &TempoConfig) -> Duration {
    let next = total_subdivisions(logical_time, tempo).saturating_add(1);
    ceil_duration(next as f64 * tempo.subdivision_secs())
}
