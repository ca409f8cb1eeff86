use std::fmt;

/// Errors returned by the engine's public API.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// `start()` was called while the engine is disabled.
    Disabled,
    InvalidTempo(f64),
    InvalidRate(f64),
    InvalidTimeSignature {
        beats_per_measure: u32,
        beat_unit: u32,
    },
    /// The engine fell back to one subdivision per beat.
    UnsupportedSubdivisions(u32),
    /// The engine thread is gone.
    Disconnected,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "engine is disabled"),
            Self::InvalidTempo(bpm) => write!(f, "tempo must be in (0, {}] BPM, got {}", crate::MAX_BPM, bpm),
            Self::InvalidRate(rate) => {
                write!(
                    f,
                    "rate multiplier must be in [{}, {}], got {}",
                    crate::MIN_RATE,
                    crate::MAX_RATE,
                    rate
                )
            }
            Self::InvalidTimeSignature {
                beats_per_measure,
                beat_unit,
            } => write!(f, "invalid time signature {}/{}", beats_per_measure, beat_unit),
            Self::UnsupportedSubdivisions(n) => write!(
                f,
                "{} subdivisions per beat is not supported (1, 2 or 4); using 1",
                n
            ),
            Self::Disconnected => write!(f, "engine thread disconnected"),
        }
    }
}

impl std::error::Error for EngineError {}
