use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Fastest tempo the engine accepts.
pub const MAX_BPM: f64 = 10_000.0;
/// Accepted playback-rate multipliers, inclusive.
pub const MIN_RATE: f64 = 0.01;
pub const MAX_RATE: f64 = 100.0;

/// Check a playback-rate multiplier against [`MIN_RATE`]..=[`MAX_RATE`].
pub fn validate_rate(rate: f64) -> Result<f64, EngineError> {
    if !(MIN_RATE..=MAX_RATE).contains(&rate) {
        return Err(EngineError::InvalidRate(rate));
    }
    Ok(rate)
}

/// Time signature: beats per measure over the beat unit (4 = quarter note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats_per_measure: u32,
    pub beat_unit: u32,
}

impl TimeSignature {
    pub fn new(beats_per_measure: u32, beat_unit: u32) -> Result<Self, EngineError> {
        let ts = Self {
            beats_per_measure,
            beat_unit,
        };
        ts.validate()?;
        Ok(ts)
    }

    pub fn four_four() -> Self {
        Self {
            beats_per_measure: 4,
            beat_unit: 4,
        }
    }

    pub fn three_four() -> Self {
        Self {
            beats_per_measure: 3,
            beat_unit: 4,
        }
    }

    /// Deserialized values bypass `new`, so setters re-check with this.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.beats_per_measure == 0 || self.beat_unit == 0 {
            return Err(EngineError::InvalidTimeSignature {
                beats_per_measure: self.beats_per_measure,
                beat_unit: self.beat_unit,
            });
        }
        Ok(())
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl std::fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.beats_per_measure, self.beat_unit)
    }
}

/// Number of subdivisions per beat. Only straight divisions are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subdivisions {
    #[default]
    One,
    Two,
    Four,
}

impl Subdivisions {
    pub const ALL: [Subdivisions; 3] = [Subdivisions::One, Subdivisions::Two, Subdivisions::Four];

    pub fn from_count(count: u32) -> Option<Self> {
        match count {
            1 => Some(Subdivisions::One),
            2 => Some(Subdivisions::Two),
            4 => Some(Subdivisions::Four),
            _ => None,
        }
    }

    pub fn count(self) -> u32 {
        match self {
            Subdivisions::One => 1,
            Subdivisions::Two => 2,
            Subdivisions::Four => 4,
        }
    }
}

/// Tempo, meter and subdivision settings owned by the engine.
///
/// `bpm` is always in `(0, MAX_BPM]`: every way of changing it goes
/// through [`TempoConfig::set_bpm`], deserialization included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTempoConfig")]
pub struct TempoConfig {
    bpm: f64,
    time_signature: TimeSignature,
    subdivisions: Subdivisions,
}

#[derive(Deserialize)]
struct RawTempoConfig {
    bpm: f64,
    time_signature: TimeSignature,
    subdivisions: Subdivisions,
}

impl TryFrom<RawTempoConfig> for TempoConfig {
    type Error = EngineError;

    fn try_from(raw: RawTempoConfig) -> Result<Self, Self::Error> {
        TempoConfig::new(raw.bpm, raw.time_signature, raw.subdivisions)
    }
}

impl TempoConfig {
    pub fn new(
        bpm: f64,
        time_signature: TimeSignature,
        subdivisions: Subdivisions,
    ) -> Result<Self, EngineError> {
        let mut config = Self::default();
        config.set_bpm(bpm)?;
        config.set_time_signature(time_signature)?;
        config.subdivisions = subdivisions;
        Ok(config)
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), EngineError> {
        if !bpm.is_finite() || bpm <= 0.0 || bpm > MAX_BPM {
            return Err(EngineError::InvalidTempo(bpm));
        }
        self.bpm = bpm;
        Ok(())
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn set_time_signature(&mut self, time_signature: TimeSignature) -> Result<(), EngineError> {
        time_signature.validate()?;
        self.time_signature = time_signature;
        Ok(())
    }

    pub fn subdivisions(&self) -> Subdivisions {
        self.subdivisions
    }

    pub fn set_subdivisions(&mut self, subdivisions: Subdivisions) {
        self.subdivisions = subdivisions;
    }

    /// Length of one beat in logical seconds (nominal tempo).
    pub fn beat_secs(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Length of one subdivision in logical seconds.
    pub fn subdivision_secs(&self) -> f64 {
        self.beat_secs() / self.subdivisions.count() as f64
    }

    pub fn subdivision_duration(&self) -> Duration {
        Duration::from_secs_f64(self.subdivision_secs())
    }
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            time_signature: TimeSignature::default(),
            subdivisions: Subdivisions::One,
        }
    }
}

/// What the engine does on each beat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Audible click on every beat.
    #[default]
    Tick,
    /// Spoken count ("One", "and", "Two", ...).
    Count,
    /// Spoken letter names of the notes sounding now.
    Letter,
    /// Spoken fixed-do solfège syllables of the notes sounding now.
    Solfege,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Tick, Mode::Count, Mode::Letter, Mode::Solfege];

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Tick => "tick",
            Mode::Count => "count",
            Mode::Letter => "letter",
            Mode::Solfege => "solfege",
        }
    }

    pub fn from_name(name: &str) -> Option<Mode> {
        match name.trim().to_ascii_lowercase().as_str() {
            "tick" | "click" => Some(Mode::Tick),
            "count" => Some(Mode::Count),
            "letter" | "letters" => Some(Mode::Letter),
            "solfege" | "solfège" => Some(Mode::Solfege),
            _ => None,
        }
    }

    /// Note-name modes have to catch note boundaries between beats.
    pub fn tracks_notes(&self) -> bool {
        matches!(self, Mode::Letter | Mode::Solfege)
    }
}

/// Zero-based position within the measure and within the beat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BeatPosition {
    pub beat_index: u32,
    pub subdivision_index: u32,
}

impl BeatPosition {
    pub fn new(beat_index: u32, subdivision_index: u32) -> Self {
        Self {
            beat_index,
            subdivision_index,
        }
    }

    pub fn is_downbeat(&self) -> bool {
        self.beat_index == 0 && self.subdivision_index == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_bpm() {
        let mut tempo = TempoConfig::default();
        assert_eq!(tempo.set_bpm(0.0), Err(EngineError::InvalidTempo(0.0)));
        assert!(tempo.set_bpm(-30.0).is_err());
        assert!(tempo.set_bpm(f64::NAN).is_err());
        assert!(tempo.set_bpm(f64::INFINITY).is_err());
        assert_eq!(tempo.set_bpm(1e300), Err(EngineError::InvalidTempo(1e300)));
        assert_eq!(tempo.bpm(), 120.0);
        assert!(tempo.set_bpm(MAX_BPM).is_ok());
    }

    #[test]
    fn rate_bounds() {
        assert_eq!(validate_rate(1.0), Ok(1.0));
        assert_eq!(validate_rate(MIN_RATE), Ok(MIN_RATE));
        assert_eq!(validate_rate(MAX_RATE), Ok(MAX_RATE));
        assert_eq!(validate_rate(0.0), Err(EngineError::InvalidRate(0.0)));
        assert_eq!(validate_rate(1e300), Err(EngineError::InvalidRate(1e300)));
        assert!(validate_rate(f64::NAN).is_err());
    }

    #[test]
    fn deserializing_validates_tempo() {
        let ok: TempoConfig = toml::from_str(
            "bpm = 90.0\nsubdivisions = \"Two\"\n[time_signature]\nbeats_per_measure = 3\nbeat_unit = 4\n",
        )
        .unwrap();
        assert_eq!(ok.bpm(), 90.0);
        assert_eq!(ok.subdivisions(), Subdivisions::Two);

        let negative = "bpm = -5.0\nsubdivisions = \"One\"\n[time_signature]\nbeats_per_measure = 4\nbeat_unit = 4\n";
        assert!(toml::from_str::<TempoConfig>(negative).is_err());
        let empty_bar = "bpm = 60.0\nsubdivisions = \"One\"\n[time_signature]\nbeats_per_measure = 0\nbeat_unit = 4\n";
        assert!(toml::from_str::<TempoConfig>(empty_bar).is_err());
    }

    #[test]
    fn rejects_empty_measure() {
        assert!(TimeSignature::new(0, 4).is_err());
        assert!(TimeSignature::new(3, 0).is_err());
        assert_eq!(TimeSignature::new(6, 8).unwrap().to_string(), "6/8");
    }

    #[test]
    fn subdivision_duration_follows_tempo() {
        let tempo = TempoConfig::new(120.0, TimeSignature::four_four(), Subdivisions::Four).unwrap();
        assert!((tempo.beat_secs() - 0.5).abs() < 1e-12);
        assert!((tempo.subdivision_secs() - 0.125).abs() < 1e-12);
        assert_eq!(tempo.subdivision_duration(), Duration::from_millis(125));
    }

    #[test]
    fn subdivision_counts() {
        assert_eq!(Subdivisions::from_count(2), Some(Subdivisions::Two));
        assert_eq!(Subdivisions::from_count(3), None);
        assert_eq!(Subdivisions::from_count(0), None);
        for subdivisions in Subdivisions::ALL {
            assert_eq!(Subdivisions::from_count(subdivisions.count()), Some(subdivisions));
        }
    }

    #[test]
    fn mode_names_parse() {
        for mode in Mode::ALL {
            assert_eq!(Mode::from_name(mode.name()), Some(mode));
        }
        assert_eq!(Mode::from_name("Solfège"), Some(Mode::Solfege));
        assert_eq!(Mode::from_name("polka"), None);
        assert!(Mode::Letter.tracks_notes());
        assert!(!Mode::Count.tracks_notes());
    }
}
