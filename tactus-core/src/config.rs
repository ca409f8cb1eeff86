use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tactus_types::{validate_rate, Mode, Subdivisions, TempoConfig, TimeSignature};

use crate::engine::EngineSettings;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "could not read config: {}", e),
            ConfigError::Parse(e) => write!(f, "malformed config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    defaults: DefaultsConfig,
    #[serde(default)]
    timing: TimingConfig,
}

#[derive(Deserialize, Default)]
struct DefaultsConfig {
    bpm: Option<f64>,
    time_signature: Option<[u32; 2]>,
    subdivisions: Option<u32>,
    mode: Option<String>,
    rate: Option<f64>,
}

#[derive(Deserialize, Default)]
struct TimingConfig {
    fine_interval_ms: Option<u64>,
    note_tolerance_ms: Option<u64>,
    speech_debounce_ms: Option<u64>,
    trailing_buffer_ms: Option<u64>,
}

/// Musical starting state for a new session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackDefaults {
    pub tempo: TempoConfig,
    pub mode: Mode,
    pub rate: f64,
}

impl Default for PlaybackDefaults {
    fn default() -> Self {
        Self {
            tempo: TempoConfig::default(),
            mode: Mode::default(),
            rate: 1.0,
        }
    }
}

pub struct Config {
    defaults: DefaultsConfig,
    timing: TimingConfig,
}

impl Config {
    /// Embedded defaults overlaid with the user's config file, if any.
    /// Problems with the user file are logged and the file is ignored.
    pub fn load() -> Self {
        let mut config = Self::embedded();
        if let Some(path) = user_config_path() {
            if path.exists() {
                match read_file(&path) {
                    Ok(user) => config.merge(user),
                    Err(e) => {
                        log::warn!(target: "config", "ignoring config {}: {}", path.display(), e)
                    }
                }
            }
        }
        config
    }

    /// Embedded defaults overlaid with the file at `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::embedded();
        config.merge(read_file(path)?);
        Ok(config)
    }

    /// Embedded defaults overlaid with `contents`.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let mut config = Self::embedded();
        config.merge(toml::from_str(contents)?);
        Ok(config)
    }

    fn embedded() -> Self {
        let base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            log::error!(target: "config", "embedded config.toml is invalid: {}", e);
            ConfigFile::default()
        });
        Config {
            defaults: base.defaults,
            timing: base.timing,
        }
    }

    fn merge(&mut self, user: ConfigFile) {
        merge_defaults(&mut self.defaults, user.defaults);
        merge_timing(&mut self.timing, user.timing);
    }

    pub fn defaults(&self) -> PlaybackDefaults {
        let fallback = PlaybackDefaults::default();

        let mut tempo = fallback.tempo;
        if let Some(bpm) = self.defaults.bpm {
            if tempo.set_bpm(bpm).is_err() {
                log::warn!(target: "config", "invalid bpm {}, using {}", bpm, fallback.tempo.bpm());
            }
        }
        if let Some([beats, unit]) = self.defaults.time_signature {
            let parsed = TimeSignature::new(beats, unit).and_then(|ts| tempo.set_time_signature(ts));
            if parsed.is_err() {
                log::warn!(target: "config", "invalid time signature {}/{}", beats, unit);
            }
        }
        if let Some(count) = self.defaults.subdivisions {
            match Subdivisions::from_count(count) {
                Some(s) => tempo.set_subdivisions(s),
                None => log::warn!(target: "config", "unsupported subdivisions {}", count),
            }
        }

        let mode = self
            .defaults
            .mode
            .as_deref()
            .and_then(Mode::from_name)
            .unwrap_or(fallback.mode);
        let rate = self
            .defaults
            .rate
            .filter(|r| validate_rate(*r).is_ok())
            .unwrap_or(fallback.rate);

        PlaybackDefaults { tempo, mode, rate }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let fallback = EngineSettings::default();
        let ms = |value: Option<u64>, fallback: Duration, min: u64, max: u64| {
            value
                .map(|v| Duration::from_millis(v.clamp(min, max)))
                .unwrap_or(fallback)
        };
        EngineSettings {
            fine_interval: ms(self.timing.fine_interval_ms, fallback.fine_interval, 1, 1_000),
            note_tolerance: ms(self.timing.note_tolerance_ms, fallback.note_tolerance, 1, 5_000),
            speech_debounce: ms(self.timing.speech_debounce_ms, fallback.speech_debounce, 0, 10_000),
            trailing_buffer: ms(self.timing.trailing_buffer_ms, fallback.trailing_buffer, 0, 600_000),
        }
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tactus").join("config.toml"))
}

fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

fn merge_defaults(base: &mut DefaultsConfig, user: DefaultsConfig) {
    if user.bpm.is_some() {
        base.bpm = user.bpm;
    }
    if user.time_signature.is_some() {
        base.time_signature = user.time_signature;
    }
    if user.subdivisions.is_some() {
        base.subdivisions = user.subdivisions;
    }
    if user.mode.is_some() {
        base.mode = user.mode;
    }
    if user.rate.is_some() {
        base.rate = user.rate;
    }
}

fn merge_timing(base: &mut TimingConfig, user: TimingConfig) {
    if user.fine_interval_ms.is_some() {
        base.fine_interval_ms = user.fine_interval_ms;
    }
    if user.note_tolerance_ms.is_some() {
        base.note_tolerance_ms = user.note_tolerance_ms;
    }
    if user.speech_debounce_ms.is_some() {
        base.speech_debounce_ms = user.speech_debounce_ms;
    }
    if user.trailing_buffer_ms.is_some() {
        base.trailing_buffer_ms = user.trailing_buffer_ms;
    }
}
