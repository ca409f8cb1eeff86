use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tactus_types::{Mode, TimeSignature};

pub const USAGE: &str = "\
usage: tactus [options]

  --bpm N                 tempo in beats per minute
  --mode MODE             tick | count | letter | solfege
  --subdivisions N        1, 2 or 4 per beat
  --time-signature N/D    e.g. 3/4
  --rate R                playback-rate multiplier
  --seconds S             how long to run (default 8)
  --transport-at S        simulate an external player starting at S seconds
  --config PATH           read settings from PATH instead of the user config
  -v, --verbose           debug logging
  -h, --help              show this help";

const DEFAULT_SECONDS: f64 = 8.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CliOptions {
    pub bpm: Option<f64>,
    pub mode: Option<Mode>,
    pub subdivisions: Option<u32>,
    pub time_signature: Option<TimeSignature>,
    pub rate: Option<f64>,
    pub run_for: Duration,
    pub transport_at: Option<Duration>,
    pub config_path: Option<PathBuf>,
    pub verbose: bool,
    pub help: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            bpm: None,
            mode: None,
            subdivisions: None,
            time_signature: None,
            rate: None,
            run_for: Duration::from_secs_f64(DEFAULT_SECONDS),
            transport_at: None,
            config_path: None,
            verbose: false,
            help: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgError {
    MissingValue(String),
    InvalidValue { flag: String, value: String },
    Unknown(String),
}

impl fmt::Display for ArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgError::MissingValue(flag) => write!(f, "{} needs a value", flag),
            ArgError::InvalidValue { flag, value } => write!(f, "invalid value for {}: {}", flag, value),
            ArgError::Unknown(arg) => write!(f, "unknown argument: {}", arg),
        }
    }
}

impl std::error::Error for ArgError {}

impl CliOptions {
    /// Parse arguments, program name excluded.
    pub fn parse(args: &[String]) -> Result<Self, ArgError> {
        let mut options = CliOptions::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let flag = arg.as_str();
            match flag {
                "-v" | "--verbose" => options.verbose = true,
                "-h" | "--help" => options.help = true,
                "--bpm" => options.bpm = Some(parse_number(flag, iter.next())?),
                "--rate" => options.rate = Some(parse_number(flag, iter.next())?),
                "--subdivisions" => {
                    let value = value_of(flag, iter.next())?;
                    options.subdivisions = Some(value.parse().map_err(|_| invalid(flag, value))?);
                }
                "--mode" => {
                    let value = value_of(flag, iter.next())?;
                    options.mode = Some(Mode::from_name(value).ok_or_else(|| invalid(flag, value))?);
                }
                "--time-signature" => {
                    let value = value_of(flag, iter.next())?;
                    options.time_signature = Some(parse_time_signature(value).ok_or_else(|| invalid(flag, value))?);
                }
                "--seconds" => options.run_for = parse_seconds(flag, iter.next())?,
                "--transport-at" => options.transport_at = Some(parse_seconds(flag, iter.next())?),
                "--config" => {
                    options.config_path = Some(PathBuf::from(value_of(flag, iter.next())?));
                }
                other => return Err(ArgError::Unknown(other.to_string())),
            }
        }
        Ok(options)
    }
}

fn value_of<'a>(flag: &str, value: Option<&'a String>) -> Result<&'a str, ArgError> {
    value
        .map(String::as_str)
        .ok_or_else(|| ArgError::MissingValue(flag.to_string()))
}

fn invalid(flag: &str, value: &str) -> ArgError {
    ArgError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
    }
}

fn parse_number(flag: &str, value: Option<&String>) -> Result<f64, ArgError> {
    let value = value_of(flag, value)?;
    value.parse().map_err(|_| invalid(flag, value))
}

fn parse_seconds(flag: &str, value: Option<&String>) -> Result<Duration, ArgError> {
    let secs = parse_number(flag, value)?;
    Duration::try_from_secs_f64(secs).map_err(|_| invalid(flag, &secs.to_string()))
}

fn parse_time_signature(value: &str) -> Option<TimeSignature> {
    let (beats, unit) = value.split_once('/')?;
    TimeSignature::new(beats.trim().parse().ok()?, unit.trim().parse().ok()?).ok()
}
