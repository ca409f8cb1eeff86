use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ClockSnapshot;

/// Side-effect request. The engine only signals intent; sound and speech are
/// produced by the audio collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Play the metronome click. `accent` marks the downbeat.
    PlayTick { accent: bool },
    /// Speak `text`, interrupting any utterance still in flight.
    Speak { text: String },
    /// Silence any utterance still in flight.
    CancelSpeech,
}

impl Effect {
    pub fn speak(text: impl Into<String>) -> Self {
        Effect::Speak { text: text.into() }
    }

    pub fn spoken_text(&self) -> Option<&str> {
        match self {
            Effect::Speak { text } => Some(text),
            _ => None,
        }
    }
}

/// An effect together with the instant and piece position it was emitted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    pub at: ClockSnapshot,
    pub logical_time: Duration,
    pub effect: Effect,
}
