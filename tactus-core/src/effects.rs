//! Where cues go once the engine has decided on them.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::Sender;
use tactus_types::{Cue, Effect};

#[derive(Debug, Clone, PartialEq)]
pub struct EffectError(pub String);

impl fmt::Display for EffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for EffectError {}

impl From<String> for EffectError {
    fn from(s: String) -> Self {
        EffectError(s)
    }
}

/// Receiver of cues. `emit` must not block: the engine calls it on the fire
/// path and never waits for the effect to complete.
pub trait EffectSink: Send {
    fn emit(&mut self, cue: Cue) -> Result<(), EffectError>;
}

/// Forwards cues over a channel to the audio/speech collaborator.
pub struct ChannelSink {
    tx: Sender<Cue>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Cue>) -> Self {
        Self { tx }
    }
}

impl EffectSink for ChannelSink {
    fn emit(&mut self, cue: Cue) -> Result<(), EffectError> {
        self.tx
            .try_send(cue)
            .map_err(|e| EffectError(format!("cue dropped: {}", e)))
    }
}

#[derive(Default)]
struct Recorded {
    cues: Vec<Cue>,
    failing: bool,
}

/// Test sink that records every cue. Clones share the same record, so a test
/// keeps one clone while the engine owns another.
#[derive(Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// While set, every emit fails (the cue is still recorded).
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.lock().cues.clone()
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.lock().cues.iter().map(|c| c.effect.clone()).collect()
    }

    /// Spoken texts in order.
    pub fn spoken(&self) -> Vec<String> {
        self.lock()
            .cues
            .iter()
            .filter_map(|c| c.effect.spoken_text().map(str::to_string))
            .collect()
    }

    /// Accent flags of every tick, in order.
    pub fn ticks(&self) -> Vec<bool> {
        self.lock()
            .cues
            .iter()
            .filter_map(|c| match c.effect {
                Effect::PlayTick { accent } => Some(accent),
                _ => None,
            })
            .collect()
    }

    pub fn count<F: Fn(&Cue) -> bool>(&self, f: F) -> usize {
        self.lock().cues.iter().filter(|c| f(c)).count()
    }

    pub fn len(&self) -> usize {
        self.lock().cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().cues.is_empty()
    }

    pub fn clear(&self) {
        self.lock().cues.clear();
    }
}

impl EffectSink for RecordingSink {
    fn emit(&mut self, cue: Cue) -> Result<(), EffectError> {
        let mut recorded = self.lock();
        recorded.cues.push(cue);
        if recorded.failing {
            return Err(EffectError("recording sink set to fail".to_string()));
        }
        Ok(())
    }
}
