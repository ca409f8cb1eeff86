//! Tactus engine: keeps a metronome in step with a score's playback.
//!
//! [`Engine`] is the synchronous state machine. [`EngineHandle`] runs it on a
//! dedicated thread fed by a command channel and the clock's timer inbox.

pub mod beat_indexer;
pub mod clock;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod effects;
pub mod engine;
mod engine_thread;
pub mod handle;
pub mod scheduler;
pub mod time_base;
pub mod transport;
pub mod transport_cell;

pub use clock::{Clock, ManualClock, SystemClock, TimerFire, TimerHandle};
pub use commands::{EngineCmd, EngineFeedback};
pub use config::{Config, ConfigError, PlaybackDefaults};
pub use effects::{ChannelSink, EffectError, EffectSink, RecordingSink};
pub use engine::{Engine, EngineSettings};
pub use handle::{EngineHandle, EngineReadState};
pub use transport::{TransportBridge, TransportSource};
pub use transport_cell::{transport_cell, TransportReader, TransportWriter};

pub use tactus_types::*;
