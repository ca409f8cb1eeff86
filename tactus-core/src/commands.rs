//! Command and feedback types for the engine thread.
//!
//! `EngineHandle` serializes every public call into an `EngineCmd`; the
//! engine thread answers validated calls through a reply channel and
//! publishes state changes as `EngineFeedback`.

use std::sync::mpsc::Sender;
use std::time::Duration;

use tactus_types::{EngineError, EngineStatus, Mode, NoteEvent, TimeSignature};

use crate::transport::TransportSource;

/// Commands sent from the owning thread to the engine thread.
pub enum EngineCmd {
    // ── Lifecycle ─────────────────────────────────────────────────
    Enable,
    Disable,
    Start {
        reply: Sender<Result<(), EngineError>>,
    },
    Stop,
    Seek {
        to: Duration,
    },

    // ── Settings ──────────────────────────────────────────────────
    SetBpm {
        bpm: f64,
        reply: Sender<Result<(), EngineError>>,
    },
    SetRateMultiplier {
        rate: f64,
        reply: Sender<Result<(), EngineError>>,
    },
    SetTimeSignature {
        time_signature: TimeSignature,
        reply: Sender<Result<(), EngineError>>,
    },
    SetSubdivisions {
        count: u32,
        reply: Sender<Result<(), EngineError>>,
    },
    SetMode {
        mode: Mode,
    },

    // ── Score and transport ───────────────────────────────────────
    SetNoteEvents {
        events: Vec<NoteEvent>,
    },
    AttachTransport {
        source: Box<dyn TransportSource>,
    },
    DetachTransport,

    // ── Effects ───────────────────────────────────────────────────
    ReportEffectFailure {
        message: String,
    },

    // ── Queries ───────────────────────────────────────────────────
    QueryStatus {
        reply: Sender<EngineStatus>,
    },
    Shutdown,
}

impl EngineCmd {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            EngineCmd::Enable => "enable",
            EngineCmd::Disable => "disable",
            EngineCmd::Start { .. } => "start",
            EngineCmd::Stop => "stop",
            EngineCmd::Seek { .. } => "seek",
            EngineCmd::SetBpm { .. } => "set_bpm",
            EngineCmd::SetRateMultiplier { .. } => "set_rate_multiplier",
            EngineCmd::SetTimeSignature { .. } => "set_time_signature",
            EngineCmd::SetSubdivisions { .. } => "set_subdivisions",
            EngineCmd::SetMode { .. } => "set_mode",
            EngineCmd::SetNoteEvents { .. } => "set_note_events",
            EngineCmd::AttachTransport { .. } => "attach_transport",
            EngineCmd::DetachTransport => "detach_transport",
            EngineCmd::ReportEffectFailure { .. } => "report_effect_failure",
            EngineCmd::QueryStatus { .. } => "query_status",
            EngineCmd::Shutdown => "shutdown",
        }
    }
}

/// Updates sent from the engine thread back to the owner.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineFeedback {
    /// Observable state after a command or fire changed it.
    Status(EngineStatus),
    /// The effect sink rejected a cue.
    EffectFailed(String),
}
