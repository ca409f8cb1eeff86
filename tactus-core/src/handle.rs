//! EngineHandle: owner-side interface to the engine thread.
//!
//! Owns the command/feedback channels. The engine itself and its timer inbox
//! live on the engine thread.

use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender as CrossbeamSender;
use tactus_types::{Cue, EngineError, EngineStatus, Mode, NoteEvent, TimeSignature};

use crate::clock::Clock;
use crate::commands::{EngineCmd, EngineFeedback};
use crate::effects::ChannelSink;
use crate::engine::{Engine, EngineSettings};
use crate::engine_thread::EngineThread;
use crate::transport::TransportSource;

const STATUS_TIMEOUT: Duration = Duration::from_secs(1);

/// Engine-owned read state, mirrored from feedback for display.
#[derive(Debug, Clone, Default)]
pub struct EngineReadState {
    pub status: EngineStatus,
    pub last_effect_error: Option<String>,
}

pub struct EngineHandle {
    cmd_tx: CrossbeamSender<EngineCmd>,
    feedback_rx: Receiver<EngineFeedback>,
    read_state: EngineReadState,
    join_handle: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Move `engine` onto a new thread and return a handle to it.
    pub fn spawn<C: Clock + 'static>(engine: Engine<C>) -> std::io::Result<Self> {
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let (feedback_tx, feedback_rx) = mpsc::channel();

        let join_handle = thread::Builder::new()
            .name("tactus-engine".to_string())
            .spawn(move || {
                EngineThread::new(engine, cmd_rx, feedback_tx).run();
            })?;

        Ok(Self {
            cmd_tx,
            feedback_rx,
            read_state: EngineReadState::default(),
            join_handle: Some(join_handle),
        })
    }

    /// Spawn an engine whose cues are delivered on the returned receiver.
    pub fn spawn_with_cues<C: Clock + 'static>(
        clock: C,
        settings: EngineSettings,
    ) -> std::io::Result<(Self, crossbeam_channel::Receiver<Cue>)> {
        let (cue_tx, cue_rx) = crossbeam_channel::unbounded();
        let engine = Engine::with_settings(clock, ChannelSink::new(cue_tx), settings);
        Ok((Self::spawn(engine)?, cue_rx))
    }

    pub fn send_cmd(&self, cmd: EngineCmd) -> Result<(), EngineError> {
        self.cmd_tx.send(cmd).map_err(|_| EngineError::Disconnected)
    }

    /// Fire-and-forget: send a command and log if the engine thread is gone.
    fn send(&self, cmd: EngineCmd) {
        if let Err(e) = self.send_cmd(cmd) {
            log::warn!(target: "engine", "command dropped: {}", e);
        }
    }

    /// Send a command carrying a reply channel and wait for the answer.
    fn request<T>(&self, make: impl FnOnce(mpsc::Sender<T>) -> EngineCmd) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.send_cmd(make(reply_tx))?;
        reply_rx.recv().map_err(|_| EngineError::Disconnected)
    }

    pub fn drain_feedback(&mut self) -> Vec<EngineFeedback> {
        let mut out = Vec::new();
        while let Ok(msg) = self.feedback_rx.try_recv() {
            self.apply_feedback(&msg);
            out.push(msg);
        }
        out
    }

    fn apply_feedback(&mut self, feedback: &EngineFeedback) {
        match feedback {
            EngineFeedback::Status(status) => {
                self.read_state.status = status.clone();
            }
            EngineFeedback::EffectFailed(message) => {
                self.read_state.last_effect_error = Some(message.clone());
            }
        }
    }

    /// Last state seen through [`EngineHandle::drain_feedback`].
    pub fn read_state(&self) -> &EngineReadState {
        &self.read_state
    }

    /// Ask the engine thread for its current status.
    pub fn status(&self) -> Result<EngineStatus, EngineError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.send_cmd(EngineCmd::QueryStatus { reply: reply_tx })?;
        reply_rx
            .recv_timeout(STATUS_TIMEOUT)
            .map_err(|_| EngineError::Disconnected)
    }

    pub fn enable(&self) {
        self.send(EngineCmd::Enable);
    }

    pub fn disable(&self) {
        self.send(EngineCmd::Disable);
    }

    pub fn start(&self) -> Result<(), EngineError> {
        self.request(|reply| EngineCmd::Start { reply })?
    }

    pub fn stop(&self) {
        self.send(EngineCmd::Stop);
    }

    pub fn seek(&self, to: Duration) {
        self.send(EngineCmd::Seek { to });
    }

    pub fn set_bpm(&self, bpm: f64) -> Result<(), EngineError> {
        self.request(|reply| EngineCmd::SetBpm { bpm, reply })?
    }

    pub fn set_rate_multiplier(&self, rate: f64) -> Result<(), EngineError> {
        self.request(|reply| EngineCmd::SetRateMultiplier { rate, reply })?
    }

    pub fn set_time_signature(&self, time_signature: TimeSignature) -> Result<(), EngineError> {
        self.request(|reply| EngineCmd::SetTimeSignature {
            time_signature,
            reply,
        })?
    }

    pub fn set_subdivisions(&self, count: u32) -> Result<(), EngineError> {
        self.request(|reply| EngineCmd::SetSubdivisions { count, reply })?
    }

    pub fn set_mode(&self, mode: Mode) {
        self.send(EngineCmd::SetMode { mode });
    }

    pub fn set_note_events(&self, events: Vec<NoteEvent>) {
        self.send(EngineCmd::SetNoteEvents { events });
    }

    pub fn attach_transport(&self, source: impl TransportSource + 'static) {
        self.send(EngineCmd::AttachTransport {
            source: Box::new(source),
        });
    }

    pub fn detach_transport(&self) {
        self.send(EngineCmd::DetachTransport);
    }

    /// Report a failure the effect collaborator noticed after accepting a cue.
    pub fn report_effect_failure(&self, message: impl Into<String>) {
        self.send(EngineCmd::ReportEffectFailure {
            message: message.into(),
        });
    }

    /// Stop the engine thread and wait for it to exit.
    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        let _ = self.send_cmd(EngineCmd::Shutdown);
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::effects::RecordingSink;

    fn spawn_manual() -> (EngineHandle, ManualClock, RecordingSink) {
        let clock = ManualClock::new();
        let sink = RecordingSink::new();
        let handle = EngineHandle::spawn(Engine::new(clock.clone(), sink.clone())).unwrap();
        (handle, clock, sink)
    }

    #[test]
    fn validated_calls_return_errors() {
        let (handle, _clock, _sink) = spawn_manual();
        assert_eq!(handle.start(), Err(EngineError::Disabled));
        assert_eq!(handle.set_bpm(0.0), Err(EngineError::InvalidTempo(0.0)));
        assert_eq!(handle.set_subdivisions(3), Err(EngineError::UnsupportedSubdivisions(3)));
        handle.enable();
        assert_eq!(handle.start(), Ok(()));
        assert!(handle.status().unwrap().running);
    }

    #[test]
    fn feedback_mirrors_status() {
        let (mut handle, _clock, sink) = spawn_manual();
        handle.enable();
        handle.set_mode(Mode::Count);
        handle.start().unwrap();
        // Status is published after each command, so one more round trip
        // guarantees the start feedback is queued.
        handle.status().unwrap();
        let feedback = handle.drain_feedback();
        assert!(feedback.iter().any(|f| matches!(f, EngineFeedback::Status(s) if s.running)));
        assert!(handle.read_state().status.running);
        assert_eq!(handle.read_state().status.mode, Mode::Count);
        assert_eq!(sink.spoken(), vec!["One".to_string()]);
    }

    #[test]
    fn effect_failures_are_reported() {
        let (mut handle, _clock, sink) = spawn_manual();
        sink.set_failing(true);
        handle.enable();
        handle.start().unwrap();
        handle.report_effect_failure("speech engine busy");
        let status = handle.status().unwrap();
        assert_eq!(status.effect_failures, 2);

        handle.drain_feedback();
        assert!(handle.read_state().last_effect_error.is_some());
    }

    #[test]
    fn timer_fires_reach_the_engine_thread() {
        let (handle, clock, sink) = spawn_manual();
        handle.enable();
        handle.start().unwrap();
        clock.advance(Duration::from_millis(1_100));

        // Fires are handled asynchronously; poll until both have landed.
        let mut beat = 0;
        for _ in 0..200 {
            beat = handle.status().unwrap().position.beat_index;
            if beat == 2 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(beat, 2);
        assert_eq!(sink.ticks(), vec![true, false, false]);
    }

    #[test]
    fn commands_after_shutdown_fail() {
        let (handle, _clock, _sink) = spawn_manual();
        let cmd_tx = handle.cmd_tx.clone();
        handle.shutdown();
        assert!(cmd_tx.send(EngineCmd::Stop).is_err());
    }
}
