use std::sync::mpsc::Sender;

use crossbeam_channel::Receiver;
use tactus_types::EngineStatus;

use crate::clock::Clock;
use crate::commands::{EngineCmd, EngineFeedback};
use crate::engine::Engine;

/// Owns the engine on its dedicated thread.
pub(crate) struct EngineThread<C: Clock> {
    engine: Engine<C>,
    cmd_rx: Receiver<EngineCmd>,
    feedback_tx: Sender<EngineFeedback>,
    last_status: Option<EngineStatus>,
}

impl<C: Clock> EngineThread<C> {
    pub(crate) fn new(
        engine: Engine<C>,
        cmd_rx: Receiver<EngineCmd>,
        feedback_tx: Sender<EngineFeedback>,
    ) -> Self {
        Self {
            engine,
            cmd_rx,
            feedback_tx,
            last_status: None,
        }
    }

    pub(crate) fn run(mut self) {
        let timer_rx = self.engine.timer_inbox().clone();
        self.publish();

        loop {
            crossbeam_channel::select! {
                recv(self.cmd_rx) -> result => {
                    match result {
                        Ok(cmd) => {
                            if self.handle_cmd(cmd) {
                                break;
                            }
                        }
                        Err(_) => break, // Handle dropped
                    }
                }
                recv(timer_rx) -> result => {
                    if let Ok(fire) = result {
                        self.engine.on_timer(fire);
                    }
                }
            }
            self.publish();
        }

        self.engine.stop();
        log::debug!(target: "engine", "engine thread exiting");
    }

    /// Returns true when the thread should exit.
    fn handle_cmd(&mut self, cmd: EngineCmd) -> bool {
        log::trace!(target: "engine", "command {}", cmd.name());
        match cmd {
            EngineCmd::Enable => self.engine.enable(),
            EngineCmd::Disable => self.engine.disable(),
            EngineCmd::Start { reply } => {
                let _ = reply.send(self.engine.start());
            }
            EngineCmd::Stop => self.engine.stop(),
            EngineCmd::Seek { to } => self.engine.seek(to),
            EngineCmd::SetBpm { bpm, reply } => {
                let _ = reply.send(self.engine.set_bpm(bpm));
            }
            EngineCmd::SetRateMultiplier { rate, reply } => {
                let _ = reply.send(self.engine.set_rate_multiplier(rate));
            }
            EngineCmd::SetTimeSignature {
                time_signature,
                reply,
            } => {
                let _ = reply.send(self.engine.set_time_signature(time_signature));
            }
            EngineCmd::SetSubdivisions { count, reply } => {
                let _ = reply.send(self.engine.set_subdivisions(count));
            }
            EngineCmd::SetMode { mode } => self.engine.set_mode(mode),
            EngineCmd::SetNoteEvents { events } => self.engine.set_note_events(events),
            EngineCmd::AttachTransport { source } => self.engine.attach_transport(source),
            EngineCmd::DetachTransport => self.engine.detach_transport(),
            EngineCmd::ReportEffectFailure { message } => {
                self.engine.report_effect_failure(&message);
            }
            EngineCmd::QueryStatus { reply } => {
                let _ = reply.send(self.engine.status());
            }
            EngineCmd::Shutdown => return true,
        }
        false
    }

    /// Forward sink failures and any change in observable state.
    fn publish(&mut self) {
        for message in self.engine.take_effect_failures() {
            let _ = self.feedback_tx.send(EngineFeedback::EffectFailed(message));
        }
        let status = self.engine.status();
        if self.last_status.as_ref() != Some(&status) {
            let _ = self.feedback_tx.send(EngineFeedback::Status(status.clone()));
            self.last_status = Some(status);
        }
    }
}
