//! The synchronous engine state machine.
//!
//! `Engine` owns every piece of mutable playback state and is driven from a
//! single context: public calls and timer fires are both handled through
//! `&mut self`. The threaded runtime in [`crate::handle`] wraps it; tests
//! drive it directly with a [`crate::clock::ManualClock`].

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tactus_types::{
    first_channel, BeatPosition, Cue, Effect, EngineError, EngineStatus, Mode, NoteEvent,
    Subdivisions, TempoConfig, TimeSignature,
};

use crate::beat_indexer::{next_boundary, position_of, total_subdivisions};
use crate::clock::{Clock, ClockSnapshot, TimerFire};
use crate::config::PlaybackDefaults;
use crate::dispatcher::{FireContext, ModeDispatcher, DEFAULT_NOTE_TOLERANCE, DEFAULT_SPEECH_DEBOUNCE};
use crate::effects::EffectSink;
use crate::scheduler::{Scheduler, DEFAULT_FINE_INTERVAL};
use crate::time_base::TimeBase;
use crate::transport::{TransportBridge, TransportSource, Transition};

pub const DEFAULT_TRAILING_BUFFER: Duration = Duration::from_secs(2);

/// Timing knobs that are not part of the musical state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Timer interval while following the transport or speaking notes.
    pub fine_interval: Duration,
    /// How close a note must be to the current position to be spoken.
    pub note_tolerance: Duration,
    /// Minimum wall-clock gap between two spoken note names.
    pub speech_debounce: Duration,
    /// Added after the last note to find where auto-stop happens.
    pub trailing_buffer: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            fine_interval: DEFAULT_FINE_INTERVAL,
            note_tolerance: DEFAULT_NOTE_TOLERANCE,
            speech_debounce: DEFAULT_SPEECH_DEBOUNCE,
            trailing_buffer: DEFAULT_TRAILING_BUFFER,
        }
    }
}

pub struct Engine<C: Clock> {
    clock: C,
    sink: Box<dyn EffectSink>,
    transport: Option<Box<dyn TransportSource>>,
    timer_tx: Sender<TimerFire>,
    timer_rx: Receiver<TimerFire>,
    settings: EngineSettings,

    enabled: bool,
    running: bool,
    mode: Mode,
    tempo: TempoConfig,
    time_base: TimeBase,
    bridge: TransportBridge,
    scheduler: Scheduler,
    dispatcher: ModeDispatcher,

    position: BeatPosition,
    logical_time: Duration,

    events: Arc<[NoteEvent]>,
    total_duration: Duration,
    first_channel: Option<u8>,

    effect_failures: u64,
    unreported_failures: Vec<String>,
}

impl<C: Clock> Engine<C> {
    pub fn new(clock: C, sink: impl EffectSink + 'static) -> Self {
        Self::with_settings(clock, sink, EngineSettings::default())
    }

    pub fn with_settings(clock: C, sink: impl EffectSink + 'static, settings: EngineSettings) -> Self {
        let (timer_tx, timer_rx) = crossbeam_channel::unbounded();
        Self {
            clock,
            sink: Box::new(sink),
            transport: None,
            timer_tx,
            timer_rx,
            settings,
            enabled: false,
            running: false,
            mode: Mode::default(),
            tempo: TempoConfig::default(),
            time_base: TimeBase::new(),
            bridge: TransportBridge::new(),
            scheduler: Scheduler::new(settings.fine_interval),
            dispatcher: ModeDispatcher::new(settings.note_tolerance, settings.speech_debounce),
            position: BeatPosition::default(),
            logical_time: Duration::ZERO,
            events: Arc::from(Vec::new()),
            total_duration: Duration::ZERO,
            first_channel: None,
            effect_failures: 0,
            unreported_failures: Vec::new(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    /// Inbox the clock posts fires into. The runtime thread selects on it.
    pub fn timer_inbox(&self) -> &Receiver<TimerFire> {
        &self.timer_rx
    }

    /// Apply tempo, mode and rate from configuration. Every value is
    /// validated the same way as the individual setters.
    pub fn apply_defaults(&mut self, defaults: &PlaybackDefaults) -> Result<(), EngineError> {
        self.set_time_signature(defaults.tempo.time_signature())?;
        self.set_bpm(defaults.tempo.bpm())?;
        self.set_subdivisions(defaults.tempo.subdivisions().count())?;
        self.set_rate_multiplier(defaults.rate)?;
        self.set_mode(defaults.mode);
        Ok(())
    }

    // ── Transport ─────────────────────────────────────────────────

    pub fn attach_transport(&mut self, source: Box<dyn TransportSource>) {
        log::info!(target: "transport", "transport attached");
        self.transport = Some(source);
    }

    /// The next fire sees no transport and falls back to self-clocking.
    pub fn detach_transport(&mut self) {
        if self.transport.take().is_some() {
            log::info!(target: "transport", "transport detached");
        }
    }

    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    // ── Timer fires ───────────────────────────────────────────────

    /// Handle every fire waiting in the inbox, including catch-up fires
    /// posted while handling earlier ones. Returns the number handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(fire) = self.timer_rx.try_recv() {
            if self.on_timer(fire) {
                handled += 1;
            }
        }
        handled
    }

    /// Handle one fire. Fires from a cancelled timer, or arriving after
    /// stop, are dropped.
    pub fn on_timer(&mut self, fire: TimerFire) -> bool {
        if !self.running || !self.scheduler.is_current(fire.handle) {
            log::trace!(target: "scheduler", "stale fire from timer {}", fire.handle.id());
            return false;
        }
        if self.fire(fire.at) && self.running {
            self.rearm(fire.at);
        }
        true
    }

    /// One scheduler step at `now`. Returns true when the transport crossed
    /// an edge and the timer must be re-armed.
    fn fire(&mut self, now: ClockSnapshot) -> bool {
        let transition = self.observe_transport(now);

        self.logical_time = match self.bridge.followed_position() {
            Some(position) => position,
            None => self.time_base.logical_time(now),
        };

        if !self.bridge.is_following()
            && self.total_duration > Duration::ZERO
            && self.logical_time >= self.total_duration
        {
            log::info!(
                target: "engine",
                "reached end of content at {:?}, stopping",
                self.logical_time
            );
            self.stop_at(now);
            return false;
        }

        let total = total_subdivisions(self.logical_time, &self.tempo);
        self.position = position_of(total, &self.tempo);

        let ctx = FireContext {
            mode: self.mode,
            subdivisions: self.tempo.subdivisions(),
            position: self.position,
            total_subdivisions: total,
            logical_time: self.logical_time,
            now,
            events: &self.events,
        };
        if let Some(effect) = self.dispatcher.dispatch(&ctx) {
            self.emit(now, effect);
        }

        transition.is_some()
    }

    /// Read the transport once and apply any edge to the time base.
    fn observe_transport(&mut self, now: ClockSnapshot) -> Option<Transition> {
        let snapshot = self.transport.as_mut().and_then(|t| t.snapshot());
        let transition = self.bridge.observe(snapshot)?;
        match transition {
            Transition::Follow { at } => {
                self.time_base.seek(now, at);
            }
            Transition::Release { at } => {
                let frozen = at.unwrap_or(self.logical_time);
                self.time_base.start(now, frozen);
            }
        }
        Some(transition)
    }

    /// Cancel the current timer and arm one matching the current mode,
    /// tempo, rate and sync state.
    fn rearm(&mut self, now: ClockSnapshot) {
        let following = self.bridge.is_following();
        let interval = self
            .scheduler
            .interval_for(self.mode, following, &self.tempo, self.time_base.rate());

        let first = if following || self.mode.tracks_notes() {
            now + interval
        } else {
            let logical = self.time_base.logical_time(now);
            self.time_base
                .wall_time_of(now, next_boundary(logical, &self.tempo))
                .unwrap_or(now + interval)
        };

        self.scheduler
            .arm(&mut self.clock, first, interval, self.timer_tx.clone());
    }

    fn emit(&mut self, now: ClockSnapshot, effect: Effect) {
        let cue = Cue {
            at: now,
            logical_time: self.logical_time,
            effect,
        };
        if let Err(e) = self.sink.emit(cue) {
            self.effect_failures += 1;
            log::warn!(target: "effects", "effect failed: {}", e);
            self.unreported_failures.push(e.to_string());
        }
    }

    /// Recompute logical time and position outside a fire.
    fn refresh_position(&mut self, now: ClockSnapshot) {
        if !self.bridge.is_following() {
            self.logical_time = self.time_base.logical_time(now);
        }
        self.position = position_of(total_subdivisions(self.logical_time, &self.tempo), &self.tempo);
    }

    // ── Lifecycle ─────────────────────────────────────────────────

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        if self.running {
            let now = self.clock.now();
            self.stop_at(now);
        }
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) -> Result<(), EngineError> {
        if !self.enabled {
            return Err(EngineError::Disabled);
        }
        if self.running {
            return Ok(());
        }

        let now = self.clock.now();
        let from = self.time_base.logical_time(now);
        self.time_base.start(now, from);
        self.logical_time = from;
        self.dispatcher.reset();
        self.running = true;
        log::info!(target: "engine", "started at {:?}", from);

        self.fire(now);
        if self.running {
            self.rearm(now);
        }
        Ok(())
    }

    /// Stop and rewind to zero. Safe to call in any state.
    pub fn stop(&mut self) {
        let now = self.clock.now();
        self.stop_at(now);
    }

    fn stop_at(&mut self, now: ClockSnapshot) {
        self.scheduler.cancel(&mut self.clock);
        let was_running = self.running;
        self.running = false;
        self.time_base.reset();
        self.bridge.reset();
        self.dispatcher.reset();
        self.logical_time = Duration::ZERO;
        self.position = BeatPosition::default();
        if was_running {
            log::info!(target: "engine", "stopped");
            self.emit(now, Effect::CancelSpeech);
        }
    }

    /// Jump to `to`. Works in every state; a running timer is re-armed so
    /// its phase follows the new position.
    pub fn seek(&mut self, to: Duration) {
        let now = self.clock.now();
        self.time_base.seek(now, to);
        self.bridge.rebase(to);
        self.dispatcher.reset();
        self.logical_time = to;
        self.position = position_of(total_subdivisions(to, &self.tempo), &self.tempo);
        log::debug!(target: "engine", "seek to {:?}", to);
        if self.running {
            self.rearm(now);
        }
    }

    // ── Settings ──────────────────────────────────────────────────

    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), EngineError> {
        self.tempo.set_bpm(bpm)?;
        self.after_tempo_change(true);
        Ok(())
    }

    pub fn set_rate_multiplier(&mut self, rate: f64) -> Result<(), EngineError> {
        let now = self.clock.now();
        self.time_base.set_rate(now, rate)?;
        if self.running {
            self.rearm(now);
        }
        Ok(())
    }

    pub fn set_time_signature(&mut self, time_signature: TimeSignature) -> Result<(), EngineError> {
        self.tempo.set_time_signature(time_signature)?;
        self.after_tempo_change(false);
        Ok(())
    }

    /// Unsupported counts fall back to one subdivision per beat; the error
    /// still reports the rejected value.
    pub fn set_subdivisions(&mut self, count: u32) -> Result<(), EngineError> {
        let (subdivisions, result) = match Subdivisions::from_count(count) {
            Some(s) => (s, Ok(())),
            None => {
                log::warn!(target: "engine", "unsupported subdivision count {}, using 1", count);
                (Subdivisions::One, Err(EngineError::UnsupportedSubdivisions(count)))
            }
        };
        self.tempo.set_subdivisions(subdivisions);
        self.after_tempo_change(true);
        result
    }

    /// `rescaled` is set when the subdivision grid itself moved (bpm or
    /// subdivision count), so earlier beat markers no longer match.
    fn after_tempo_change(&mut self, rescaled: bool) {
        let now = self.clock.now();
        self.refresh_position(now);
        if rescaled {
            self.dispatcher.reset_markers();
            if self.running {
                self.rearm(now);
            }
        }
    }

    /// Switch mode. When running, the new mode announces the current
    /// position right away and the timer is re-armed for its interval.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        log::debug!(target: "engine", "mode {} -> {}", self.mode.name(), mode.name());
        self.mode = mode;
        self.dispatcher.reset();
        if self.running {
            let now = self.clock.now();
            self.fire(now);
            if self.running {
                self.rearm(now);
            }
        }
    }

    /// Load the score's note events. Sorted by time on the way in.
    pub fn set_note_events(&mut self, mut events: Vec<NoteEvent>) {
        events.sort_by_key(|e| e.time);
        let last = events.last().map(|e| e.time).unwrap_or(Duration::ZERO);
        self.total_duration = last + self.settings.trailing_buffer;
        self.first_channel = first_channel(&events);
        log::debug!(
            target: "engine",
            "{} note events, auto-stop at {:?}",
            events.len(),
            self.total_duration
        );
        self.events = Arc::from(events);
    }

    pub fn note_events(&self) -> &[NoteEvent] {
        &self.events
    }

    // ── Observation ───────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn tempo(&self) -> &TempoConfig {
        &self.tempo
    }

    pub fn rate_multiplier(&self) -> f64 {
        self.time_base.rate()
    }

    pub fn position(&self) -> BeatPosition {
        self.position
    }

    pub fn logical_time(&self) -> Duration {
        self.logical_time
    }

    pub fn is_following(&self) -> bool {
        self.bridge.is_following()
    }

    /// Interval of the armed timer; zero while stopped.
    pub fn timer_interval(&self) -> Duration {
        self.scheduler.interval()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            enabled: self.enabled,
            running: self.running,
            following: self.bridge.is_following(),
            mode: self.mode,
            position: self.position,
            logical_time: self.logical_time,
            total_duration: self.total_duration,
            first_channel: self.first_channel,
            effect_failures: self.effect_failures,
        }
    }

    /// Count a failure reported by the effect collaborator after the fact.
    pub fn report_effect_failure(&mut self, message: &str) {
        self.effect_failures += 1;
        log::warn!(target: "effects", "effect failed: {}", message);
    }

    /// Sink errors since the last call, oldest first.
    pub fn take_effect_failures(&mut self) -> Vec<String> {
        std::mem::take(&mut self.unreported_failures)
    }
}

impl<C: Clock> Drop for Engine<C> {
    fn drop(&mut self) {
        self.scheduler.cancel(&mut self.clock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::effects::RecordingSink;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup() -> (Engine<ManualClock>, ManualClock, RecordingSink) {
        let clock = ManualClock::new();
        let sink = RecordingSink::new();
        let mut engine = Engine::new(clock.clone(), sink.clone());
        engine.enable();
        (engine, clock, sink)
    }

    fn run(engine: &mut Engine<ManualClock>, clock: &ManualClock, by: Duration) {
        clock.advance(by);
        engine.pump();
    }

    #[test]
    fn starts_disabled() {
        let clock = ManualClock::new();
        let mut engine = Engine::new(clock, RecordingSink::new());
        assert_eq!(engine.status().state(), tactus_types::LifecycleState::Disabled);
        assert_eq!(engine.start(), Err(EngineError::Disabled));
        assert!(!engine.is_running());
    }

    #[test]
    fn start_emits_immediately_and_arms() {
        let (mut engine, clock, sink) = setup();
        engine.start().unwrap();
        assert_eq!(sink.ticks(), vec![true]);
        assert_eq!(clock.active_timers(), 1);
        assert_eq!(engine.timer_interval(), ms(500));

        // Second start is a no-op.
        engine.start().unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(clock.active_timers(), 1);
    }

    #[test]
    fn stop_cancels_and_rewinds() {
        let (mut engine, clock, sink) = setup();
        engine.start().unwrap();
        run(&mut engine, &clock, ms(1700));
        assert_eq!(engine.position().beat_index, 3);

        engine.stop();
        assert_eq!(engine.position(), BeatPosition::default());
        assert_eq!(engine.logical_time(), Duration::ZERO);
        assert_eq!(sink.effects().last(), Some(&Effect::CancelSpeech));
        assert_eq!(clock.active_timers(), 0);

        let before = sink.len();
        run(&mut engine, &clock, Duration::from_secs(60));
        assert_eq!(sink.len(), before);

        // Idempotent: no second CancelSpeech.
        engine.stop();
        assert_eq!(sink.len(), before);
    }

    #[test]
    fn fires_queued_before_stop_are_discarded() {
        let (mut engine, clock, sink) = setup();
        engine.start().unwrap();
        clock.advance(Duration::from_secs(2));
        engine.stop();
        let after_stop = sink.len();
        assert_eq!(engine.pump(), 0);
        assert_eq!(sink.len(), after_stop);
    }

    #[test]
    fn disable_forces_stop() {
        let (mut engine, clock, sink) = setup();
        engine.start().unwrap();
        engine.disable();
        assert!(!engine.is_running());
        assert!(!engine.is_enabled());
        assert_eq!(clock.active_timers(), 0);
        assert_eq!(sink.effects().last(), Some(&Effect::CancelSpeech));
        assert_eq!(engine.start(), Err(EngineError::Disabled));
    }

    #[test]
    fn invalid_tempo_keeps_previous() {
        let (mut engine, _clock, _sink) = setup();
        engine.set_bpm(90.0).unwrap();
        assert_eq!(engine.set_bpm(0.0), Err(EngineError::InvalidTempo(0.0)));
        assert_eq!(engine.set_bpm(-30.0), Err(EngineError::InvalidTempo(-30.0)));
        assert!(engine.set_bpm(f64::INFINITY).is_err());
        assert_eq!(engine.tempo().bpm(), 90.0);
    }

    #[test]
    fn invalid_rate_and_time_signature_rejected() {
        let (mut engine, _clock, _sink) = setup();
        assert_eq!(engine.set_rate_multiplier(0.0), Err(EngineError::InvalidRate(0.0)));
        assert_eq!(engine.rate_multiplier(), 1.0);

        let bad = TimeSignature {
            beats_per_measure: 0,
            beat_unit: 4,
        };
        assert_eq!(
            engine.set_time_signature(bad),
            Err(EngineError::InvalidTimeSignature {
                beats_per_measure: 0,
                beat_unit: 4
            })
        );
        assert_eq!(engine.tempo().time_signature(), TimeSignature::four_four());
    }

    #[test]
    fn extreme_rate_and_tempo_are_rejected() {
        let (mut engine, clock, sink) = setup();
        assert_eq!(engine.set_rate_multiplier(1e300), Err(EngineError::InvalidRate(1e300)));
        assert_eq!(engine.set_rate_multiplier(0.001), Err(EngineError::InvalidRate(0.001)));
        assert_eq!(engine.set_bpm(1e300), Err(EngineError::InvalidTempo(1e300)));
        assert_eq!(engine.rate_multiplier(), 1.0);
        assert_eq!(engine.tempo().bpm(), 120.0);

        engine.start().unwrap();
        run(&mut engine, &clock, ms(10));
        assert!(engine.is_running());
        assert_eq!(sink.ticks(), vec![true]);
    }

    #[test]
    fn fastest_settings_keep_running() {
        let (mut engine, clock, _sink) = setup();
        engine.set_bpm(tactus_types::MAX_BPM).unwrap();
        engine.set_subdivisions(4).unwrap();
        engine.set_rate_multiplier(tactus_types::MAX_RATE).unwrap();
        engine.start().unwrap();
        assert_eq!(engine.timer_interval(), ms(1));
        run(&mut engine, &clock, ms(20));
        assert!(engine.is_running());

        engine.seek(Duration::MAX);
        run(&mut engine, &clock, ms(5));
        assert!(engine.is_running());
    }

    #[test]
    fn unsupported_subdivisions_fall_back_to_one() {
        let (mut engine, _clock, _sink) = setup();
        engine.set_subdivisions(4).unwrap();
        assert_eq!(engine.set_subdivisions(3), Err(EngineError::UnsupportedSubdivisions(3)));
        assert_eq!(engine.tempo().subdivisions(), Subdivisions::One);
    }

    #[test]
    fn tempo_change_rearms_interval() {
        let (mut engine, clock, _sink) = setup();
        engine.start().unwrap();
        assert_eq!(engine.timer_interval(), ms(500));
        engine.set_bpm(60.0).unwrap();
        assert_eq!(engine.timer_interval(), Duration::from_secs(1));
        engine.set_subdivisions(2).unwrap();
        assert_eq!(engine.timer_interval(), ms(500));
        engine.set_rate_multiplier(2.0).unwrap();
        assert_eq!(engine.timer_interval(), ms(250));
        assert_eq!(clock.active_timers(), 1);
    }

    #[test]
    fn mode_change_replays_current_position() {
        let (mut engine, clock, sink) = setup();
        engine.set_bpm(60.0).unwrap();
        engine.start().unwrap();
        run(&mut engine, &clock, ms(1500));
        sink.clear();

        engine.set_mode(Mode::Count);
        assert_eq!(sink.spoken(), vec!["Two".to_string()]);
        // Setting the same mode again changes nothing.
        engine.set_mode(Mode::Count);
        assert_eq!(sink.len(), 1);

        engine.set_mode(Mode::Letter);
        assert_eq!(engine.timer_interval(), ms(50));
        assert_eq!(clock.active_timers(), 1);
    }

    #[test]
    fn seek_is_idempotent() {
        let (mut engine, clock, _sink) = setup();
        engine.start().unwrap();
        run(&mut engine, &clock, ms(300));

        engine.seek(ms(2600));
        let once = engine.status();
        engine.seek(ms(2600));
        assert_eq!(engine.status(), once);
        assert_eq!(once.position.beat_index, 1); // 5.2 beats into a 4/4 bar
        assert_eq!(clock.active_timers(), 1);
    }

    #[test]
    fn seek_while_stopped_sets_start_point() {
        let (mut engine, _clock, sink) = setup();
        engine.set_mode(Mode::Count);
        engine.seek(ms(1000));
        assert_eq!(engine.position().beat_index, 2);
        assert!(sink.is_empty());

        engine.start().unwrap();
        assert_eq!(sink.spoken(), vec!["Three".to_string()]);
    }

    #[test]
    fn time_signature_change_rewraps_position() {
        let (mut engine, clock, _sink) = setup();
        engine.start().unwrap();
        run(&mut engine, &clock, ms(2000)); // beat 4 overall
        assert_eq!(engine.position().beat_index, 0);
        engine.set_time_signature(TimeSignature::three_four()).unwrap();
        assert_eq!(engine.position().beat_index, 1);
        assert_eq!(engine.timer_interval(), ms(500));
    }

    #[test]
    fn note_events_define_end_and_channel() {
        let (mut engine, _clock, _sink) = setup();
        assert_eq!(engine.status().total_duration, Duration::ZERO);

        engine.set_note_events(vec![
            NoteEvent::new(ms(3000), 64, 2),
            NoteEvent::new(ms(0), 60, 1),
            NoteEvent::new(ms(1000), 62, 1),
        ]);
        let status = engine.status();
        assert_eq!(status.total_duration, ms(5000));
        assert_eq!(status.first_channel, Some(1));
        assert_eq!(engine.note_events()[0].time, ms(0));

        engine.set_note_events(Vec::new());
        assert_eq!(engine.status().total_duration, ms(2000));
        assert_eq!(engine.status().first_channel, None);
    }

    #[test]
    fn sink_failures_are_counted_not_fatal() {
        let (mut engine, clock, sink) = setup();
        sink.set_failing(true);
        engine.start().unwrap();
        run(&mut engine, &clock, ms(1000));

        assert!(engine.is_running());
        assert_eq!(engine.status().effect_failures, 3);
        assert_eq!(engine.take_effect_failures().len(), 3);
        assert!(engine.take_effect_failures().is_empty());

        engine.report_effect_failure("speech engine busy");
        assert_eq!(engine.status().effect_failures, 4);
    }
}
