#![allow(dead_code)]
//! Test harness utilities for tactus-core integration tests.

use std::time::Duration;

use tactus_core::{
    transport_cell, ClockSnapshot, Engine, EngineSettings, ManualClock, RecordingSink,
    TransportSnapshot, TransportWriter,
};

pub fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

pub fn at_secs(s: f64) -> ClockSnapshot {
    ClockSnapshot::from_duration(secs(s))
}

pub fn at_ms(n: u64) -> ClockSnapshot {
    ClockSnapshot::from_duration(ms(n))
}

/// An enabled engine on a manual clock, recording every cue.
pub struct Harness {
    pub engine: Engine<ManualClock>,
    pub clock: ManualClock,
    pub sink: RecordingSink,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        let clock = ManualClock::new();
        let sink = RecordingSink::new();
        let mut engine = Engine::with_settings(clock.clone(), sink.clone(), settings);
        engine.enable();
        Self {
            engine,
            clock,
            sink,
        }
    }

    /// Move time forward and let the engine handle every fire that came due.
    pub fn advance(&mut self, by: Duration) -> usize {
        self.clock.advance(by);
        self.engine.pump()
    }

    /// Attach a transport cell and return its writer, starting at `initial`.
    pub fn attach_transport(&mut self, initial: TransportSnapshot) -> TransportWriter {
        let (writer, reader) = transport_cell(initial);
        self.engine.attach_transport(Box::new(reader));
        writer
    }

    /// Advance in `step`s, publishing a playing snapshot that tracks the
    /// clock before each step.
    pub fn play_transport(&mut self, writer: &mut TransportWriter, from: Duration, total: Duration, step: Duration) {
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            writer.publish(TransportSnapshot::playing_at(from + elapsed, secs(600.0)));
            self.advance(step);
            elapsed += step;
        }
    }

    /// Instants of every spoken cue, paired with its text.
    pub fn spoken_at(&self) -> Vec<(ClockSnapshot, String)> {
        self.sink
            .cues()
            .into_iter()
            .filter_map(|c| c.effect.spoken_text().map(|t| (c.at, t.to_string())))
            .collect()
    }
}
