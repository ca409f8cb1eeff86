//! Per-mode side-effect decisions with de-duplication.

use std::time::Duration;

use tactus_types::{BeatPosition, ClockSnapshot, Effect, Mode, NoteEvent, Subdivisions};

pub const DEFAULT_NOTE_TOLERANCE: Duration = Duration::from_millis(100);
pub const DEFAULT_SPEECH_DEBOUNCE: Duration = Duration::from_millis(150);

const COUNT_WORDS: [&str; 12] = [
    "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten", "Eleven", "Twelve",
];

const LETTER_NAMES: [&str; 7] = ["C", "D", "E", "F", "G", "A", "B"];
const SOLFEGE_NAMES: [&str; 7] = ["Do", "Re", "Mi", "Fa", "Sol", "La", "Ti"];

/// Scale degree (0 = C) for each pitch class. Sharps fall to the natural below.
const DEGREE_OF_PITCH_CLASS: [usize; 12] = [0, 0, 1, 1, 2, 3, 3, 4, 4, 5, 5, 6];

/// Everything the dispatcher needs to know about one fire.
#[derive(Debug, Clone, Copy)]
pub struct FireContext<'a> {
    pub mode: Mode,
    pub subdivisions: Subdivisions,
    pub position: BeatPosition,
    /// Absolute subdivision count since logical zero.
    pub total_subdivisions: u64,
    pub logical_time: Duration,
    pub now: ClockSnapshot,
    /// Sorted by time.
    pub events: &'a [NoteEvent],
}

#[derive(Debug, Clone)]
pub struct ModeDispatcher {
    last_marker: Option<u64>,
    /// Labels currently sounding; cleared when no note is due.
    last_spoken: Option<String>,
    /// Text and time of the last emission. Survives resets so a repeat is
    /// still debounced across tempo changes and seeks.
    last_emission: Option<(String, ClockSnapshot)>,
    tolerance: Duration,
    debounce: Duration,
}

impl ModeDispatcher {
    pub fn new(tolerance: Duration, debounce: Duration) -> Self {
        Self {
            last_marker: None,
            last_spoken: None,
            last_emission: None,
            tolerance,
            debounce,
        }
    }

    /// Forget what was emitted so the next fire announces its position again.
    /// The last emission is kept for debouncing.
    pub fn reset(&mut self) {
        self.last_marker = None;
        self.last_spoken = None;
    }

    /// Forget only the beat/subdivision marker. Used when the grid moves
    /// under an unchanged logical time, where sounding notes stay the same.
    pub fn reset_markers(&mut self) {
        self.last_marker = None;
    }

    pub fn last_spoken(&self) -> Option<&str> {
        self.last_spoken.as_deref()
    }

    pub fn dispatch(&mut self, ctx: &FireContext<'_>) -> Option<Effect> {
        match ctx.mode {
            Mode::Tick => {
                let beat = ctx.total_subdivisions / ctx.subdivisions.count() as u64;
                self.mark(beat).then(|| Effect::PlayTick {
                    accent: ctx.position.is_downbeat(),
                })
            }
            Mode::Count => self
                .mark(ctx.total_subdivisions)
                .then(|| Effect::speak(count_word(ctx.position, ctx.subdivisions))),
            Mode::Letter | Mode::Solfege => self.dispatch_notes(ctx),
        }
    }

    /// Record `marker`; true when it differs from the previous fire's.
    fn mark(&mut self, marker: u64) -> bool {
        if self.last_marker == Some(marker) {
            return false;
        }
        self.last_marker = Some(marker);
        true
    }

    fn dispatch_notes(&mut self, ctx: &FireContext<'_>) -> Option<Effect> {
        let due = due_events(ctx.events, ctx.logical_time, self.tolerance);
        if due.is_empty() {
            self.last_spoken = None;
            return None;
        }

        let text = note_labels(due, ctx.mode == Mode::Solfege);
        if self.last_spoken.as_deref() == Some(text.as_str()) {
            return None;
        }
        // Different labels are spoken at once; the same labels wait out the
        // debounce interval.
        if let Some((prev_text, prev_at)) = &self.last_emission {
            if *prev_text == text && ctx.now.duration_since(*prev_at) < self.debounce {
                return None;
            }
        }

        self.last_spoken = Some(text.clone());
        self.last_emission = Some((text.clone(), ctx.now));
        Some(Effect::Speak { text })
    }
}

impl Default for ModeDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_NOTE_TOLERANCE, DEFAULT_SPEECH_DEBOUNCE)
    }
}

/// Spoken word for a counted position: the beat number on the beat, then
/// "and" or "e and a" between beats.
pub fn count_word(position: BeatPosition, subdivisions: Subdivisions) -> String {
    match (subdivisions, position.subdivision_index) {
        (_, 0) => beat_word(position.beat_index),
        (Subdivisions::Two, _) => "and".to_string(),
        (Subdivisions::Four, 1) => "e".to_string(),
        (Subdivisions::Four, 2) => "and".to_string(),
        (Subdivisions::Four, _) => "a".to_string(),
        (Subdivisions::One, _) => beat_word(position.beat_index),
    }
}

fn beat_word(beat_index: u32) -> String {
    COUNT_WORDS
        .get(beat_index as usize)
        .map(|w| w.to_string())
        .unwrap_or_else(|| (beat_index + 1).to_string())
}

/// Events strictly within `tolerance` of `logical_time`.
pub fn due_events(events: &[NoteEvent], logical_time: Duration, tolerance: Duration) -> &[NoteEvent] {
    let lo = events.partition_point(|e| e.time.saturating_add(tolerance) <= logical_time);
    let hi = events.partition_point(|e| e.time < logical_time.saturating_add(tolerance));
    &events[lo..hi.max(lo)]
}

/// Distinct note names in scale order, space separated.
pub fn note_labels(events: &[NoteEvent], solfege: bool) -> String {
    let names = if solfege { &SOLFEGE_NAMES } else { &LETTER_NAMES };
    let mut present = [false; 7];
    for event in events {
        present[DEGREE_OF_PITCH_CLASS[event.pitch_class() as usize]] = true;
    }
    present
        .iter()
        .zip(names.iter())
        .filter(|(on, _)| **on)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(" ")
}
