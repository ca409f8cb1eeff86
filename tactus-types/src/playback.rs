use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Point-in-time view of an external playback transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportSnapshot {
    pub is_playing: bool,
    pub current_position: Duration,
    pub duration: Duration,
}

impl TransportSnapshot {
    pub fn playing_at(current_position: Duration, duration: Duration) -> Self {
        Self {
            is_playing: true,
            current_position,
            duration,
        }
    }

    pub fn paused_at(current_position: Duration, duration: Duration) -> Self {
        Self {
            is_playing: false,
            current_position,
            duration,
        }
    }
}

/// A note onset demuxed from the score's MIDI stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub time: Duration,
    pub pitch: u8,
    pub channel: u8,
}

impl NoteEvent {
    pub fn new(time: Duration, pitch: u8, channel: u8) -> Self {
        Self {
            time,
            pitch,
            channel,
        }
    }

    /// Pitch class, 0 = C.
    pub fn pitch_class(&self) -> u8 {
        self.pitch % 12
    }
}

/// Lowest channel used by any event; callers treat it as the primary staff.
pub fn first_channel(events: &[NoteEvent]) -> Option<u8> {
    events.iter().map(|e| e.channel).min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_channel_is_minimum() {
        let events = [
            NoteEvent::new(Duration::ZERO, 60, 3),
            NoteEvent::new(Duration::from_millis(500), 64, 1),
            NoteEvent::new(Duration::from_secs(1), 67, 2),
        ];
        assert_eq!(first_channel(&events), Some(1));
        assert_eq!(first_channel(&[]), None);
    }

    #[test]
    fn pitch_class_is_octave_invariant() {
        let c4 = NoteEvent::new(Duration::ZERO, 60, 0);
        let c5 = NoteEvent::new(Duration::ZERO, 72, 0);
        assert_eq!(c4.pitch_class(), 0);
        assert_eq!(c4.pitch_class(), c5.pitch_class());
    }
}
