//! The single repeating timer that paces the engine.

use std::time::Duration;

use crossbeam_channel::Sender;
use tactus_types::{Mode, TempoConfig};

use crate::beat_indexer::ceil_duration;
use crate::clock::{Clock, ClockSnapshot, TimerFire, TimerHandle};

/// Floor for the coarse interval. A tempo/rate combination this fast would
/// otherwise flood the timer inbox.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

pub const DEFAULT_FINE_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct Scheduler {
    active: Option<TimerHandle>,
    interval: Duration,
    fine_interval: Duration,
}

impl Scheduler {
    pub fn new(fine_interval: Duration) -> Self {
        Self {
            active: None,
            interval: Duration::ZERO,
            fine_interval: fine_interval.max(MIN_INTERVAL),
        }
    }

    /// Fine polling while following the transport or looking up notes;
    /// otherwise one fire per subdivision of wall-clock time.
    pub fn interval_for(&self, mode: Mode, following: bool, tempo: &TempoConfig, rate: f64) -> Duration {
        if following || mode.tracks_notes() {
            self.fine_interval
        } else {
            self.coarse_interval(tempo, rate)
        }
    }

    pub fn coarse_interval(&self, tempo: &TempoConfig, rate: f64) -> Duration {
        ceil_duration(tempo.subdivision_secs() / rate).max(MIN_INTERVAL)
    }

    pub fn is_fine(&self, interval: Duration) -> bool {
        interval == self.fine_interval
    }

    pub fn fine_interval(&self) -> Duration {
        self.fine_interval
    }

    /// Replace the active timer. The old handle is cancelled before the new
    /// one exists, so at most one handle is ever current.
    pub fn arm<C: Clock + ?Sized>(
        &mut self,
        clock: &mut C,
        first: ClockSnapshot,
        interval: Duration,
        inbox: Sender<TimerFire>,
    ) -> TimerHandle {
        self.cancel(clock);
        let handle = clock.schedule_repeating(first, interval, inbox);
        log::debug!(
            target: "scheduler",
            "armed timer {} first {} every {:?}",
            handle.id(),
            first,
            interval
        );
        self.active = Some(handle);
        self.interval = interval;
        handle
    }

    pub fn cancel<C: Clock + ?Sized>(&mut self, clock: &mut C) {
        if let Some(handle) = self.active.take() {
            clock.cancel(handle);
            log::debug!(target: "scheduler", "cancelled timer {}", handle.id());
        }
    }

    /// Whether `handle` is the live timer. Fires from anything else are stale.
    pub fn is_current(&self, handle: TimerHandle) -> bool {
        self.active == Some(handle)
    }

    pub fn is_armed(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<TimerHandle> {
        self.active
    }

    /// Interval of the active timer; zero when disarmed.
    pub fn interval(&self) -> Duration {
        if self.active.is_some() {
            self.interval
        } else {
            Duration::ZERO
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_FINE_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use tactus_types::{Subdivisions, TimeSignature};

    fn tempo(bpm: f64, subdivisions: Subdivisions) -> TempoConfig {
        TempoConfig::new(bpm, TimeSignature::four_four(), subdivisions).unwrap()
    }

    #[test]
    fn coarse_interval_is_wall_clock_subdivision() {
        let scheduler = Scheduler::default();
        let t = tempo(120.0, Subdivisions::Two);
        assert_eq!(scheduler.interval_for(Mode::Tick, false, &t, 1.0), Duration::from_millis(250));
        assert_eq!(scheduler.interval_for(Mode::Count, false, &t, 0.5), Duration::from_millis(500));
        assert_eq!(scheduler.interval_for(Mode::Count, false, &t, 2.0), Duration::from_millis(125));
    }

    #[test]
    fn fine_interval_when_following_or_tracking_notes() {
        let scheduler = Scheduler::new(Duration::from_millis(20));
        let t = tempo(60.0, Subdivisions::One);
        assert_eq!(scheduler.interval_for(Mode::Tick, true, &t, 1.0), Duration::from_millis(20));
        assert_eq!(scheduler.interval_for(Mode::Letter, false, &t, 1.0), Duration::from_millis(20));
        assert_eq!(scheduler.interval_for(Mode::Solfege, false, &t, 1.0), Duration::from_millis(20));
        assert_eq!(scheduler.interval_for(Mode::Count, false, &t, 1.0), Duration::from_secs(1));
    }

    #[test]
    fn extreme_tempo_is_floored() {
        let scheduler = Scheduler::default();
        let t = tempo(1_000_000.0, Subdivisions::Four);
        assert_eq!(scheduler.coarse_interval(&t, 10.0), MIN_INTERVAL);
    }

    #[test]
    fn rearming_cancels_previous_handle() {
        let mut clock = ManualClock::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut scheduler = Scheduler::default();

        let first = scheduler.arm(&mut clock, ClockSnapshot::ZERO + Duration::from_millis(100), Duration::from_millis(100), tx.clone());
        let second = scheduler.arm(&mut clock, ClockSnapshot::ZERO + Duration::from_millis(50), Duration::from_millis(50), tx);

        assert_ne!(first, second);
        assert!(!scheduler.is_current(first));
        assert!(scheduler.is_current(second));
        assert_eq!(clock.active_timers(), 1);

        clock.advance(Duration::from_millis(200));
        assert!(rx.try_iter().all(|f| f.handle == second));
    }

    #[test]
    fn cancel_disarms() {
        let mut clock = ManualClock::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut scheduler = Scheduler::default();
        scheduler.arm(&mut clock, ClockSnapshot::ZERO + Duration::from_millis(10), Duration::from_millis(10), tx);
        scheduler.cancel(&mut clock);

        assert!(!scheduler.is_armed());
        assert_eq!(scheduler.interval(), Duration::ZERO);
        clock.advance(Duration::from_secs(1));
        assert_eq!(rx.try_iter().count(), 0);
    }
}
