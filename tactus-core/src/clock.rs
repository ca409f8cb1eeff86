//! Clock abstraction: monotonic time plus repeating timers.
//!
//! Timers never call back into the engine. Each fire is posted as a
//! [`TimerFire`] message into the sink handed to `schedule_repeating`, and the
//! engine handles it on its own serialized context. `TimerFire::at` is the
//! instant the fire was due; the engine treats it as "now" for that fire.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};

pub use tactus_types::ClockSnapshot;

/// Identifies one armed repeating timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Message posted by a clock when a timer deadline is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFire {
    pub handle: TimerHandle,
    pub at: ClockSnapshot,
}

pub trait Clock: Send {
    fn now(&self) -> ClockSnapshot;

    /// Arm a timer firing at `first`, `first + interval`, `first + 2 * interval`, ...
    fn schedule_repeating(
        &mut self,
        first: ClockSnapshot,
        interval: Duration,
        sink: Sender<TimerFire>,
    ) -> TimerHandle;

    fn cancel(&mut self, handle: TimerHandle);
}

/// Wall-clock implementation. Each timer runs on a small thread that waits
/// on a cancel channel with a timeout equal to the time left to the next
/// deadline, so cancellation wakes it immediately.
pub struct SystemClock {
    epoch: Instant,
    next_id: AtomicU64,
    timers: HashMap<TimerHandle, Sender<()>>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            next_id: AtomicU64::new(1),
            timers: HashMap::new(),
        }
    }

    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> ClockSnapshot {
        ClockSnapshot::from_duration(self.epoch.elapsed())
    }

    fn schedule_repeating(
        &mut self,
        first: ClockSnapshot,
        interval: Duration,
        sink: Sender<TimerFire>,
    ) -> TimerHandle {
        let handle = TimerHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded::<()>(0);
        let epoch = self.epoch;
        let interval = interval.max(Duration::from_micros(100));

        let spawned = thread::Builder::new()
            .name(format!("tactus-timer-{}", handle.0))
            .spawn(move || {
                let mut deadline = first;
                loop {
                    let now = ClockSnapshot::from_duration(epoch.elapsed());
                    match cancel_rx.recv_timeout(deadline.duration_since(now)) {
                        Err(RecvTimeoutError::Timeout) => {}
                        // Cancelled (sender dropped) or told to stop.
                        _ => break,
                    }
                    if sink.send(TimerFire { handle, at: deadline }).is_err() {
                        break;
                    }
                    deadline = deadline + interval;

                    // Coalesce overrun deadlines instead of bursting.
                    let now = ClockSnapshot::from_duration(epoch.elapsed());
                    if deadline < now {
                        let behind = now.duration_since(deadline).as_nanos();
                        let skip = (behind / interval.as_nanos()) as u32 + 1;
                        log::debug!(target: "scheduler", "timer {} skipped {} late fires", handle.0, skip);
                        deadline = deadline + interval * skip;
                    }
                }
            });

        match spawned {
            Ok(_) => {
                self.timers.insert(handle, cancel_tx);
            }
            Err(e) => {
                log::error!(target: "scheduler", "could not spawn timer thread: {}", e);
            }
        }
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        // Dropping the sender disconnects the timer thread's cancel channel.
        self.timers.remove(&handle);
    }
}

struct ManualTimer {
    handle: TimerHandle,
    next: ClockSnapshot,
    interval: Duration,
    sink: Sender<TimerFire>,
}

#[derive(Default)]
struct ManualState {
    now: ClockSnapshot,
    next_id: u64,
    timers: Vec<ManualTimer>,
    fires_posted: u64,
}

/// Deterministic clock for tests. Time only moves on [`ManualClock::advance`].
///
/// Clones share state: a test keeps one clone to drive time while the engine
/// owns another.
#[derive(Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move time forward by `by`, posting one fire per elapsed deadline in
    /// deadline order. A repeating timer may fire many times in one call.
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        let target = state.now + by;

        loop {
            let due = state
                .timers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.next <= target)
                .min_by_key(|(_, t)| (t.next, t.handle))
                .map(|(idx, _)| idx);
            let Some(idx) = due else { break };

            let timer = &mut state.timers[idx];
            let fire = TimerFire {
                handle: timer.handle,
                at: timer.next,
            };
            timer.next = timer.next + timer.interval;
            let delivered = timer.sink.send(fire).is_ok();

            state.now = fire.at;
            state.fires_posted += 1;
            if !delivered {
                state.timers.remove(idx);
            }
        }

        state.now = target;
    }

    pub fn active_timers(&self) -> usize {
        self.lock().timers.len()
    }

    /// Total fires posted across all timers, including ones the engine
    /// later discarded as stale.
    pub fn fires_posted(&self) -> u64 {
        self.lock().fires_posted
    }
}

impl Clock for ManualClock {
    fn now(&self) -> ClockSnapshot {
        self.lock().now
    }

    fn schedule_repeating(
        &mut self,
        first: ClockSnapshot,
        interval: Duration,
        sink: Sender<TimerFire>,
    ) -> TimerHandle {
        let mut state = self.lock();
        state.next_id += 1;
        let handle = TimerHandle(state.next_id);
        let interval = interval.max(Duration::from_nanos(1));

        // A timer armed while the engine works through a batch of earlier
        // fires can already be overdue; post those fires right away.
        let mut next = first;
        while next <= state.now {
            if sink.send(TimerFire { handle, at: next }).is_err() {
                return handle;
            }
            state.fires_posted += 1;
            next = next + interval;
        }

        state.timers.push(ManualTimer {
            handle,
            next,
            interval,
            sink,
        });
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.lock().timers.retain(|t| t.handle != handle);
    }
}
