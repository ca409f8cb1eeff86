//! Lock-free hand-off of transport snapshots from the playback thread.
//!
//! A triple buffer: the writer fills the back slot and swaps it with the
//! middle slot; the reader swaps the middle slot into the front slot when
//! fresh data is flagged. Neither side blocks, and the reader always sees one
//! complete snapshot, never a mix of two writes.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use tactus_types::TransportSnapshot;

use crate::transport::TransportSource;

/// State byte layout: [fresh:1][unused:1][back:2][middle:2][front:2]
const FRONT_SHIFT: u8 = 0;
const MIDDLE_SHIFT: u8 = 2;
const BACK_SHIFT: u8 = 4;
const SLOT_MASK: u8 = 0b11;
const FRESH: u8 = 0x80;

fn slot(state: u8, shift: u8) -> usize {
    ((state >> shift) & SLOT_MASK) as usize
}

fn encode(front: usize, middle: usize, back: usize, fresh: bool) -> u8 {
    let mut state = ((back as u8) << BACK_SHIFT)
        | ((middle as u8) << MIDDLE_SHIFT)
        | ((front as u8) << FRONT_SHIFT);
    if fresh {
        state |= FRESH;
    }
    state
}

struct Shared {
    slots: [UnsafeCell<TransportSnapshot>; 3],
    state: AtomicU8,
    attached: AtomicBool,
}

// Safety: the state byte hands each slot to at most one side at a time; the
// writer only touches `back`, the reader only touches `front`.
unsafe impl Sync for Shared {}

/// Publishing half, owned by the playback thread. Dropping it detaches the
/// transport: readers then report no snapshot.
pub struct TransportWriter {
    shared: Arc<Shared>,
}

impl TransportWriter {
    pub fn publish(&mut self, snapshot: TransportSnapshot) {
        let back = slot(self.shared.state.load(Ordering::Acquire), BACK_SHIFT);
        // Safety: single writer (`&mut self`), and `back` is never the
        // reader's front slot.
        unsafe {
            *self.shared.slots[back].get() = snapshot;
        }
        let _ = self
            .shared
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                Some(encode(
                    slot(state, FRONT_SHIFT),
                    slot(state, BACK_SHIFT),
                    slot(state, MIDDLE_SHIFT),
                    true,
                ))
            });
    }
}

impl Drop for TransportWriter {
    fn drop(&mut self) {
        self.shared.attached.store(false, Ordering::Release);
    }
}

/// Reading half, handed to the engine as its [`TransportSource`].
pub struct TransportReader {
    shared: Arc<Shared>,
}

impl TransportReader {
    /// Latest complete snapshot published so far.
    pub fn read(&mut self) -> TransportSnapshot {
        let _ = self
            .shared
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                if state & FRESH == 0 {
                    return None;
                }
                Some(encode(
                    slot(state, MIDDLE_SHIFT),
                    slot(state, FRONT_SHIFT),
                    slot(state, BACK_SHIFT),
                    false,
                ))
            });
        let front = slot(self.shared.state.load(Ordering::Acquire), FRONT_SHIFT);
        // Safety: single reader (`&mut self`), and the writer never writes
        // the front slot.
        unsafe { *self.shared.slots[front].get() }
    }

    pub fn has_fresh(&self) -> bool {
        self.shared.state.load(Ordering::Acquire) & FRESH != 0
    }

    pub fn is_attached(&self) -> bool {
        self.shared.attached.load(Ordering::Acquire)
    }
}

impl TransportSource for TransportReader {
    fn snapshot(&mut self) -> Option<TransportSnapshot> {
        if !self.is_attached() {
            return None;
        }
        Some(self.read())
    }
}

/// Create a connected writer/reader pair starting at `initial`.
pub fn transport_cell(initial: TransportSnapshot) -> (TransportWriter, TransportReader) {
    let shared = Arc::new(Shared {
        slots: [
            UnsafeCell::new(initial),
            UnsafeCell::new(initial),
            UnsafeCell::new(initial),
        ],
        state: AtomicU8::new(encode(0, 1, 2, false)),
        attached: AtomicBool::new(true),
    });
    (
        TransportWriter {
            shared: Arc::clone(&shared),
        },
        TransportReader { shared },
    )
}
