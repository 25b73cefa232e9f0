//! # Completion Tracking
//!
//! Per-direction completion counters shared between the driver and the engine's
//! completion callbacks. The driver resets both counters, starts the transfers and
//! then blocks until each counter has advanced; callbacks run on whatever thread
//! the engine delivers completions on.
//!
//! The counters sit behind one mutex with a condition variable, so waiting does not
//! spin. An optional deadline bounds the wait.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Transfer direction of a DMA channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Memory to stream (source lines into the accelerator)
    Transmit,
    /// Stream to memory (scaled lines back into the destination)
    Receive,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Counts {
    tx: u32,
    rx: u32,
}

/// Pair of completion counters with a blocking wait.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    counts: Mutex<Counts>,
    signal: Condvar,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one finished transfer in `direction` and wakes the waiter.
    pub fn notify(&self, direction: Direction) {
        let mut counts = self.counts.lock();
        match direction {
            Direction::Transmit => counts.tx = counts.tx.wrapping_add(1),
            Direction::Receive => counts.rx = counts.rx.wrapping_add(1),
        }
        self.signal.notify_all();
    }

    pub fn reset(&self) {
        *self.counts.lock() = Counts::default();
    }

    pub fn count(&self, direction: Direction) -> u32 {
        let counts = self.counts.lock();
        match direction {
            Direction::Transmit => counts.tx,
            Direction::Receive => counts.rx,
        }
    }

    /// Blocks until both counters are non-zero.
    ///
    /// With `timeout = None` the wait is unbounded. Returns `false` if the deadline
    /// passed first.
    pub fn wait_both(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut counts = self.counts.lock();
        while counts.tx == 0 || counts.rx == 0 {
            match deadline {
                None => self.signal.wait(&mut counts),
                Some(deadline) => {
                    if self.signal.wait_until(&mut counts, deadline).timed_out() {
                        return counts.tx != 0 && counts.rx != 0;
                    }
                }
            }
        }
        true
    }
}
