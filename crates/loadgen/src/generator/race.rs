//! Single-assignment flag deciding who reports a call.

use std::sync::atomic::{AtomicU8, Ordering};

/// How a call was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Outcome {
    Pending = 0,
    Completed = 1,
    TimedOut = 2,
}

/// First writer wins. Only the side that resolves the flag may emit a
/// result for the call.
#[derive(Debug)]
pub(crate) struct RaceFlag(AtomicU8);

impl RaceFlag {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(Outcome::Pending as u8))
    }

    /// Try to settle the race with `outcome`. Returns true for the winner.
    pub(crate) fn resolve(&self, outcome: Outcome) -> bool {
        debug_assert_ne!(outcome, Outcome::Pending);
        self.0
            .compare_exchange(
                Outcome::Pending as u8,
                outcome as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn outcome(&self) -> Outcome {
        match self.0.load(Ordering::Acquire) {
            0 => Outcome::Pending,
            1 => Outcome::Completed,
            _ => Outcome::TimedOut,
        }
    }
}
