//! Generator lifecycle state machine.
//!
//! ```text
//! Original -> Starting -> Started -> Stopping -> Stopped
//!                ^                                  |
//!                +----------------------------------+
//! ```
//!
//! Every status change goes through [`StatusCell::transition`], a single
//! compare-and-set that only accepts the edges above. Reads are lock-free.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum GeneratorStatus {
    Original = 0,
    Starting = 1,
    Started = 2,
    Stopping = 3,
    Stopped = 4,
}

impl GeneratorStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => GeneratorStatus::Original,
            1 => GeneratorStatus::Starting,
            2 => GeneratorStatus::Started,
            3 => GeneratorStatus::Stopping,
            _ => GeneratorStatus::Stopped,
        }
    }

    /// Whether `self -> to` is a legal edge.
    pub fn can_transition_to(self, to: GeneratorStatus) -> bool {
        use GeneratorStatus::*;
        matches!(
            (self, to),
            (Original, Starting)
                | (Stopped, Starting)
                | (Starting, Started)
                | (Started, Stopping)
                | (Stopping, Stopped)
        )
    }
}

impl fmt::Display for GeneratorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeneratorStatus::Original => "original",
            GeneratorStatus::Starting => "starting",
            GeneratorStatus::Started => "started",
            GeneratorStatus::Stopping => "stopping",
            GeneratorStatus::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Atomic holder for a [`GeneratorStatus`].
#[derive(Debug)]
pub struct StatusCell(AtomicU8);

impl StatusCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(GeneratorStatus::Original as u8))
    }

    /// Current status.
    pub fn load(&self) -> GeneratorStatus {
        GeneratorStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move from `from` to `to` if the cell currently holds `from`.
    ///
    /// Returns false when the edge is not part of the state machine or when
    /// another caller got there first.
    pub fn transition(&self, from: GeneratorStatus, to: GeneratorStatus) -> bool {
        if !from.can_transition_to(to) {
            return false;
        }
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::GeneratorStatus::*;
    use super::*;

    #[test]
    fn test_full_cycle() {
        let cell = StatusCell::new();
        assert_eq!(cell.load(), Original);
        assert!(cell.transition(Original, Starting));
        assert!(cell.transition(Starting, Started));
        assert!(cell.transition(Started, Stopping));
        assert!(cell.transition(Stopping, Stopped));
        assert_eq!(cell.load(), Stopped);

        // Restart
        assert!(cell.transition(Stopped, Starting));
        assert_eq!(cell.load(), Starting);
    }

    #[test]
    fn test_illegal_edges_rejected() {
        let cell = StatusCell::new();
        assert!(!cell.transition(Original, Started));
        assert!(!cell.transition(Original, Stopped));
        assert_eq!(cell.load(), Original);

        assert!(cell.transition(Original, Starting));
        assert!(!cell.transition(Starting, Stopping));
        assert!(!cell.transition(Starting, Original));
        assert_eq!(cell.load(), Starting);
    }

    #[test]
    fn test_only_one_winner() {
        let cell = StatusCell::new();
        assert!(cell.transition(Original, Starting));
        assert!(!cell.transition(Original, Starting));
    }

    #[test]
    fn test_stale_from_rejected() {
        let cell = StatusCell::new();
        assert!(cell.transition(Original, Starting));
        assert!(cell.transition(Starting, Started));
        assert!(!cell.transition(Stopping, Stopped));
        assert_eq!(cell.load(), Started);
    }
}
