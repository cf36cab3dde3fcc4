//! Error types for the load generator.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while building a generator.
///
/// Per-call failures never show up here; they are reported as
/// [`CallResult`](crate::CallResult)s on the result sink.
#[derive(Error, Debug)]
pub enum LoadGenError {
    /// One or more parameters were missing or zero. The message lists every
    /// violation, not just the first.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// The ticket pool could not be created.
    #[error("ticket pool error: {0}")]
    TicketPool(#[from] TicketPoolError),
}

impl LoadGenError {
    /// Create an InvalidParams error.
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }
}

/// Errors from the ticket pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketPoolError {
    /// A pool must hold at least one ticket.
    #[error("the ticket pool can not be initialized with zero capacity")]
    ZeroCapacity,

    /// `init` was called on a pool that is already active.
    #[error("the ticket pool is already active (total={total})")]
    AlreadyActive { total: u32 },

    /// More tickets were returned than were taken.
    #[error("returned ticket would overfill the pool (total={total})")]
    Overfilled { total: u32 },
}

/// Transport-level failure reported by a [`Caller`](crate::Caller).
///
/// This covers failures before any protocol-level validation happens,
/// e.g. the connection was refused or the peer hung up mid-response.
#[derive(Error, Debug)]
pub enum CallError {
    /// I/O failure talking to the target.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller gave up on its own deadline.
    #[error("call did not complete within {0:?}")]
    Timeout(Duration),

    /// The exchange broke down at the framing level.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl CallError {
    /// Create a Protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}

/// Result type for load generator operations.
pub type Result<T> = std::result::Result<T, LoadGenError>;
