//! Ticket pool bounding the number of in-flight calls.
//!
//! A pool is a counting semaphore with a fixed number of tickets. A call task
//! takes one ticket before it talks to the target and returns it when it is
//! done, so at most `total` calls are ever outstanding.
//!
//! ## Usage
//!
//! ```ignore
//! let pool = Arc::new(TicketPool::new(8)?);
//!
//! // RAII style: the ticket goes back when the guard drops
//! let ticket = pool.acquire().await;
//! do_call().await;
//! drop(ticket);
//!
//! // Manual style
//! pool.take().await;
//! pool.return_ticket()?;
//! ```
//!
//! Waiters are released in whatever order the underlying semaphore picks;
//! callers must not rely on fairness.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::error::TicketPoolError;

/// Fixed-capacity pool of call tickets.
pub struct TicketPool {
    total: u32,
    /// Tickets currently handed out. Guards against returns without a take.
    taken: AtomicU32,
    semaphore: Semaphore,
    active: bool,
}

impl Default for TicketPool {
    /// An inactive pool with no tickets. Call [`TicketPool::init`] before use.
    fn default() -> Self {
        Self {
            total: 0,
            taken: AtomicU32::new(0),
            semaphore: Semaphore::new(0),
            active: false,
        }
    }
}

impl TicketPool {
    /// Create and activate a pool holding `total` tickets.
    pub fn new(total: u32) -> Result<Self, TicketPoolError> {
        let mut pool = Self::default();
        pool.init(total)?;
        Ok(pool)
    }

    /// Activate the pool with `total` tickets.
    ///
    /// Fails if `total` is zero or the pool is already active. A pool is
    /// never resized once active.
    pub fn init(&mut self, total: u32) -> Result<(), TicketPoolError> {
        if self.active {
            return Err(TicketPoolError::AlreadyActive { total: self.total });
        }
        if total == 0 {
            return Err(TicketPoolError::ZeroCapacity);
        }

        self.semaphore.add_permits(total as usize);
        self.total = total;
        self.active = true;

        debug!(total, "Ticket pool initialized");
        Ok(())
    }

    /// Take one ticket, waiting until one is available.
    pub async fn take(&self) {
        match self.semaphore.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => unreachable!("ticket semaphore is never closed"),
        }
        self.taken.fetch_add(1, Ordering::AcqRel);
    }

    /// Give one ticket back, waking a waiter if there is one.
    ///
    /// Returning a ticket that was never taken is a caller bug and is
    /// rejected rather than growing the pool past `total`.
    pub fn return_ticket(&self) -> Result<(), TicketPoolError> {
        self.taken
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| t.checked_sub(1))
            .map_err(|_| TicketPoolError::Overfilled { total: self.total })?;
        self.semaphore.add_permits(1);
        Ok(())
    }

    /// Take a ticket wrapped in a guard that returns it on drop.
    pub async fn acquire(self: &Arc<Self>) -> Ticket {
        self.take().await;
        Ticket {
            pool: Arc::clone(self),
        }
    }

    /// Whether the pool has been initialized.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Total number of tickets.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Tickets currently available.
    pub fn remaining(&self) -> u32 {
        self.semaphore.available_permits() as u32
    }
}

impl std::fmt::Debug for TicketPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketPool")
            .field("total", &self.total)
            .field("remaining", &self.remaining())
            .field("active", &self.active)
            .finish()
    }
}

/// A ticket taken from a [`TicketPool`]. Returned to the pool on drop.
#[must_use = "dropping a ticket returns it to the pool immediately"]
#[derive(Debug)]
pub struct Ticket {
    pool: Arc<TicketPool>,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if let Err(e) = self.pool.return_ticket() {
            error!(error = %e, "Failed to return ticket");
        }
    }
}
