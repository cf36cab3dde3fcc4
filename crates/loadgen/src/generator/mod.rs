//! The load generator.
//!
//! A [`Generator`] fires calls at a fixed rate for a fixed duration and
//! streams one [`CallResult`] per call into the result sink.
//!
//! ## Run loop
//!
//! Each iteration checks for cancellation, dispatches one call as its own
//! task, then waits for the next throttle tick. Cancellation is therefore
//! noticed within one call interval. When the loop ends it cancels the run
//! token, so calls still queued for a ticket are dropped without reaching
//! the target.
//!
//! ## Calls
//!
//! A call task holds a ticket from the pool for its whole life, so the number
//! of outstanding calls is bounded by the pool size:
//!
//! ```text
//! concurrency = ceil(timeout / call_interval) + 1
//! ```
//!
//! Inside the task, a timer races the caller. Whichever settles the race
//! flag first reports the call; the other side does nothing.
//!
//! ## Result delivery
//!
//! Results are only delivered while the generator is `Started`, and never
//! block: if the sink is full the result is dropped and logged. Delivery and
//! closing the sink take the same lock, so nothing is sent after close.

mod dispatch;
mod race;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument, Span};

use crate::caller::Caller;
use crate::error::{LoadGenError, Result};
use crate::lifecycle::{GeneratorStatus, StatusCell};
use crate::params::ParamSet;
use crate::result::CallResult;
use crate::tickets::TicketPool;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Stand-in deadline for durations too long to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Handle to a load generator. Cheap to clone; clones share one generator.
#[derive(Clone)]
pub struct Generator {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    caller: Arc<dyn Caller>,
    timeout: Duration,
    lps: u32,
    duration: Duration,
    concurrency: u32,
    tickets: Arc<TicketPool>,
    status: StatusCell,
    call_count: AtomicU64,
    sink: Mutex<Option<mpsc::Sender<CallResult>>>,
    run: Mutex<Option<Run>>,
    span: Span,
}

/// The current run's cancellation handle and loop task.
struct Run {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopCause {
    Cancelled,
    DeadlineExceeded,
}

impl std::fmt::Display for StopCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopCause::Cancelled => f.write_str("cancelled"),
            StopCause::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

impl Generator {
    /// Validate `params` and build a stopped generator.
    ///
    /// Fails with every parameter violation at once, or if the computed
    /// concurrency can not back a ticket pool.
    pub fn new(params: ParamSet) -> Result<Self> {
        let span = params.span.clone();
        span.in_scope(|| Self::build(params))
    }

    fn build(params: ParamSet) -> Result<Self> {
        info!("New a load generator...");
        params.check()?;

        let ParamSet {
            caller,
            timeout,
            loads_per_second,
            duration,
            result_sink,
            span,
        } = params;
        let (Some(caller), Some(sink)) = (caller, result_sink) else {
            return Err(LoadGenError::invalid_params("missing caller or result sink"));
        };

        let concurrency = concurrency_for(timeout, loads_per_second);
        let tickets = TicketPool::new(concurrency)?;
        info!(concurrency, "Initialized the load generator");

        Ok(Self {
            inner: Arc::new(Inner {
                caller,
                timeout,
                lps: loads_per_second,
                duration,
                concurrency,
                tickets: Arc::new(tickets),
                status: StatusCell::new(),
                call_count: AtomicU64::new(0),
                sink: Mutex::new(Some(sink)),
                run: Mutex::new(None),
                span,
            }),
        })
    }

    /// Start a run. Returns false if the generator is already running.
    ///
    /// The run proceeds in the background; this does not wait for it.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let inner = &self.inner;
        let _entered = inner.span.enter();
        info!("Starting load generator...");

        if !inner
            .status
            .transition(GeneratorStatus::Original, GeneratorStatus::Starting)
            && !inner
                .status
                .transition(GeneratorStatus::Stopped, GeneratorStatus::Starting)
        {
            warn!(status = %inner.status.load(), "Load generator can not be started");
            return false;
        }

        let throttle = call_interval(inner.lps);
        match throttle {
            Some(interval) => info!(?interval, "Setting throttle"),
            None => info!("No throttle, dispatching as fast as possible"),
        }

        let cancel = CancellationToken::new();
        let now = Instant::now();
        let deadline = now
            .checked_add(inner.duration)
            .unwrap_or_else(|| now + FAR_FUTURE);
        inner.call_count.store(0, Ordering::Release);

        // Held until the run is recorded so stop() always finds it.
        let mut run = lock(&inner.run);
        inner
            .status
            .transition(GeneratorStatus::Starting, GeneratorStatus::Started);
        let handle = tokio::spawn(
            Arc::clone(inner)
                .generate(cancel.clone(), deadline, throttle)
                .instrument(inner.span.clone()),
        );
        *run = Some(Run { cancel, handle });
        true
    }

    /// Stop the current run and wait until it has fully stopped.
    ///
    /// Returns false if the generator was not running. In-flight calls are
    /// left to finish on their own; their results are dropped.
    pub async fn stop(&self) -> bool {
        let inner = &self.inner;
        if !inner
            .status
            .transition(GeneratorStatus::Started, GeneratorStatus::Stopping)
        {
            return false;
        }

        let run = lock(&inner.run).take();
        match run {
            Some(Run { cancel, handle }) => {
                cancel.cancel();
                if let Err(e) = handle.await {
                    error!(parent: &inner.span, error = %e, "Load generation task failed");
                    inner.prepare_to_stop(StopCause::Cancelled);
                }
            }
            None => inner.prepare_to_stop(StopCause::Cancelled),
        }
        true
    }

    /// Install a new result sink for the next run.
    ///
    /// Only allowed while the generator is not running; a finished run has
    /// closed its sink.
    pub fn replace_sink(&self, sink: mpsc::Sender<CallResult>) -> bool {
        let mut slot = lock(&self.inner.sink);
        match self.inner.status.load() {
            GeneratorStatus::Original | GeneratorStatus::Stopped => {
                *slot = Some(sink);
                true
            }
            _ => false,
        }
    }

    pub fn status(&self) -> GeneratorStatus {
        self.inner.status.load()
    }

    /// Calls dispatched in the current (or last) run.
    pub fn call_count(&self) -> u64 {
        self.inner.call_count.load(Ordering::Acquire)
    }

    /// Maximum number of calls in flight at once.
    pub fn concurrency(&self) -> u32 {
        self.inner.concurrency
    }

    /// Tickets not currently held by a call.
    pub fn remaining_tickets(&self) -> u32 {
        self.inner.tickets.remaining()
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    pub fn loads_per_second(&self) -> u32 {
        self.inner.lps
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("status", &self.status())
            .field("call_count", &self.call_count())
            .field("concurrency", &self.inner.concurrency)
            .field("timeout", &self.inner.timeout)
            .field("lps", &self.inner.lps)
            .field("duration", &self.inner.duration)
            .finish()
    }
}

impl Inner {
    async fn generate(
        self: Arc<Self>,
        cancel: CancellationToken,
        deadline: Instant,
        throttle: Option<Duration>,
    ) {
        info!("Generating loads...");

        let mut ticker = throttle.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });
        let expiry = sleep_until(deadline);
        tokio::pin!(expiry);

        loop {
            if cancel.is_cancelled() {
                self.prepare_to_stop(StopCause::Cancelled);
                break;
            }
            if Instant::now() >= deadline {
                self.prepare_to_stop(StopCause::DeadlineExceeded);
                break;
            }

            self.dispatch(&cancel);

            match ticker.as_mut() {
                Some(ticker) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            self.prepare_to_stop(StopCause::Cancelled);
                            break;
                        }
                        _ = &mut expiry => {
                            self.prepare_to_stop(StopCause::DeadlineExceeded);
                            break;
                        }
                        _ = ticker.tick() => {}
                    }
                }
                None => tokio::task::yield_now().await,
            }
        }

        // Release calls still queued for a ticket
        cancel.cancel();
        info!(call_count = self.call_count.load(Ordering::Acquire), "Stopped");
    }

    /// Close the sink and settle on `Stopped`.
    fn prepare_to_stop(&self, cause: StopCause) {
        info!(%cause, "Prepare to stop load generator...");
        let mut sink = lock(&self.sink);
        // Already Stopping when stop() initiated this.
        self.status
            .transition(GeneratorStatus::Started, GeneratorStatus::Stopping);
        if sink.take().is_some() {
            debug!("Closed result sink");
        }
        self.status
            .transition(GeneratorStatus::Stopping, GeneratorStatus::Stopped);
    }

    /// Hand a result to the sink without ever waiting on it.
    fn send_result(&self, result: CallResult) -> bool {
        let rejected = {
            let sink = lock(&self.sink);
            if self.status.load() != GeneratorStatus::Started {
                Some((result, "stopped generator"))
            } else {
                match sink.as_ref() {
                    None => Some((result, "closed result channel")),
                    Some(tx) => match tx.try_send(result) {
                        Ok(()) => None,
                        Err(TrySendError::Full(result)) => Some((result, "full result channel")),
                        Err(TrySendError::Closed(result)) => {
                            Some((result, "closed result channel"))
                        }
                    },
                }
            }
        };

        match rejected {
            None => true,
            Some((result, cause)) => {
                warn!(
                    id = result.id,
                    code = result.code.code(),
                    msg = %result.msg,
                    elapsed = ?result.elapsed,
                    cause,
                    "Ignored result"
                );
                false
            }
        }
    }
}

/// Spacing between dispatches, or None when the rate is unlimited.
fn call_interval(lps: u32) -> Option<Duration> {
    if lps == 0 {
        return None;
    }
    Some(Duration::from_nanos((NANOS_PER_SEC / lps as u64).max(1)))
}

/// Ticket pool size for the given timeout and rate, clamped to `i32::MAX`.
fn concurrency_for(timeout: Duration, lps: u32) -> u32 {
    let interval_ns = call_interval(lps).map_or(1, |d| d.as_nanos());
    let total = timeout.as_nanos().div_ceil(interval_ns) + 1;
    total.min(i32::MAX as u128) as u32
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
