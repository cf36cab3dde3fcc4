//! Common test utilities for generator tests
//!
//! Provides a configurable stub [`Caller`] that can:
//! - Succeed or fail after an artificial delay
//! - Panic inside the call
//! - Report a chosen result code from validation
//! - Track how many calls are in flight at once

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use loadgen::{CallError, CallResult, Caller, RawReq, RawResp, RetCode};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

/// What the stub does once its delay has passed.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Return a response; validation reports the given code.
    Respond(RetCode),
    /// Fail at the transport level.
    Refuse,
    /// Panic inside the call.
    Panic,
}

pub struct StubCaller {
    delay: Duration,
    behavior: Behavior,
    next_id: AtomicI64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls_started: AtomicUsize,
}

impl StubCaller {
    pub fn new(delay: Duration, behavior: Behavior) -> Self {
        Self {
            delay,
            behavior,
            next_id: AtomicI64::new(1),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls_started: AtomicUsize::new(0),
        }
    }

    /// Always succeeds after `delay`.
    pub fn succeeding(delay: Duration) -> Self {
        Self::new(delay, Behavior::Respond(RetCode::Success))
    }

    /// Highest number of concurrent calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn calls_started(&self) -> usize {
        self.calls_started.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight gauge even if the call future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Caller for StubCaller {
    fn build_request(&self) -> RawReq {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        RawReq::new(id, Bytes::from(id.to_string()))
    }

    async fn call(&self, payload: &Bytes, _timeout: Duration) -> Result<Bytes, CallError> {
        self.calls_started.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        tokio::time::sleep(self.delay).await;

        match self.behavior {
            Behavior::Respond(_) => Ok(payload.clone()),
            Behavior::Refuse => Err(CallError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            Behavior::Panic => panic!("stub caller exploded"),
        }
    }

    fn check_response(&self, req: &RawReq, resp: &RawResp) -> CallResult {
        let code = match self.behavior {
            Behavior::Respond(code) => code,
            _ => RetCode::Success,
        };
        if resp.payload != req.payload {
            return CallResult::new(req.id, RetCode::ErrorResponse, "echo mismatch")
                .with_req(req.clone())
                .with_resp(resp.clone());
        }
        // Elapsed left at zero on purpose; the generator fills it in.
        CallResult::new(req.id, code, code.plain())
            .with_req(req.clone())
            .with_resp(resp.clone())
    }
}

/// Drain a result receiver until the generator closes it.
pub async fn collect(mut rx: tokio::sync::mpsc::Receiver<CallResult>) -> Vec<CallResult> {
    let mut results = Vec::new();
    while let Some(result) = rx.recv().await {
        results.push(result);
    }
    results
}
