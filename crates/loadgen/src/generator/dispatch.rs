//! Per-call task: ticket, timeout race, result emission.

use bytes::Bytes;
use std::any::Any;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, Instrument, Span};

use super::race::{Outcome, RaceFlag};
use super::Inner;
use crate::caller::{RawReq, RawResp};
use crate::lifecycle::GeneratorStatus;
use crate::result::{CallResult, RetCode};

impl Inner {
    /// Count one call and hand it to its own task. Never blocks the loop.
    pub(super) fn dispatch(self: &Arc<Self>, cancel: &CancellationToken) {
        self.call_count.fetch_add(1, Ordering::AcqRel);
        let inner = Arc::clone(self);
        tokio::spawn(
            inner
                .supervise_call(cancel.clone())
                .instrument(self.span.clone()),
        );
    }

    /// Hold a ticket for the whole call and turn a panicking call task into
    /// a fatal result.
    ///
    /// A call still waiting for its ticket when the run ends never reaches
    /// the target.
    async fn supervise_call(self: Arc<Self>, cancel: CancellationToken) {
        let _ticket = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Dropped queued call, run is over");
                return;
            }
            ticket = self.tickets.acquire() => ticket,
        };
        if cancel.is_cancelled() || self.status.load() != GeneratorStatus::Started {
            debug!("Dropped queued call, run is over");
            return;
        }

        let flag = Arc::new(RaceFlag::new());

        let call = tokio::spawn(
            Arc::clone(&self)
                .call_one(Arc::clone(&flag))
                .instrument(Span::current()),
        );

        if let Err(e) = call.await {
            let msg = if e.is_panic() {
                format!("Async call panic! (error: {})", panic_message(e.into_panic()))
            } else {
                format!("Async call aborted! (error: {e})")
            };
            error!(error = %msg, race = ?flag.outcome(), "Call task failed");

            // A timeout that already fired has reported this call.
            if flag.resolve(Outcome::Completed) {
                self.send_result(CallResult::new(-1, RetCode::FatalCall, msg));
            }
        }
    }

    async fn call_one(self: Arc<Self>, flag: Arc<RaceFlag>) {
        let req = self.caller.build_request();

        let timer = tokio::spawn(
            Arc::clone(&self)
                .expire(req.clone(), Arc::clone(&flag))
                .instrument(Span::current()),
        );

        let start = Instant::now();
        let outcome = self.caller.call(&req.payload, self.timeout).await;
        let elapsed = start.elapsed();

        if !flag.resolve(Outcome::Completed) {
            debug!(id = req.id, ?elapsed, "Call returned after its timeout fired");
            return;
        }
        timer.abort();

        let result = match outcome {
            Err(e) => {
                let msg = format!("Sync call error: {e}.");
                let resp = RawResp {
                    id: req.id,
                    payload: Bytes::new(),
                    err: Some(msg.clone()),
                    elapsed,
                };
                CallResult::new(req.id, RetCode::ErrorCall, msg)
                    .with_req(req)
                    .with_resp(resp)
                    .with_elapsed(elapsed)
            }
            Ok(payload) => {
                let resp = RawResp {
                    id: req.id,
                    payload,
                    err: None,
                    elapsed,
                };
                let mut result = self.caller.check_response(&req, &resp);
                result.elapsed = elapsed;
                result
            }
        };
        self.send_result(result);
    }

    /// Timer side of the race.
    async fn expire(self: Arc<Self>, req: RawReq, flag: Arc<RaceFlag>) {
        sleep(self.timeout).await;
        if !flag.resolve(Outcome::TimedOut) {
            return;
        }

        let result = CallResult::new(
            req.id,
            RetCode::WarningCallTimeout,
            format!("Timeout! (expected: < {:?})", self.timeout),
        )
        .with_req(req)
        .with_elapsed(self.timeout);
        self.send_result(result);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
