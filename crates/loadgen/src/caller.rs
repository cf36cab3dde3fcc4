//! The protocol-specific side of a load test.
//!
//! The generator knows nothing about the target's wire format. A [`Caller`]
//! builds requests, performs one exchange with the target, and judges the
//! response.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::CallError;
use crate::result::CallResult;

/// A request ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReq {
    pub id: i64,
    pub payload: Bytes,
}

impl RawReq {
    pub fn new(id: i64, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }
}

/// What came back from one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResp {
    pub id: i64,
    pub payload: Bytes,
    /// Transport-level failure, set when the call broke down before a
    /// response could be validated.
    pub err: Option<String>,
    pub elapsed: Duration,
}

/// Protocol adapter driven by the generator.
///
/// Implementations are shared across every in-flight call, so they must be
/// cheap to call concurrently.
#[async_trait]
pub trait Caller: Send + Sync + 'static {
    /// Build the next request.
    fn build_request(&self) -> RawReq;

    /// Perform one exchange with the target.
    ///
    /// `timeout` is the generator's per-call timeout. The generator enforces
    /// it independently, so honouring it here only frees the ticket sooner.
    async fn call(&self, payload: &Bytes, timeout: Duration) -> Result<Bytes, CallError>;

    /// Turn a successfully received response into a result.
    ///
    /// The generator overwrites the returned `elapsed` with its own
    /// measurement.
    fn check_response(&self, req: &RawReq, resp: &RawResp) -> CallResult;
}
