//! [`Caller`] implementation speaking the arithmetic protocol over TCP.

use async_trait::async_trait;
use bytes::Bytes;
use loadgen::{CallError, CallResult, Caller, RawReq, RawResp, RetCode};
use rand::Rng;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::{evaluate, formula, ServerReq, ServerResp, DELIM, OPERATORS};

/// Opens one connection per call to the server at `addr`.
#[derive(Debug)]
pub struct TcpComm {
    addr: String,
    next_id: AtomicI64,
}

impl TcpComm {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn exchange(&self, payload: &Bytes) -> Result<Bytes, CallError> {
        let mut stream = TcpStream::connect(&self.addr).await?;
        let mut frame = Vec::with_capacity(payload.len() + 1);
        frame.extend_from_slice(payload);
        frame.push(DELIM);
        stream.write_all(&frame).await?;

        let mut reader = BufReader::new(stream);
        let mut line = Vec::new();
        if reader.read_until(DELIM, &mut line).await? == 0 {
            return Err(CallError::protocol("connection closed before response"));
        }
        if line.last() == Some(&DELIM) {
            line.pop();
        }
        Ok(Bytes::from(line))
    }
}

#[async_trait]
impl Caller for TcpComm {
    fn build_request(&self) -> RawReq {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut rng = rand::thread_rng();
        let req = ServerReq {
            id,
            operands: vec![rng.gen_range(1..=1000), rng.gen_range(1..=1000)],
            operator: OPERATORS[rng.gen_range(0..OPERATORS.len())].to_string(),
        };
        // Serializing a struct of integers and a string cannot fail
        let payload = serde_json::to_vec(&req).unwrap_or_default();
        RawReq::new(id, payload)
    }

    async fn call(&self, payload: &Bytes, timeout: Duration) -> Result<Bytes, CallError> {
        match tokio::time::timeout(timeout, self.exchange(payload)).await {
            Ok(result) => result,
            Err(_) => Err(CallError::Timeout(timeout)),
        }
    }

    fn check_response(&self, raw_req: &RawReq, raw_resp: &RawResp) -> CallResult {
        let base = |code: RetCode, msg: String| {
            CallResult::new(raw_req.id, code, msg)
                .with_req(raw_req.clone())
                .with_resp(raw_resp.clone())
        };

        let req: ServerReq = match serde_json::from_slice(&raw_req.payload) {
            Ok(req) => req,
            Err(e) => return base(RetCode::FatalCall, format!("Incorrectly formatted Req: {e}")),
        };
        let resp: ServerResp = match serde_json::from_slice(&raw_resp.payload) {
            Ok(resp) => resp,
            Err(e) => {
                return base(
                    RetCode::ErrorResponse,
                    format!("Incorrectly formatted Resp: {e}"),
                )
            }
        };

        if resp.id != raw_req.id {
            return base(
                RetCode::ErrorResponse,
                format!(
                    "Inconsistent raw id! ({} != {})",
                    raw_req.id, resp.id
                ),
            );
        }
        if let Some(err) = resp.err {
            return base(RetCode::ErrorCallee, format!("Abnormal server: {err}"));
        }

        match evaluate(&req.operands, &req.operator) {
            Some(expected) if expected == resp.result => base(
                RetCode::Success,
                format!("Success. ({})", resp.formula),
            ),
            _ => base(
                RetCode::ErrorResponse,
                format!(
                    "Incorrect result: {}!",
                    formula(&req.operands, &req.operator, resp.result, false)
                ),
            ),
        }
    }
}
