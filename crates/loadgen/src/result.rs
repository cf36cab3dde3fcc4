//! Call outcomes delivered on the result sink.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::caller::{RawReq, RawResp};

/// Outcome classification of a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum RetCode {
    Success = 0,
    /// The call did not return within the configured timeout.
    WarningCallTimeout = 1001,
    /// Transport-level failure.
    ErrorCall = 2001,
    /// Malformed or incorrect response content.
    ErrorResponse = 2002,
    /// The callee reported an application error.
    ErrorCallee = 2003,
    /// Invalid request or a panic inside the call task.
    FatalCall = 3001,
}

impl RetCode {
    /// All codes, in numeric order.
    pub const ALL: [RetCode; 6] = [
        RetCode::Success,
        RetCode::WarningCallTimeout,
        RetCode::ErrorCall,
        RetCode::ErrorResponse,
        RetCode::ErrorCallee,
        RetCode::FatalCall,
    ];

    /// Numeric value of the code.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Look up a code by its numeric value.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Human-readable description.
    pub fn plain(self) -> &'static str {
        match self {
            RetCode::Success => "Success",
            RetCode::WarningCallTimeout => "Call Timeout Warning",
            RetCode::ErrorCall => "Call Error",
            RetCode::ErrorResponse => "Response Error",
            RetCode::ErrorCallee => "Callee Error",
            RetCode::FatalCall => "Call Fatal Error",
        }
    }

    /// Description for a raw numeric code, including unknown ones.
    pub fn plain_for(code: u32) -> &'static str {
        Self::from_code(code)
            .map(RetCode::plain)
            .unwrap_or("Unknown result code")
    }

    /// True for anything other than [`RetCode::Success`].
    pub fn is_failure(self) -> bool {
        self != RetCode::Success
    }
}

impl fmt::Display for RetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.plain(), self.code())
    }
}

/// The result of one dispatched call.
#[derive(Debug, Clone)]
pub struct CallResult {
    /// Request identifier, or -1 when the call task failed before one existed.
    pub id: i64,
    pub req: Option<RawReq>,
    pub resp: Option<RawResp>,
    pub code: RetCode,
    pub msg: String,
    /// Time spent in the call as measured by the generator.
    pub elapsed: Duration,
}

impl CallResult {
    /// Create a result without request/response attached.
    pub fn new(id: i64, code: RetCode, msg: impl Into<String>) -> Self {
        Self {
            id,
            req: None,
            resp: None,
            code,
            msg: msg.into(),
            elapsed: Duration::ZERO,
        }
    }

    /// Attach the originating request.
    pub fn with_req(mut self, req: RawReq) -> Self {
        self.req = Some(req);
        self
    }

    /// Attach the received response.
    pub fn with_resp(mut self, resp: RawResp) -> Self {
        self.resp = Some(resp);
        self
    }

    /// Set the elapsed time.
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }
}

impl fmt::Display for CallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID={}, Code={}, Msg={}, Elapsed={:?}",
            self.id,
            self.code.code(),
            self.msg,
            self.elapsed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(RetCode::Success.plain(), "Success");
        assert_eq!(RetCode::WarningCallTimeout.plain(), "Call Timeout Warning");
        assert_eq!(RetCode::ErrorCallee.plain(), "Callee Error");
        assert_eq!(RetCode::plain_for(2002), "Response Error");
        assert_eq!(RetCode::plain_for(9999), "Unknown result code");
    }

    #[test]
    fn test_code_lookup() {
        for code in RetCode::ALL {
            assert_eq!(RetCode::from_code(code.code()), Some(code));
        }
        assert_eq!(RetCode::FatalCall.code(), 3001);
        assert_eq!(RetCode::from_code(1), None);
    }

    #[test]
    fn test_result_display() {
        let result = CallResult::new(7, RetCode::ErrorCall, "refused")
            .with_elapsed(Duration::from_millis(3));
        assert_eq!(result.to_string(), "ID=7, Code=2001, Msg=refused, Elapsed=3ms");
        assert!(result.code.is_failure());
    }
}
