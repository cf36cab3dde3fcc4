//! Generator parameters and their validation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, Span};

use crate::caller::Caller;
use crate::error::{LoadGenError, Result};
use crate::result::CallResult;

/// Everything a generator needs. Validated once by [`ParamSet::check`].
#[derive(Clone)]
pub struct ParamSet {
    pub caller: Option<Arc<dyn Caller>>,
    /// Per-call timeout.
    pub timeout: Duration,
    /// Target loads per second.
    pub loads_per_second: u32,
    /// How long a run lasts unless stopped earlier.
    pub duration: Duration,
    /// Where results go. Closed by the generator when a run ends.
    pub result_sink: Option<mpsc::Sender<CallResult>>,
    /// Span the generator and its tasks log under.
    pub span: Span,
}

impl Default for ParamSet {
    fn default() -> Self {
        Self {
            caller: None,
            timeout: Duration::ZERO,
            loads_per_second: 0,
            duration: Duration::ZERO,
            result_sink: None,
            span: Span::none(),
        }
    }
}

impl ParamSet {
    /// Start from a caller and a sink; the rest must still be filled in.
    pub fn new(caller: Arc<dyn Caller>, result_sink: mpsc::Sender<CallResult>) -> Self {
        Self {
            caller: Some(caller),
            result_sink: Some(result_sink),
            ..Self::default()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn loads_per_second(mut self, lps: u32) -> Self {
        self.loads_per_second = lps;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Check every field, reporting all violations at once.
    pub fn check(&self) -> Result<()> {
        let mut errors: Vec<&str> = Vec::new();
        if self.caller.is_none() {
            errors.push("Invalid caller!");
        }
        if self.timeout.is_zero() {
            errors.push("Invalid timeout!");
        }
        if self.loads_per_second == 0 {
            errors.push("Invalid lps (loads per second)!");
        }
        if self.duration.is_zero() {
            errors.push("Invalid duration!");
        }
        if self.result_sink.is_none() {
            errors.push("Invalid result sink!");
        }

        if !errors.is_empty() {
            let msg = errors.join(" ");
            info!(errors = %msg, "Checking the parameters... NOT passed");
            return Err(LoadGenError::invalid_params(msg));
        }

        debug!(
            timeout = ?self.timeout,
            lps = self.loads_per_second,
            duration = ?self.duration,
            "Checking the parameters... passed"
        );
        Ok(())
    }
}

impl fmt::Debug for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamSet")
            .field("caller", &self.caller.as_ref().map(|_| "<caller>"))
            .field("timeout", &self.timeout)
            .field("loads_per_second", &self.loads_per_second)
            .field("duration", &self.duration)
            .field(
                "result_sink_capacity",
                &self.result_sink.as_ref().map(|s| s.max_capacity()),
            )
            .finish()
    }
}
