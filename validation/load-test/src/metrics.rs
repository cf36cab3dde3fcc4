//! Result tallying and statistics.

use hdrhistogram::Histogram;
use loadgen::{CallResult, GeneratorStatus, RetCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Accumulates call results drained from the generator's sink.
pub struct ResultTally {
    histogram: Histogram<u64>,
    by_code: BTreeMap<RetCode, u64>,
    received: u64,
}

impl ResultTally {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            histogram: Histogram::new(3)?,
            by_code: BTreeMap::new(),
            received: 0,
        })
    }

    /// Record one result.
    pub fn record(&mut self, result: &CallResult) {
        self.received += 1;
        *self.by_code.entry(result.code).or_insert(0) += 1;
        let micros = u64::try_from(result.elapsed.as_micros()).unwrap_or(u64::MAX);
        self.histogram.record(micros).ok();
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn count(&self, code: RetCode) -> u64 {
        self.by_code.get(&code).copied().unwrap_or(0)
    }

    /// Generate final test results.
    ///
    /// `calls_dispatched` is the generator's call count and `wall_time` the
    /// time between start and the sink closing.
    pub fn results(&self, run: RunInfo, calls_dispatched: u64, wall_time: Duration) -> TestResults {
        let duration_secs = wall_time.as_secs_f64();
        let successes = self.count(RetCode::Success);
        let per_sec = |n: u64| {
            if duration_secs > 0.0 {
                n as f64 / duration_secs
            } else {
                0.0
            }
        };
        let success_rate = if self.received > 0 {
            successes as f64 / self.received as f64 * 100.0
        } else {
            0.0
        };
        let ms = |micros: u64| micros as f64 / 1000.0;

        TestResults {
            timestamp: chrono::Utc::now().to_rfc3339(),
            scenario_name: run.scenario_name,
            target: run.target,
            loads_per_second: run.loads_per_second,
            concurrency: run.concurrency,
            final_status: run.final_status,
            duration_secs,
            calls_dispatched,
            results_received: self.received,
            results_dropped: calls_dispatched.saturating_sub(self.received),
            successful_calls: successes,
            success_rate,
            calls_per_second: per_sec(calls_dispatched),
            treatments_per_second: per_sec(successes),
            latency_p50: ms(self.histogram.value_at_percentile(50.0)),
            latency_p90: ms(self.histogram.value_at_percentile(90.0)),
            latency_p99: ms(self.histogram.value_at_percentile(99.0)),
            latency_min: ms(self.histogram.min()),
            latency_max: ms(self.histogram.max()),
            latency_avg: self.histogram.mean() / 1000.0,
            codes: self
                .by_code
                .iter()
                .map(|(code, count)| CodeCount {
                    kind: *code,
                    code: code.code(),
                    name: code.plain().to_string(),
                    count: *count,
                })
                .collect(),
        }
    }
}

/// Facts about the run that the tally cannot observe.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub scenario_name: String,
    pub target: String,
    pub loads_per_second: u32,
    pub concurrency: u32,
    pub final_status: GeneratorStatus,
}

/// Number of results that carried one code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeCount {
    pub kind: RetCode,
    pub code: u32,
    pub name: String,
    pub count: u64,
}

/// Final test results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResults {
    pub timestamp: String,
    pub scenario_name: String,
    pub target: String,
    pub loads_per_second: u32,
    pub concurrency: u32,
    /// Generator status once the sink closed
    pub final_status: GeneratorStatus,
    pub duration_secs: f64,

    pub calls_dispatched: u64,
    pub results_received: u64,
    /// Dispatched calls whose result never reached the sink
    pub results_dropped: u64,
    pub successful_calls: u64,
    pub success_rate: f64,
    pub calls_per_second: f64,
    pub treatments_per_second: f64,

    // Latency (ms)
    pub latency_p50: f64,
    pub latency_p90: f64,
    pub latency_p99: f64,
    pub latency_min: f64,
    pub latency_max: f64,
    pub latency_avg: f64,

    pub codes: Vec<CodeCount>,
}
