//! Load testing harness built on the `loadgen` generator.
//!
//! This crate provides tools to:
//! - Serve and call a small TCP arithmetic protocol as a load target
//! - Describe runs as YAML scenarios
//! - Tally result codes and latencies
//! - Output results in multiple formats (console, JSON, CSV)

pub mod calc;
pub mod config;
pub mod metrics;
pub mod report;
pub mod runner;

pub use calc::{TcpComm, TcpServer};
pub use config::ScenarioConfig;
pub use metrics::{ResultTally, RunInfo, TestResults};
pub use report::ResultsReport;
pub use runner::LoadRunner;
