//! Load test orchestration.

use crate::calc::{TcpComm, TcpServer};
use crate::config::ScenarioConfig;
use crate::metrics::{ResultTally, RunInfo, TestResults};
use loadgen::{Generator, ParamSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, info_span, warn};

/// Drives one generator run against an arithmetic server.
pub struct LoadRunner {
    config: ScenarioConfig,
}

impl LoadRunner {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Run the load test until the generator closes its result sink.
    pub async fn run(&self) -> anyhow::Result<TestResults> {
        self.config.validate()?;

        // Embedded server when no target was given
        let server = match &self.config.target {
            Some(_) => None,
            None => Some(TcpServer::bind("127.0.0.1:0").await?),
        };
        let target = match (&self.config.target, &server) {
            (Some(addr), _) => addr.clone(),
            (None, Some(server)) => server.local_addr().to_string(),
            (None, None) => anyhow::bail!("no target to load"),
        };

        let (tx, mut rx) = mpsc::channel(self.config.result_buffer);
        let params = ParamSet::new(Arc::new(TcpComm::new(target.clone())), tx)
            .timeout(self.config.timeout())
            .loads_per_second(self.config.loads_per_second)
            .duration(self.config.duration())
            .span(info_span!("load_generator", scenario = %self.config.name));
        let generator = Generator::new(params)?;

        info!(
            scenario = %self.config.name,
            %target,
            lps = self.config.loads_per_second,
            duration_secs = self.config.duration_secs,
            concurrency = generator.concurrency(),
            "Starting load test"
        );

        let started = Instant::now();
        if !generator.start() {
            anyhow::bail!("generator refused to start (status: {})", generator.status());
        }

        if let Some(secs) = self.config.stop_after_secs {
            let generator = generator.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
                if !generator.stop().await {
                    warn!(status = %generator.status(), "Early stop had no effect");
                }
            });
        }

        let mut tally = ResultTally::new()?;
        while let Some(result) = rx.recv().await {
            tally.record(&result);
        }
        let wall_time = started.elapsed();

        if let Some(server) = &server {
            server.close();
        }

        let results = tally.results(
            RunInfo {
                scenario_name: self.config.name.clone(),
                target,
                loads_per_second: self.config.loads_per_second,
                concurrency: generator.concurrency(),
                final_status: generator.status(),
            },
            generator.call_count(),
            wall_time,
        );
        info!(
            calls = results.calls_dispatched,
            received = results.results_received,
            status = %generator.status(),
            "Load test finished"
        );
        Ok(results)
    }
}
