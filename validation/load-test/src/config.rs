//! Scenario configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Load test scenario loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Address of a running arithmetic server. When absent an embedded
    /// server is started on a free local port.
    #[serde(default)]
    pub target: Option<String>,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
    pub loads_per_second: u32,
    pub duration_secs: u64,
    /// Capacity of the result channel
    #[serde(default = "default_result_buffer")]
    pub result_buffer: usize,
    /// Stop the generator early after this many seconds
    #[serde(default)]
    pub stop_after_secs: Option<u64>,
}

fn default_result_buffer() -> usize {
    50
}

impl ScenarioConfig {
    /// Load configuration from YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScenarioConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Quick smoke-test scenario against an embedded server.
    pub fn quick(loads_per_second: u32, duration_secs: u64) -> Self {
        Self {
            name: "quick".to_string(),
            description: "Quick smoke test".to_string(),
            target: None,
            timeout_ms: 50,
            loads_per_second,
            duration_secs,
            result_buffer: default_result_buffer(),
            stop_after_secs: None,
        }
    }

    /// Validate configuration.
    ///
    /// Only checks what the generator itself does not; zero timeout, rate or
    /// duration are reported by the generator's own parameter check.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.result_buffer == 0 {
            anyhow::bail!("result_buffer must be > 0");
        }
        if let Some(stop_after) = self.stop_after_secs {
            if stop_after == 0 {
                anyhow::bail!("stop_after_secs must be > 0");
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}
