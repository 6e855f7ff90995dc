//! Configuration for memofib.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::MemoFibResult;

/// Main configuration for memofib.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Evaluator settings.
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Evaluator settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Maximum number of batch tasks in flight (unbounded when absent).
    #[serde(default)]
    pub concurrency_limit: Option<usize>,

    /// Pause injected before each non-base computation (in milliseconds).
    #[serde(default)]
    pub simulated_delay_ms: u64,

    /// Deadline shared by every task of a batch (in milliseconds).
    #[serde(default)]
    pub batch_timeout_ms: Option<u64>,
}

impl EvaluatorConfig {
    /// Creates the default evaluator configuration (unbounded, no delay, no deadline).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the concurrency limit.
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit);
        self
    }

    /// Sets the simulated work delay.
    pub fn with_simulated_delay(mut self, delay: Duration) -> Self {
        self.simulated_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Sets the batch deadline.
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Simulated delay as a `Duration`.
    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }

    /// Batch deadline as a `Duration`, if any.
    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout_ms.map(Duration::from_millis)
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> MemoFibResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> MemoFibResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Creates default configuration.
    pub fn default_config() -> Self {
        Self {
            general: GeneralConfig::default(),
            evaluator: EvaluatorConfig::default(),
        }
    }

    /// Tries to load configuration from current directory or uses default.
    pub fn load_or_default() -> Self {
        Self::load("memofib.toml").unwrap_or_else(|_| Self::default_config())
    }

    /// Rejects values the evaluator cannot work with.
    pub fn validate(&self) -> MemoFibResult<()> {
        if self.evaluator.concurrency_limit == Some(0) {
            return Err(crate::MemoFibError::config(
                "evaluator.concurrency_limit must be at least 1",
            ));
        }
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(crate::MemoFibError::config(format!(
                "unknown log format '{}' (expected text or json)",
                self.general.log_format
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
