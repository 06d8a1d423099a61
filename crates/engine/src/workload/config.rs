//! Workload settings via `fsmload.toml`
//!
//! The numeric knobs of a run (worker count, iteration budget, seed, retry
//! policy) can live in a TOML file next to the test harness, so they can be
//! changed without recompiling. States and transitions are code and stay in
//! the [`WorkloadBuilder`](super::WorkloadBuilder).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use fsmload_core::{Error, Result, RetryConfig};

use crate::context::Targeting;

/// Conventional settings file name.
pub const CONFIG_FILE_NAME: &str = "fsmload.toml";

/// Retry policy section (`[retry]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum attempts per retried command (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Deadline for a retried command in milliseconds (default: 30000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Base backoff delay in milliseconds (default: 10)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff cap in milliseconds (default: 1000)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_base_delay_ms() -> u64 {
    10
}

fn default_max_delay_ms() -> u64 {
    1_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            timeout_ms: default_timeout_ms(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig::new()
            .with_max_attempts(settings.max_attempts)
            .with_timeout(Duration::from_millis(settings.timeout_ms))
            .with_base_delay(Duration::from_millis(settings.base_delay_ms))
            .with_max_delay(Duration::from_millis(settings.max_delay_ms))
    }
}

/// Run settings loaded from `fsmload.toml`.
///
/// # Example
///
/// ```toml
/// thread_count = 12
/// iterations = 1000
/// # seed = 42
///
/// [retry]
/// max_attempts = 5
/// timeout_ms = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSettings {
    /// Concurrent workers (default: 4)
    #[serde(default = "default_thread_count")]
    pub thread_count: usize,
    /// Iterations per worker (default: 100)
    #[serde(default = "default_iterations")]
    pub iterations: u64,
    /// Fixed seed for reproducible sampling; random when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Target identifier assignment; builder default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targeting: Option<Targeting>,
    /// Retry policy for `ActionContext::retry`
    #[serde(default)]
    pub retry: RetrySettings,
}

fn default_thread_count() -> usize {
    4
}

fn default_iterations() -> u64 {
    100
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            thread_count: default_thread_count(),
            iterations: default_iterations(),
            seed: None,
            targeting: None,
            retry: RetrySettings::default(),
        }
    }
}

impl WorkloadSettings {
    /// Returns the default settings file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# fsmload workload settings
#
# Number of concurrent workers (default: 4)
thread_count = 4

# Iterations each worker performs (default: 100)
iterations = 100

# Fixed seed for reproducible transition sampling.
# Leave unset for a fresh random seed; the seed used is printed in the report.
# seed = 42

# Target identifier assignment (default: per-worker with prefix "fsmload_")
# [targeting]
# mode = "shared"
# name = "coll"

# Retry policy used by actions that retry commands
[retry]
max_attempts = 3
timeout_ms = 30000
base_delay_ms = 10
max_delay_ms = 1000
"#
    }

    /// Parse settings from TOML text and validate them.
    ///
    /// # Errors
    ///
    /// `Error::ConfigParse` for malformed TOML, `Error::Configuration` for
    /// values out of range.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::parse(content, "<inline>")
    }

    /// Read, parse and validate settings from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, &path.display().to_string())
    }

    fn parse(content: &str, origin: &str) -> Result<Self> {
        let settings: WorkloadSettings =
            toml::from_str(content).map_err(|e| Error::ConfigParse {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the values describe a runnable workload.
    pub fn validate(&self) -> Result<()> {
        if self.thread_count == 0 {
            return Err(Error::configuration("thread_count must be positive"));
        }
        if self.iterations == 0 {
            return Err(Error::configuration("iterations must be positive"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(Error::configuration(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }
        Ok(())
    }

    /// Retry policy described by the `[retry]` section
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::from(&self.retry)
    }

    /// Write the default settings file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize these settings to TOML and write them to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::configuration(format!("Failed to serialize settings: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
