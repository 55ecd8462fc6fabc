//! Engine configuration read from `GROPIUS_*` environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::pipeline::services::{DEFAULT_MAX_ITERATIONS, RetryPolicy};
use crate::sandbox::domain::ResourceLimits;

/// Default wall-clock bound on one test run, in seconds.
pub const DEFAULT_TEST_TIMEOUT_SECS: u64 = 600;
/// Default sandbox image.
pub const DEFAULT_SANDBOX_IMAGE: &str = "python:3.11-slim";
/// Default sandbox memory ceiling in mebibytes.
pub const DEFAULT_MEMORY_LIMIT_MB: u64 = 512;

const MAX_ITERATIONS_KEY: &str = "GROPIUS_MAX_ITERATIONS";
const TEST_TIMEOUT_KEY: &str = "GROPIUS_TEST_TIMEOUT_SECS";
const AUTO_APPROVE_KEY: &str = "GROPIUS_AUTO_APPROVE";
const SANDBOX_IMAGE_KEY: &str = "GROPIUS_SANDBOX_IMAGE";
const SANDBOX_MEMORY_KEY: &str = "GROPIUS_SANDBOX_MEMORY_MB";
const SANDBOX_NETWORK_KEY: &str = "GROPIUS_SANDBOX_NETWORK";
const DOCKER_BINARY_KEY: &str = "GROPIUS_DOCKER_BIN";
const LOG_FILTER_KEY: &str = "GROPIUS_LOG";

/// Errors raised while reading configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable holds a value that cannot be used.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Sandbox settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Image environments are started from.
    pub image: String,
    /// Memory ceiling in mebibytes; `None` leaves it to the runtime.
    pub memory_limit_mb: Option<u64>,
    /// Whether test commands may reach the network.
    pub network_enabled: bool,
    /// Docker CLI to invoke.
    pub docker_binary: String,
}

impl SandboxConfig {
    /// Returns the limits applied to every test environment.
    #[must_use]
    pub const fn limits(&self) -> ResourceLimits {
        ResourceLimits::new(self.memory_limit_mb).with_network(self.network_enabled)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_SANDBOX_IMAGE.to_owned(),
            memory_limit_mb: Some(DEFAULT_MEMORY_LIMIT_MB),
            network_enabled: false,
            docker_binary: "docker".to_owned(),
        }
    }
}

/// Top-level engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bound on failed test iterations.
    pub max_iterations: u32,
    /// Wall-clock bound on one test run.
    #[serde(with = "duration_secs")]
    pub test_timeout: Duration,
    /// Skip the human approval gate.
    pub auto_approve: bool,
    /// Sandbox settings.
    pub sandbox: SandboxConfig,
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            test_timeout: Duration::from_secs(DEFAULT_TEST_TIMEOUT_SECS),
            auto_approve: false,
            sandbox: SandboxConfig::default(),
            log_filter: "info".to_owned(),
        }
    }
}

impl PipelineConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unparseable or out-of-range
    /// values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, falling back to defaults for
    /// unset keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unparseable or out-of-range
    /// values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_ITERATIONS_KEY) {
            config.max_iterations = parse_number(MAX_ITERATIONS_KEY, &raw)?;
        }
        if let Some(raw) = lookup(TEST_TIMEOUT_KEY) {
            config.test_timeout = Duration::from_secs(parse_number(TEST_TIMEOUT_KEY, &raw)?);
        }
        if let Some(raw) = lookup(AUTO_APPROVE_KEY) {
            config.auto_approve = parse_flag(AUTO_APPROVE_KEY, &raw)?;
        }
        if let Some(raw) = lookup(SANDBOX_IMAGE_KEY) {
            config.sandbox.image = non_blank(SANDBOX_IMAGE_KEY, &raw)?;
        }
        if let Some(raw) = lookup(SANDBOX_MEMORY_KEY) {
            let memory: u64 = parse_number(SANDBOX_MEMORY_KEY, &raw)?;
            config.sandbox.memory_limit_mb = (memory > 0).then_some(memory);
        }
        if let Some(raw) = lookup(SANDBOX_NETWORK_KEY) {
            config.sandbox.network_enabled = parse_flag(SANDBOX_NETWORK_KEY, &raw)?;
        }
        if let Some(raw) = lookup(DOCKER_BINARY_KEY) {
            config.sandbox.docker_binary = non_blank(DOCKER_BINARY_KEY, &raw)?;
        }
        if let Some(raw) = lookup(LOG_FILTER_KEY) {
            config.log_filter = non_blank(LOG_FILTER_KEY, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Returns the retry policy for the testing loop.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_iterations)
    }

    /// Checks the bounds that defaults cannot violate but overrides can.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `max_iterations` or
    /// `test_timeout` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(invalid(MAX_ITERATIONS_KEY, "0", "must be at least 1"));
        }
        if self.test_timeout.is_zero() {
            return Err(invalid(TEST_TIMEOUT_KEY, "0", "must be at least 1 second"));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_owned(),
        reason: reason.into(),
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|err: T::Err| invalid(key, raw, err.to_string()))
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, raw, "expected a boolean")),
    }
}

fn non_blank(key: &'static str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid(key, raw, "must not be blank"));
    }
    Ok(trimmed.to_owned())
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
