//! Sandbox invocation requests and command outputs.

use super::SandboxDomainError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resource ceiling applied to one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    memory_limit_mb: Option<u64>,
    network_enabled: bool,
}

impl ResourceLimits {
    /// Creates limits with the given memory ceiling and network disabled.
    #[must_use]
    pub const fn new(memory_limit_mb: Option<u64>) -> Self {
        Self {
            memory_limit_mb,
            network_enabled: false,
        }
    }

    /// Enables or disables outbound network access.
    #[must_use]
    pub const fn with_network(mut self, enabled: bool) -> Self {
        self.network_enabled = enabled;
        self
    }

    /// Returns the memory ceiling in mebibytes, if any.
    #[must_use]
    pub const fn memory_limit_mb(&self) -> Option<u64> {
        self.memory_limit_mb
    }

    /// Returns whether outbound network access is permitted.
    #[must_use]
    pub const fn network_enabled(&self) -> bool {
        self.network_enabled
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::new(None)
    }
}

/// A single command to execute in a fresh environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRequest {
    command: String,
    working_dir: PathBuf,
    timeout: Duration,
    limits: ResourceLimits,
}

impl SandboxRequest {
    /// Creates a validated request with default resource limits.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxDomainError::EmptyCommand`] when the command is blank
    /// and [`SandboxDomainError::ZeroTimeout`] when the timeout is zero.
    pub fn new(
        command: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Result<Self, SandboxDomainError> {
        let raw = command.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SandboxDomainError::EmptyCommand);
        }
        if timeout.is_zero() {
            return Err(SandboxDomainError::ZeroTimeout);
        }
        Ok(Self {
            command: trimmed.to_owned(),
            working_dir: working_dir.into(),
            timeout,
            limits: ResourceLimits::default(),
        })
    }

    /// Replaces the resource limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Returns the command line.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns the host directory exposed to the command.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Returns the wall-clock bound.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the resource limits.
    #[must_use]
    pub const fn limits(&self) -> ResourceLimits {
        self.limits
    }
}

/// Everything a runtime needs to provision one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSpec {
    /// Image the environment is started from.
    pub image: String,
    /// Host directory mounted as the environment's working directory.
    pub working_dir: PathBuf,
    /// Resource ceiling.
    pub limits: ResourceLimits,
}

/// Result of a command that ran to completion.
///
/// A non-zero exit code is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    exit_code: i32,
    stdout: String,
    stderr: String,
}

impl CommandOutput {
    /// Creates a command output.
    #[must_use]
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Returns the process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Returns captured standard output.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Returns captured standard error.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Returns `true` when the command exited with status zero.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns stdout followed by stderr.
    #[must_use]
    pub fn combined(&self) -> String {
        let mut combined = String::with_capacity(self.stdout.len() + self.stderr.len());
        combined.push_str(&self.stdout);
        combined.push_str(&self.stderr);
        combined
    }
}
