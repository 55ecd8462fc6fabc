//! Lifecycle tracking for one isolated environment.

use super::{ParseSandboxLifecycleError, SandboxDomainError, SandboxId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an isolated environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxLifecycle {
    /// Environment requested; the runtime may or may not have provisioned it.
    Created,
    /// Command is executing.
    Running,
    /// Command ran to completion (any exit code).
    Exited,
    /// Command exceeded its deadline and was terminated.
    TimedOut,
    /// Provisioning or execution failed.
    Errored,
    /// Environment has been torn down.
    Reclaimed,
}

impl SandboxLifecycle {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Exited => "exited",
            Self::TimedOut => "timed_out",
            Self::Errored => "errored",
            Self::Reclaimed => "reclaimed",
        }
    }

    /// Returns `true` once the command has stopped, whatever the reason.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Exited | Self::TimedOut | Self::Errored)
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Running | Self::Errored)
                | (Self::Running, Self::Exited | Self::TimedOut | Self::Errored)
                | (
                    Self::Exited | Self::TimedOut | Self::Errored,
                    Self::Reclaimed
                )
        )
    }
}

impl fmt::Display for SandboxLifecycle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SandboxLifecycle {
    type Error = ParseSandboxLifecycleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(Self::Created),
            "running" => Ok(Self::Running),
            "exited" => Ok(Self::Exited),
            "timed_out" => Ok(Self::TimedOut),
            "errored" => Ok(Self::Errored),
            "reclaimed" => Ok(Self::Reclaimed),
            _ => Err(ParseSandboxLifecycleError(value.to_owned())),
        }
    }
}

/// One isolated environment, owned by the execution service for the
/// duration of a single command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxHandle {
    id: SandboxId,
    command: String,
    state: SandboxLifecycle,
    history: Vec<SandboxLifecycle>,
}

impl SandboxHandle {
    /// Creates a handle in the `created` state.
    #[must_use]
    pub fn new(id: SandboxId, command: impl Into<String>) -> Self {
        Self {
            id,
            command: command.into(),
            state: SandboxLifecycle::Created,
            history: vec![SandboxLifecycle::Created],
        }
    }

    /// Returns the sandbox identifier.
    #[must_use]
    pub const fn id(&self) -> SandboxId {
        self.id
    }

    /// Returns the command the environment was given.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SandboxLifecycle {
        self.state
    }

    /// Returns every state the handle has been in, oldest first.
    #[must_use]
    pub fn history(&self) -> &[SandboxLifecycle] {
        &self.history
    }

    /// Returns `true` once the environment has been torn down.
    #[must_use]
    pub fn is_reclaimed(&self) -> bool {
        self.state == SandboxLifecycle::Reclaimed
    }

    /// Moves the handle to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxDomainError::InvalidLifecycleTransition`] when the
    /// lifecycle does not permit the move.
    pub fn transition_to(&mut self, target: SandboxLifecycle) -> Result<(), SandboxDomainError> {
        if !self.state.can_transition_to(target) {
            return Err(SandboxDomainError::InvalidLifecycleTransition {
                id: self.id,
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        self.history.push(target);
        Ok(())
    }
}
