//! Error types for sandbox domain validation.

use super::{SandboxId, SandboxLifecycle};
use thiserror::Error;

/// Errors returned while constructing or advancing sandbox domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SandboxDomainError {
    /// The command is empty after trimming.
    #[error("sandbox command must not be empty")]
    EmptyCommand,

    /// The timeout is zero.
    #[error("sandbox timeout must be greater than zero")]
    ZeroTimeout,

    /// The lifecycle transition is not permitted.
    #[error("sandbox {id} cannot move from {from} to {to}")]
    InvalidLifecycleTransition {
        /// Sandbox identifier.
        id: SandboxId,
        /// Current lifecycle state.
        from: SandboxLifecycle,
        /// Requested lifecycle state.
        to: SandboxLifecycle,
    },
}

/// Error returned while parsing a sandbox lifecycle state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown sandbox lifecycle state: {0}")]
pub struct ParseSandboxLifecycleError(pub String);
