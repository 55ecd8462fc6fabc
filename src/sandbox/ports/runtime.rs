//! Runtime port for provisioning and tearing down isolated environments.

use crate::sandbox::domain::{CommandOutput, EnvironmentSpec, SandboxId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for sandbox runtime operations.
pub type SandboxRuntimeResult<T> = Result<T, SandboxRuntimeError>;

/// Low-level control over isolated environments.
///
/// The execution service owns sequencing and cleanup; runtimes only perform
/// the individual steps.
#[async_trait]
pub trait SandboxRuntime: Send + Sync {
    /// Provisions and starts an environment named after `id`.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxRuntimeError::Unavailable`] when the runtime cannot be
    /// reached, or [`SandboxRuntimeError::Runtime`] for other failures.
    async fn create(&self, id: SandboxId, spec: &EnvironmentSpec) -> SandboxRuntimeResult<()>;

    /// Runs `command` through a shell inside the environment and waits for it.
    ///
    /// A non-zero exit is returned as a normal [`CommandOutput`].
    ///
    /// # Errors
    ///
    /// Returns [`SandboxRuntimeError::NotFound`] when the environment does not
    /// exist, or [`SandboxRuntimeError::Runtime`] when the command could not be
    /// started.
    async fn exec(&self, id: SandboxId, command: &str) -> SandboxRuntimeResult<CommandOutput>;

    /// Forcibly terminates anything running and removes the environment.
    ///
    /// Destroying an environment that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxRuntimeError`] when the runtime refuses the removal.
    async fn destroy(&self, id: SandboxId) -> SandboxRuntimeResult<()>;
}

/// Errors returned by sandbox runtime adapters.
#[derive(Debug, Clone, Error)]
pub enum SandboxRuntimeError {
    /// The runtime infrastructure is unavailable.
    #[error("sandbox runtime unavailable: {0}")]
    Unavailable(String),

    /// The environment does not exist.
    #[error("sandbox environment not found: {0}")]
    NotFound(SandboxId),

    /// Generic runtime failure.
    #[error("sandbox runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl SandboxRuntimeError {
    /// Wraps a runtime error from the adapter.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}
