//! Execution service enforcing the sandbox contract.
//!
//! [`ExecutionSandbox`] provisions one environment per command, races the
//! command against its deadline, and tears the environment down on every
//! exit path before returning. If the calling future is dropped mid-flight a
//! guard schedules the teardown on the current runtime instead.

use crate::sandbox::{
    domain::{
        CommandOutput, EnvironmentSpec, SandboxDomainError, SandboxHandle, SandboxId,
        SandboxLifecycle, SandboxRequest,
    },
    ports::SandboxRuntime,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{Instrument, error, info, info_span, warn};

/// Number of teardown attempts before giving up on an environment.
const RECLAIM_ATTEMPTS: u32 = 2;

/// Errors reported by the execution service.
///
/// A command that runs and exits non-zero is not an error.
#[derive(Debug, Clone, Error)]
pub enum SandboxError {
    /// The environment could not be provisioned.
    #[error("sandbox {id} could not be created: {reason}")]
    CreationFailed {
        /// Sandbox identifier.
        id: SandboxId,
        /// Runtime diagnostic.
        reason: String,
    },

    /// The command could not be run inside the environment.
    #[error("command in sandbox {id} failed to execute: {reason}")]
    ExecutionFailed {
        /// Sandbox identifier.
        id: SandboxId,
        /// Runtime diagnostic.
        reason: String,
    },

    /// The command did not finish before its deadline.
    #[error("command in sandbox {id} timed out after {}s", timeout.as_secs())]
    TimedOut {
        /// Sandbox identifier.
        id: SandboxId,
        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// The environment could not be torn down.
    #[error("sandbox {id} could not be reclaimed: {reason}")]
    ReclaimFailed {
        /// Sandbox identifier.
        id: SandboxId,
        /// Runtime diagnostic.
        reason: String,
    },

    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] SandboxDomainError),
}

impl SandboxError {
    /// Returns `true` when the command never finished.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Result type for sandbox executions.
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Final handle and result of one sandbox execution.
#[derive(Debug, Clone)]
pub struct SandboxOutcome {
    handle: SandboxHandle,
    result: SandboxResult<CommandOutput>,
}

impl SandboxOutcome {
    /// Returns the environment handle in its final state.
    #[must_use]
    pub const fn handle(&self) -> &SandboxHandle {
        &self.handle
    }

    /// Returns the command result.
    #[must_use]
    pub const fn result(&self) -> &SandboxResult<CommandOutput> {
        &self.result
    }

    /// Consumes the outcome, returning the command result.
    ///
    /// # Errors
    ///
    /// Returns the [`SandboxError`] recorded for the execution.
    pub fn into_result(self) -> SandboxResult<CommandOutput> {
        self.result
    }
}

/// Runs commands in isolated, resource-bounded environments.
pub struct ExecutionSandbox<R>
where
    R: SandboxRuntime + 'static,
{
    runtime: Arc<R>,
    image: String,
}

impl<R> Clone for ExecutionSandbox<R>
where
    R: SandboxRuntime + 'static,
{
    fn clone(&self) -> Self {
        Self {
            runtime: Arc::clone(&self.runtime),
            image: self.image.clone(),
        }
    }
}

impl<R> ExecutionSandbox<R>
where
    R: SandboxRuntime + 'static,
{
    /// Creates an execution service that provisions environments from
    /// `image`.
    #[must_use]
    pub fn new(runtime: Arc<R>, image: impl Into<String>) -> Self {
        Self {
            runtime,
            image: image.into(),
        }
    }

    /// Returns the image environments are provisioned from.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Runs the request and returns only the command result.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::TimedOut`] when the deadline passes,
    /// [`SandboxError::CreationFailed`] or [`SandboxError::ExecutionFailed`]
    /// for infrastructure failures, and [`SandboxError::ReclaimFailed`] when
    /// teardown fails after a successful run.
    pub async fn run(&self, request: &SandboxRequest) -> SandboxResult<CommandOutput> {
        self.execute(request).await.into_result()
    }

    /// Runs the request and returns the final handle alongside the result.
    ///
    /// The returned handle is always `reclaimed` unless every teardown
    /// attempt failed, in which case the result is an error.
    pub async fn execute(&self, request: &SandboxRequest) -> SandboxOutcome {
        let id = SandboxId::new();
        let span = info_span!("sandbox", sandbox_id = %id);
        self.execute_with_id(id, request).instrument(span).await
    }

    async fn execute_with_id(&self, id: SandboxId, request: &SandboxRequest) -> SandboxOutcome {
        let mut handle = SandboxHandle::new(id, request.command());
        let mut guard = ReclaimGuard::new(Arc::clone(&self.runtime), id);

        let execution = self.drive(&mut handle, request).await;
        let reclaimed = self.reclaim(&mut handle).await;
        if reclaimed.is_ok() {
            guard.disarm();
        }

        let result = match (execution, reclaimed) {
            (Ok(_), Err(reclaim_error)) => Err(reclaim_error),
            (execution_result, _) => execution_result,
        };

        match &result {
            Ok(output) => info!(exit_code = output.exit_code(), "sandbox command finished"),
            Err(err) if err.is_timeout() => warn!(error = %err, "sandbox command timed out"),
            Err(err) => warn!(error = %err, "sandbox command failed"),
        }
        SandboxOutcome { handle, result }
    }

    async fn drive(
        &self,
        handle: &mut SandboxHandle,
        request: &SandboxRequest,
    ) -> SandboxResult<CommandOutput> {
        let id = handle.id();
        let spec = EnvironmentSpec {
            image: self.image.clone(),
            working_dir: request.working_dir().to_path_buf(),
            limits: request.limits(),
        };

        if let Err(err) = self.runtime.create(id, &spec).await {
            handle.transition_to(SandboxLifecycle::Errored)?;
            return Err(SandboxError::CreationFailed {
                id,
                reason: err.to_string(),
            });
        }
        handle.transition_to(SandboxLifecycle::Running)?;

        match tokio::time::timeout(request.timeout(), self.runtime.exec(id, request.command()))
            .await
        {
            Ok(Ok(output)) => {
                handle.transition_to(SandboxLifecycle::Exited)?;
                Ok(output)
            }
            Ok(Err(err)) => {
                handle.transition_to(SandboxLifecycle::Errored)?;
                Err(SandboxError::ExecutionFailed {
                    id,
                    reason: err.to_string(),
                })
            }
            Err(_elapsed) => {
                handle.transition_to(SandboxLifecycle::TimedOut)?;
                Err(SandboxError::TimedOut {
                    id,
                    timeout: request.timeout(),
                })
            }
        }
    }

    async fn reclaim(&self, handle: &mut SandboxHandle) -> SandboxResult<()> {
        let id = handle.id();
        if !handle.state().is_finished() {
            handle.transition_to(SandboxLifecycle::Errored)?;
        }

        let mut last_error = String::new();
        for attempt in 1..=RECLAIM_ATTEMPTS {
            match self.runtime.destroy(id).await {
                Ok(()) => {
                    handle.transition_to(SandboxLifecycle::Reclaimed)?;
                    return Ok(());
                }
                Err(err) => {
                    warn!(attempt, error = %err, "sandbox teardown attempt failed");
                    last_error = err.to_string();
                }
            }
        }
        Err(SandboxError::ReclaimFailed {
            id,
            reason: last_error,
        })
    }
}

/// Schedules teardown when an execution is abandoned before reclaiming its
/// environment.
struct ReclaimGuard<R>
where
    R: SandboxRuntime + 'static,
{
    runtime: Arc<R>,
    id: SandboxId,
    armed: bool,
}

impl<R> ReclaimGuard<R>
where
    R: SandboxRuntime + 'static,
{
    const fn new(runtime: Arc<R>, id: SandboxId) -> Self {
        Self {
            runtime,
            id,
            armed: true,
        }
    }

    const fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<R> Drop for ReclaimGuard<R>
where
    R: SandboxRuntime + 'static,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let id = self.id;
        let Ok(runtime_handle) = tokio::runtime::Handle::try_current() else {
            error!(sandbox_id = %id, "no async runtime available to reclaim sandbox");
            return;
        };
        warn!(sandbox_id = %id, "sandbox execution abandoned, scheduling teardown");
        let runtime = Arc::clone(&self.runtime);
        drop(runtime_handle.spawn(async move {
            if let Err(err) = runtime.destroy(id).await {
                error!(sandbox_id = %id, error = %err, "deferred sandbox teardown failed");
            }
        }));
    }
}
