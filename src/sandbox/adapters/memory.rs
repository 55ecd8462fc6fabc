//! In-memory sandbox runtime for tests and deterministic local flows.

use crate::sandbox::{
    domain::{CommandOutput, EnvironmentSpec, SandboxId},
    ports::{SandboxRuntime, SandboxRuntimeError, SandboxRuntimeResult},
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Behaviour of a scripted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedCommand {
    /// The command completes with `output` after `delay`.
    Completes {
        /// Output returned by the command.
        output: CommandOutput,
        /// Simulated execution time.
        delay: Duration,
    },
    /// The command cannot be started.
    Fails(String),
    /// The command never finishes.
    Hangs,
}

impl ScriptedCommand {
    /// A command that finishes immediately with the given exit code and
    /// stdout.
    #[must_use]
    pub fn exits(exit_code: i32, stdout: impl Into<String>) -> Self {
        Self::Completes {
            output: CommandOutput::new(exit_code, stdout, ""),
            delay: Duration::ZERO,
        }
    }
}

/// Sandbox runtime that models environments without spawning processes.
///
/// Every created and destroyed environment is recorded so tests can assert
/// that nothing outlives the call that created it.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSandboxRuntime {
    state: Arc<RwLock<ScriptedState>>,
}

#[derive(Debug, Default)]
struct ScriptedState {
    scripts: HashMap<String, ScriptedCommand>,
    creation_failure: Option<String>,
    live: HashSet<SandboxId>,
    created: Vec<SandboxId>,
    destroyed: HashMap<SandboxId, u32>,
    executed: Vec<String>,
    specs: Vec<EnvironmentSpec>,
}

fn lock_error(err: impl ToString) -> SandboxRuntimeError {
    SandboxRuntimeError::runtime(std::io::Error::other(err.to_string()))
}

impl ScriptedSandboxRuntime {
    /// Creates a runtime where every command exits successfully.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the behaviour of `command`.
    ///
    /// # Errors
    ///
    /// Returns runtime errors when lock acquisition fails.
    pub fn script(
        &self,
        command: impl Into<String>,
        behaviour: ScriptedCommand,
    ) -> SandboxRuntimeResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.scripts.insert(command.into(), behaviour);
        Ok(())
    }

    /// Makes every subsequent environment creation fail with `reason`.
    ///
    /// # Errors
    ///
    /// Returns runtime errors when lock acquisition fails.
    pub fn fail_creation(&self, reason: impl Into<String>) -> SandboxRuntimeResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.creation_failure = Some(reason.into());
        Ok(())
    }

    /// Returns the number of environments that exist right now.
    #[must_use]
    pub fn live_environments(&self) -> usize {
        self.state.read().map(|state| state.live.len()).unwrap_or(0)
    }

    /// Returns every environment identifier passed to `create`, in order.
    #[must_use]
    pub fn created(&self) -> Vec<SandboxId> {
        self.state
            .read()
            .map(|state| state.created.clone())
            .unwrap_or_default()
    }

    /// Returns how many times `destroy` was called for `id`.
    #[must_use]
    pub fn destroy_count(&self, id: SandboxId) -> u32 {
        self.state
            .read()
            .map(|state| state.destroyed.get(&id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Returns every command passed to `exec`, in order.
    #[must_use]
    pub fn executed_commands(&self) -> Vec<String> {
        self.state
            .read()
            .map(|state| state.executed.clone())
            .unwrap_or_default()
    }

    /// Returns the specification of the most recently created environment.
    #[must_use]
    pub fn last_spec(&self) -> Option<EnvironmentSpec> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.specs.last().cloned())
    }
}

#[async_trait]
impl SandboxRuntime for ScriptedSandboxRuntime {
    async fn create(&self, id: SandboxId, spec: &EnvironmentSpec) -> SandboxRuntimeResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if let Some(reason) = state.creation_failure.clone() {
            return Err(SandboxRuntimeError::Unavailable(reason));
        }
        state.live.insert(id);
        state.created.push(id);
        state.specs.push(spec.clone());
        Ok(())
    }

    async fn exec(&self, id: SandboxId, command: &str) -> SandboxRuntimeResult<CommandOutput> {
        let behaviour = {
            let mut state = self.state.write().map_err(lock_error)?;
            if !state.live.contains(&id) {
                return Err(SandboxRuntimeError::NotFound(id));
            }
            state.executed.push(command.to_owned());
            state
                .scripts
                .get(command)
                .cloned()
                .unwrap_or_else(|| ScriptedCommand::exits(0, ""))
        };

        match behaviour {
            ScriptedCommand::Completes { output, delay } => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(output)
            }
            ScriptedCommand::Fails(reason) => {
                Err(SandboxRuntimeError::runtime(std::io::Error::other(reason)))
            }
            ScriptedCommand::Hangs => std::future::pending().await,
        }
    }

    async fn destroy(&self, id: SandboxId) -> SandboxRuntimeResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.live.remove(&id);
        *state.destroyed.entry(id).or_insert(0) += 1;
        Ok(())
    }
}
