//! Runs one stage agent per transition and applies the retry policy.

use crate::pipeline::{
    domain::{
        AgentKind, EventLevel, PipelineDomainError, PipelineState, RetryBudget, RunId, Signal,
        Stage, StageOutcome, StagePayload, StageReport, TaskRun,
    },
    ports::{StageAgentError, StageContext},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::AgentRoster;

/// Default bound on failed test iterations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// Errors signalled by the coordinator.
#[derive(Debug, Clone, Error)]
pub enum CoordinatorError {
    /// No agent is registered for the stage.
    #[error("no agent registered for the {0} stage")]
    AgentNotFound(AgentKind),

    /// The agent raised past its own boundary.
    #[error("{kind} agent failed: {source}")]
    AgentExecution {
        /// Agent that failed.
        kind: AgentKind,
        /// Underlying cause.
        #[source]
        source: StageAgentError,
    },

    /// The testing loop ran out of iterations.
    #[error("run {run_id} exceeded the maximum of {limit} test iterations")]
    MaxIterationsExceeded {
        /// Run identifier.
        run_id: RunId,
        /// Configured bound.
        limit: u32,
    },

    /// Domain validation failed.
    #[error(transparent)]
    Domain(PipelineDomainError),
}

/// Result type for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Bound on the testing to coding retry edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_iterations: u32,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_iterations` failed test runs.
    #[must_use]
    pub const fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }

    /// Returns the configured bound.
    #[must_use]
    pub const fn max_iterations(self) -> u32 {
        self.max_iterations
    }

    /// Returns the budget left after `used` failed iterations.
    #[must_use]
    pub const fn budget(self, used: u32) -> RetryBudget {
        RetryBudget::new(used, self.max_iterations)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

/// What one stage produced, reduced to what the transition table needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageVerdict {
    stage: Stage,
    signal: Signal,
    error: Option<String>,
}

impl StageVerdict {
    /// Returns the stage that ran.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Returns the signal for the transition table.
    #[must_use]
    pub const fn signal(&self) -> Signal {
        self.signal
    }

    /// Returns the failure description, if the stage failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Dispatches stages to agents and folds their reports into state.
pub struct StageCoordinator<C>
where
    C: Clock + Send + Sync,
{
    roster: AgentRoster,
    policy: RetryPolicy,
    clock: Arc<C>,
}

impl<C> StageCoordinator<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a coordinator.
    #[must_use]
    pub const fn new(roster: AgentRoster, policy: RetryPolicy, clock: Arc<C>) -> Self {
        Self {
            roster,
            policy,
            clock,
        }
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Returns the registered agents.
    #[must_use]
    pub const fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    /// Runs the agent for `stage` and merges its result into `state`.
    ///
    /// Agent errors and mismatched payloads become a failed verdict; they
    /// never escape as `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::AgentNotFound`] when `stage` has no agent
    /// kind or no agent is registered for it.
    pub async fn run_stage(
        &self,
        stage: Stage,
        state: &mut PipelineState,
    ) -> CoordinatorResult<StageVerdict> {
        let kind = stage.agent().ok_or_else(|| {
            CoordinatorError::Domain(PipelineDomainError::InvalidStageTransition {
                run_id: state.run_id(),
                from: Some(stage),
                to: stage,
            })
        })?;
        let agent = self.roster.get(kind)?;
        let context = StageContext::for_agent(kind, state);

        let report = match agent.execute(&context).await {
            Ok(report) => check_payload(kind, report),
            Err(source) => {
                let err = CoordinatorError::AgentExecution { kind, source };
                warn!(run_id = %state.run_id(), error = %err, "stage agent raised an error");
                StageReport::failure(err.to_string())
            }
        };

        let (outcome, payload, error) = report.into_parts();
        let passes = payload.as_ref().is_none_or(payload_passes);
        if let Some(result) = payload {
            state.merge(result);
        }

        let verdict = if outcome == StageOutcome::Success && passes {
            StageVerdict {
                stage,
                signal: Signal::Passed,
                error: None,
            }
        } else {
            StageVerdict {
                stage,
                signal: Signal::Failed,
                error: Some(error.unwrap_or_else(|| format!("{kind} result did not pass"))),
            }
        };
        self.record(state, &verdict);
        debug!(run_id = %state.run_id(), %stage, signal = ?verdict.signal, "stage finished");
        Ok(verdict)
    }

    /// Counts one failed test iteration on both the run and its state.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::MaxIterationsExceeded`] when the counter
    /// is already at the bound.
    pub fn record_retry(
        &self,
        run: &mut TaskRun,
        state: &mut PipelineState,
    ) -> CoordinatorResult<u32> {
        let limit = self.policy.max_iterations();
        let count = run
            .record_retry(limit, &*self.clock)
            .map_err(|err| match err {
                PipelineDomainError::RetryLimitExceeded { run_id, limit } => {
                    CoordinatorError::MaxIterationsExceeded { run_id, limit }
                }
                other => CoordinatorError::Domain(other),
            })?;
        state.set_retry_count(count);
        Ok(count)
    }

    fn record(&self, state: &mut PipelineState, verdict: &StageVerdict) {
        let (level, message) = match verdict.error() {
            None => (EventLevel::Info, format!("{} stage passed", verdict.stage)),
            Some(error) => (
                EventLevel::Warning,
                format!("{} stage failed: {error}", verdict.stage),
            ),
        };
        state.record_event(verdict.stage, level, message, self.clock.utc());
    }
}

/// Recovers the verdict of an already-merged stage from its audit log.
///
/// Returns `None` when the state holds no event for `stage`.
#[must_use]
pub fn recorded_verdict(state: &PipelineState, stage: Stage) -> Option<StageVerdict> {
    let event = state.events().iter().rev().find(|event| event.stage == stage)?;
    let verdict = match event.level {
        EventLevel::Info => StageVerdict {
            stage,
            signal: Signal::Passed,
            error: None,
        },
        EventLevel::Warning | EventLevel::Error => StageVerdict {
            stage,
            signal: Signal::Failed,
            error: Some(failure_detail(&event.message, stage)),
        },
    };
    Some(verdict)
}

fn failure_detail(message: &str, stage: Stage) -> String {
    let prefix = format!("{stage} stage failed: ");
    message.strip_prefix(&prefix).unwrap_or(message).to_owned()
}

fn check_payload(kind: AgentKind, report: StageReport) -> StageReport {
    match report.payload() {
        Some(payload) if payload.kind() != kind => {
            StageReport::failure(format!("{kind} agent returned a {} result", payload.kind()))
        }
        _ => report,
    }
}

fn payload_passes(payload: &StagePayload) -> bool {
    match payload {
        StagePayload::Testing(report) => report.passed(),
        StagePayload::Security(report) => report.passed(),
        StagePayload::Research(_)
        | StagePayload::Context(_)
        | StagePayload::Coding(_)
        | StagePayload::Submission(_) => true,
    }
}
