//! Stage agent port and the read-only context agents receive.

use crate::pipeline::domain::{
    AgentKind, CodeChanges, CredentialsHandle, PipelineState, RepositoryContext, RepositoryInfo,
    ResearchFindings, RunId, StageReport, TaskBrief, TestReport,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Owned, read-only view of a run handed to one agent invocation.
///
/// The working tree is only present for agents entitled to it.
#[derive(Debug, Clone)]
pub struct StageContext {
    run_id: RunId,
    kind: AgentKind,
    task: TaskBrief,
    repository: RepositoryInfo,
    credentials: CredentialsHandle,
    working_tree: Option<PathBuf>,
    iteration: u32,
    research: Option<ResearchFindings>,
    context: Option<RepositoryContext>,
    code: Option<CodeChanges>,
    previous_tests: Option<TestReport>,
}

impl StageContext {
    /// Assembles the context `kind` is entitled to from `state`.
    #[must_use]
    pub fn for_agent(kind: AgentKind, state: &PipelineState) -> Self {
        let working_tree = if kind.needs_working_tree() {
            state.working_tree().map(Path::to_path_buf)
        } else {
            None
        };
        Self {
            run_id: state.run_id(),
            kind,
            task: state.task().clone(),
            repository: state.repository().clone(),
            credentials: state.credentials().clone(),
            working_tree,
            iteration: state.retry_count(),
            research: state.research().cloned(),
            context: state.context().cloned(),
            code: state.code().cloned(),
            previous_tests: state.tests().cloned(),
        }
    }

    /// Returns the run identifier.
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Returns the agent kind the context was built for.
    #[must_use]
    pub const fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Returns the task brief.
    #[must_use]
    pub const fn task(&self) -> &TaskBrief {
        &self.task
    }

    /// Returns the repository identity.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryInfo {
        &self.repository
    }

    /// Returns the credentials handle for passing to collaborators.
    #[must_use]
    pub const fn credentials(&self) -> &CredentialsHandle {
        &self.credentials
    }

    /// Returns the working tree, if this agent may touch it.
    #[must_use]
    pub fn working_tree(&self) -> Option<&Path> {
        self.working_tree.as_deref()
    }

    /// Returns the number of failed test iterations so far.
    #[must_use]
    pub const fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Returns the research result.
    #[must_use]
    pub const fn research(&self) -> Option<&ResearchFindings> {
        self.research.as_ref()
    }

    /// Returns the repository context result.
    #[must_use]
    pub const fn context(&self) -> Option<&RepositoryContext> {
        self.context.as_ref()
    }

    /// Returns the latest code changes.
    #[must_use]
    pub const fn code(&self) -> Option<&CodeChanges> {
        self.code.as_ref()
    }

    /// Returns the test report from the previous iteration, if any.
    #[must_use]
    pub const fn previous_tests(&self) -> Option<&TestReport> {
        self.previous_tests.as_ref()
    }

    /// Returns the working tree or a [`StageAgentError::MissingWorkingTree`].
    ///
    /// # Errors
    ///
    /// Fails when no tree was materialized for the run.
    pub fn require_working_tree(&self) -> Result<&Path, StageAgentError> {
        self.working_tree()
            .ok_or(StageAgentError::MissingWorkingTree(self.kind))
    }
}

/// One pipeline stage implementation.
///
/// Agents should report failures as a failed [`StageReport`]; any `Err`
/// they return is converted into one by the coordinator.
#[async_trait]
pub trait StageAgent: Send + Sync {
    /// Returns the stage this agent serves.
    fn kind(&self) -> AgentKind;

    /// Runs the stage.
    ///
    /// # Errors
    ///
    /// Returns [`StageAgentError`] when the agent cannot produce a report.
    async fn execute(&self, context: &StageContext) -> Result<StageReport, StageAgentError>;
}

/// Errors an agent may raise past its own boundary.
#[derive(Debug, Clone, Error)]
pub enum StageAgentError {
    /// The agent needs a materialized working tree and none was provided.
    #[error("{0} agent requires a working tree")]
    MissingWorkingTree(AgentKind),

    /// A result from an earlier stage is missing.
    #[error("{kind} agent requires the {input} result")]
    MissingInput {
        /// Agent that needed it.
        kind: AgentKind,
        /// Name of the missing input.
        input: &'static str,
    },

    /// A collaborator (model, sandbox, filesystem) failed.
    #[error("collaborator error: {0}")]
    Collaborator(Arc<dyn std::error::Error + Send + Sync>),
}

impl StageAgentError {
    /// Wraps a collaborator error.
    pub fn collaborator(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Collaborator(Arc::new(err))
    }
}
