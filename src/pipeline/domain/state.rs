//! The working context threaded through every stage of a run.

use super::{
    AgentKind, BranchName, CodeChanges, CredentialsHandle, PipelineDomainError,
    RepositoryContext, RepositoryFullName, ResearchFindings, RunId, SecurityReport, Stage,
    StagePayload, SubmissionReceipt, TestReport,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The task a run executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBrief {
    title: String,
    description: Option<String>,
    prompt: String,
}

impl TaskBrief {
    /// Creates a validated brief.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineDomainError::EmptyTaskTitle`] or
    /// [`PipelineDomainError::EmptyTaskPrompt`] for blank values.
    pub fn new(
        title: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Result<Self, PipelineDomainError> {
        let raw_title = title.into();
        let raw_prompt = prompt.into();
        if raw_title.trim().is_empty() {
            return Err(PipelineDomainError::EmptyTaskTitle);
        }
        if raw_prompt.trim().is_empty() {
            return Err(PipelineDomainError::EmptyTaskPrompt);
        }
        Ok(Self {
            title: raw_title.trim().to_owned(),
            description: None,
            prompt: raw_prompt.trim().to_owned(),
        })
    }

    /// Sets the longer description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the natural-language instruction.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// Identity of the target repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// `owner/repo` name.
    pub full_name: RepositoryFullName,
    /// Branch changes are based on.
    pub default_branch: BranchName,
}

/// Severity of a stage event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    /// Routine progress.
    Info,
    /// Recoverable problem.
    Warning,
    /// Fatal problem.
    Error,
}

/// One entry of the run's audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEvent {
    /// Stage the event belongs to.
    pub stage: Stage,
    /// Severity.
    pub level: EventLevel,
    /// Human-readable text.
    pub message: String,
    /// When it was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Mutable record owned by exactly one run.
///
/// Each stage result is either absent or the latest result for that stage;
/// re-running a stage replaces its result wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    run_id: RunId,
    task: TaskBrief,
    repository: RepositoryInfo,
    credentials: CredentialsHandle,
    working_tree: Option<PathBuf>,
    research: Option<ResearchFindings>,
    context: Option<RepositoryContext>,
    code: Option<CodeChanges>,
    tests: Option<TestReport>,
    security: Option<SecurityReport>,
    submission: Option<SubmissionReceipt>,
    events: Vec<StageEvent>,
    retry_count: u32,
    approval_required: bool,
    approved: bool,
    approval_comments: Option<String>,
}

impl PipelineState {
    /// Creates the initial state for a run.
    #[must_use]
    pub const fn new(
        run_id: RunId,
        task: TaskBrief,
        repository: RepositoryInfo,
        credentials: CredentialsHandle,
    ) -> Self {
        Self {
            run_id,
            task,
            repository,
            credentials,
            working_tree: None,
            research: None,
            context: None,
            code: None,
            tests: None,
            security: None,
            submission: None,
            events: Vec::new(),
            retry_count: 0,
            approval_required: false,
            approved: false,
            approval_comments: None,
        }
    }

    /// Sets the materialized working tree the run owns.
    #[must_use]
    pub fn with_working_tree(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_tree = Some(path.into());
        self
    }

    /// Returns the run identifier.
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        self.run_id
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

    /// Returns the opaque credentials handle.
    #[must_use]
    pub const fn credentials(&self) -> &CredentialsHandle {
        &self.credentials
    }

    /// Returns the materialized working tree, if any.
    #[must_use]
    pub fn working_tree(&self) -> Option<&Path> {
        self.working_tree.as_deref()
    }

    /// Returns the research result.
    #[must_use]
    pub const fn research(&self) -> Option<&ResearchFindings> {
        self.research.as_ref()
    }

    /// Returns the context result.
    #[must_use]
    pub const fn context(&self) -> Option<&RepositoryContext> {
        self.context.as_ref()
    }

    /// Returns the latest code changes.
    #[must_use]
    pub const fn code(&self) -> Option<&CodeChanges> {
        self.code.as_ref()
    }

    /// Returns the latest test report.
    #[must_use]
    pub const fn tests(&self) -> Option<&TestReport> {
        self.tests.as_ref()
    }

    /// Returns the security verdict.
    #[must_use]
    pub const fn security(&self) -> Option<&SecurityReport> {
        self.security.as_ref()
    }

    /// Returns the submission receipt.
    #[must_use]
    pub const fn submission(&self) -> Option<&SubmissionReceipt> {
        self.submission.as_ref()
    }

    /// Returns the audit log, oldest first.
    #[must_use]
    pub fn events(&self) -> &[StageEvent] {
        &self.events
    }

    /// Returns the failed test iteration count.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Returns `true` once the run has reached the approval gate.
    #[must_use]
    pub const fn approval_required(&self) -> bool {
        self.approval_required
    }

    /// Returns `true` once a human approved submission.
    #[must_use]
    pub const fn approved(&self) -> bool {
        self.approved
    }

    /// Returns the reviewer's latest comments.
    #[must_use]
    pub fn approval_comments(&self) -> Option<&str> {
        self.approval_comments.as_deref()
    }

    /// Returns `true` if a result is stored for `kind`.
    #[must_use]
    pub const fn has_result(&self, kind: AgentKind) -> bool {
        match kind {
            AgentKind::Research => self.research.is_some(),
            AgentKind::Context => self.context.is_some(),
            AgentKind::Coding => self.code.is_some(),
            AgentKind::Testing => self.tests.is_some(),
            AgentKind::Security => self.security.is_some(),
            AgentKind::Submission => self.submission.is_some(),
        }
    }

    /// Stores `payload` under its stage, replacing any earlier result.
    pub(crate) fn merge(&mut self, payload: StagePayload) {
        match payload {
            StagePayload::Research(findings) => self.research = Some(findings),
            StagePayload::Context(context) => self.context = Some(context),
            StagePayload::Coding(changes) => self.code = Some(changes),
            StagePayload::Testing(report) => self.tests = Some(report),
            StagePayload::Security(report) => self.security = Some(report),
            StagePayload::Submission(receipt) => self.submission = Some(receipt),
        }
    }

    pub(crate) fn record_event(
        &mut self,
        stage: Stage,
        level: EventLevel,
        message: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) {
        self.events.push(StageEvent {
            stage,
            level,
            message: message.into(),
            recorded_at,
        });
    }

    pub(crate) const fn set_retry_count(&mut self, retry_count: u32) {
        self.retry_count = retry_count;
    }

    pub(crate) const fn require_approval(&mut self) {
        self.approval_required = true;
    }

    pub(crate) fn record_decision(&mut self, approved: bool, comments: Option<String>) {
        self.approved = approved;
        self.approval_comments = comments;
    }
}
