//! The structured result every stage agent returns.

use super::{
    AgentKind, CodeChanges, RepositoryContext, ResearchFindings, SecurityReport,
    SubmissionReceipt, TestReport,
};
use serde::{Deserialize, Serialize};

/// Whether a stage reported success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// The agent did its job.
    Success,
    /// The agent could not do its job.
    Failed,
}

/// Stage-specific payload carried by a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum StagePayload {
    /// Research notes.
    Research(ResearchFindings),
    /// Repository context.
    Context(RepositoryContext),
    /// Code changes.
    Coding(CodeChanges),
    /// Test results.
    Testing(TestReport),
    /// Security verdict.
    Security(SecurityReport),
    /// Submission receipt.
    Submission(SubmissionReceipt),
}

impl StagePayload {
    /// Returns the agent kind that produces this payload.
    #[must_use]
    pub const fn kind(&self) -> AgentKind {
        match self {
            Self::Research(_) => AgentKind::Research,
            Self::Context(_) => AgentKind::Context,
            Self::Coding(_) => AgentKind::Coding,
            Self::Testing(_) => AgentKind::Testing,
            Self::Security(_) => AgentKind::Security,
            Self::Submission(_) => AgentKind::Submission,
        }
    }
}

/// `{status, payload, error?}` returned by a stage agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    outcome: StageOutcome,
    payload: Option<StagePayload>,
    error: Option<String>,
}

impl StageReport {
    /// A successful report.
    #[must_use]
    pub const fn success(payload: StagePayload) -> Self {
        Self {
            outcome: StageOutcome::Success,
            payload: Some(payload),
            error: None,
        }
    }

    /// A failed report with no payload.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            outcome: StageOutcome::Failed,
            payload: None,
            error: Some(error.into()),
        }
    }

    /// A failed report that still carries partial results.
    #[must_use]
    pub fn failure_with(payload: StagePayload, error: impl Into<String>) -> Self {
        Self {
            outcome: StageOutcome::Failed,
            payload: Some(payload),
            error: Some(error.into()),
        }
    }

    /// Returns the reported outcome.
    #[must_use]
    pub const fn outcome(&self) -> StageOutcome {
        self.outcome
    }

    /// Returns `true` when the agent reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == StageOutcome::Success
    }

    /// Returns the payload, if any.
    #[must_use]
    pub const fn payload(&self) -> Option<&StagePayload> {
        self.payload.as_ref()
    }

    /// Returns the error text, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Splits the report into its payload and error.
    #[must_use]
    pub fn into_parts(self) -> (StageOutcome, Option<StagePayload>, Option<String>) {
        (self.outcome, self.payload, self.error)
    }
}
