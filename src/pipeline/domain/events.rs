//! Progress notifications and approval decisions.

use super::{Progress, RunId, RunStatus, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `{run_id, stage, progress, status}` emitted at every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Run identifier.
    pub run_id: RunId,
    /// Stage after the transition.
    pub stage: Option<Stage>,
    /// Progress after the transition.
    pub progress: Progress,
    /// Status after the transition.
    pub status: RunStatus,
    /// Whether the run waits for a human decision.
    pub approval_required: bool,
    /// When the event was emitted.
    pub emitted_at: DateTime<Utc>,
}

/// A human verdict on a run waiting at the approval gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    run_id: RunId,
    approved: bool,
    comments: Option<String>,
}

impl ApprovalDecision {
    /// An approving decision.
    #[must_use]
    pub const fn approve(run_id: RunId) -> Self {
        Self {
            run_id,
            approved: true,
            comments: None,
        }
    }

    /// A rejecting decision.
    #[must_use]
    pub const fn reject(run_id: RunId) -> Self {
        Self {
            run_id,
            approved: false,
            comments: None,
        }
    }

    /// Attaches reviewer comments.
    #[must_use]
    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// Returns the run the decision is for.
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Returns `true` for approval.
    #[must_use]
    pub const fn approved(&self) -> bool {
        self.approved
    }

    /// Returns the reviewer comments.
    #[must_use]
    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }
}
