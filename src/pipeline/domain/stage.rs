//! Pipeline stages and the agents that serve them.

use super::{ParseAgentKindError, ParseStageError, Progress};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One node of the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Gather background for the task.
    Research,
    /// Analyse the repository.
    Context,
    /// Generate code changes.
    Coding,
    /// Run the repository's test suite.
    Testing,
    /// Scan the working tree for credentials.
    Security,
    /// Wait for a human decision.
    Approval,
    /// Submit the change upstream.
    Submission,
    /// Terminal success.
    Done,
    /// Terminal failure.
    Failed,
}

impl Stage {
    /// Every stage in graph order, terminal states last.
    pub const ALL: [Self; 9] = [
        Self::Research,
        Self::Context,
        Self::Coding,
        Self::Testing,
        Self::Security,
        Self::Approval,
        Self::Submission,
        Self::Done,
        Self::Failed,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Context => "context",
            Self::Coding => "coding",
            Self::Testing => "testing",
            Self::Security => "security",
            Self::Approval => "approval",
            Self::Submission => "submission",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for `done` and `failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns whether the graph has an edge from this stage to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        if matches!(target, Self::Failed) {
            return !self.is_terminal();
        }
        matches!(
            (self, target),
            (Self::Research, Self::Context)
                | (Self::Context, Self::Coding)
                | (Self::Coding, Self::Testing)
                | (Self::Testing, Self::Coding | Self::Security)
                | (Self::Security, Self::Approval)
                | (Self::Approval, Self::Submission)
                | (Self::Submission, Self::Done)
        )
    }

    /// Returns the agent that executes this stage, if any.
    ///
    /// Approval is decided externally and the terminal stages run nothing.
    #[must_use]
    pub const fn agent(self) -> Option<AgentKind> {
        match self {
            Self::Research => Some(AgentKind::Research),
            Self::Context => Some(AgentKind::Context),
            Self::Coding => Some(AgentKind::Coding),
            Self::Testing => Some(AgentKind::Testing),
            Self::Security => Some(AgentKind::Security),
            Self::Submission => Some(AgentKind::Submission),
            Self::Approval | Self::Done | Self::Failed => None,
        }
    }

    /// Progress recorded once the stage has finished.
    ///
    /// Approval reports its milestone on entry because it suspends.
    #[must_use]
    pub const fn milestone(self) -> Progress {
        let percent = match self {
            Self::Research | Self::Context => 50,
            Self::Coding => 70,
            Self::Testing | Self::Security => 85,
            Self::Approval => 95,
            Self::Submission | Self::Done => 100,
            Self::Failed => 0,
        };
        Progress::saturating(percent)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Stage {
    type Error = ParseStageError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| ParseStageError(value.to_owned()))
    }
}

/// The closed set of stage agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Research agent.
    Research,
    /// Context agent.
    Context,
    /// Code-generation agent.
    Coding,
    /// Test-execution agent.
    Testing,
    /// Secret-scan agent.
    Security,
    /// Change-submission agent.
    Submission,
}

impl AgentKind {
    /// Every agent kind.
    pub const ALL: [Self; 6] = [
        Self::Research,
        Self::Context,
        Self::Coding,
        Self::Testing,
        Self::Security,
        Self::Submission,
    ];

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Context => "context",
            Self::Coding => "coding",
            Self::Testing => "testing",
            Self::Security => "security",
            Self::Submission => "submission",
        }
    }

    /// Returns the stage this agent serves.
    #[must_use]
    pub const fn stage(self) -> Stage {
        match self {
            Self::Research => Stage::Research,
            Self::Context => Stage::Context,
            Self::Coding => Stage::Coding,
            Self::Testing => Stage::Testing,
            Self::Security => Stage::Security,
            Self::Submission => Stage::Submission,
        }
    }

    /// Returns `true` for agents entitled to the materialized working tree.
    #[must_use]
    pub const fn needs_working_tree(self) -> bool {
        matches!(self, Self::Coding | Self::Testing | Self::Security)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AgentKind {
    type Error = ParseAgentKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseAgentKindError(value.to_owned()))
    }
}
