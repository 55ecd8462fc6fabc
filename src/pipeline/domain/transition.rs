//! Explicit `(stage, signal) -> transition` table.
//!
//! Every decision the workflow makes at a stage boundary comes from
//! [`TransitionTable`], so the graph can be tested without running agents.

use super::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a stage reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// The stage succeeded and its result passed.
    Passed,
    /// The stage failed, errored, or its result did not pass.
    Failed,
}

/// Failed test iterations used so far against the configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetryBudget {
    used: u32,
    limit: u32,
}

impl RetryBudget {
    /// Creates a budget.
    #[must_use]
    pub const fn new(used: u32, limit: u32) -> Self {
        Self { used, limit }
    }

    /// Returns iterations used before the current failure.
    #[must_use]
    pub const fn used(self) -> u32 {
        self.used
    }

    /// Returns the configured maximum.
    #[must_use]
    pub const fn limit(self) -> u32 {
        self.limit
    }

    /// Returns `true` if one more failure still leaves room for a retry.
    ///
    /// The failure that brings the counter to `limit` is fatal.
    #[must_use]
    pub const fn allows_retry(self) -> bool {
        self.used.saturating_add(1) < self.limit
    }
}

/// Why a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Tests kept failing until the iteration budget ran out.
    IterationLimit,
    /// The security gate reported findings.
    SecurityFindings,
    /// Any other stage failed.
    StageFailed(Stage),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IterationLimit => f.write_str("max iterations reached, tests still failing"),
            Self::SecurityFindings => f.write_str("security scan failed"),
            Self::StageFailed(stage) => write!(f, "{stage} stage failed"),
        }
    }
}

/// Next step chosen at a stage boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Move to the given stage.
    Advance(Stage),
    /// Return to coding and count one failed iteration.
    Retry,
    /// Stop and wait for an external decision.
    Suspend,
    /// Pause the run until re-approval.
    Pause,
    /// Finish successfully.
    Complete,
    /// Finish with a fatal cause.
    Fail(FailureReason),
    /// The stage is terminal; nothing follows.
    Halt,
}

/// The workflow graph as data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionTable;

impl TransitionTable {
    /// Returns the transition out of `stage` for `signal`.
    #[must_use]
    pub const fn next(stage: Stage, signal: Signal, budget: RetryBudget) -> Transition {
        match (stage, signal) {
            (Stage::Research, Signal::Passed) => Transition::Advance(Stage::Context),
            (Stage::Context, Signal::Passed) => Transition::Advance(Stage::Coding),
            (Stage::Coding, Signal::Passed) => Transition::Advance(Stage::Testing),
            (Stage::Testing, Signal::Passed) => Transition::Advance(Stage::Security),
            (Stage::Testing, Signal::Failed) => {
                if budget.allows_retry() {
                    Transition::Retry
                } else {
                    Transition::Fail(FailureReason::IterationLimit)
                }
            }
            (Stage::Security, Signal::Passed) => Transition::Advance(Stage::Approval),
            (Stage::Security, Signal::Failed) => Transition::Fail(FailureReason::SecurityFindings),
            (Stage::Approval, _) => Transition::Suspend,
            (Stage::Submission, Signal::Passed) => Transition::Complete,
            (
                stage @ (Stage::Research | Stage::Context | Stage::Coding | Stage::Submission),
                Signal::Failed,
            ) => Transition::Fail(FailureReason::StageFailed(stage)),
            (Stage::Done | Stage::Failed, _) => Transition::Halt,
        }
    }

    /// Returns the transition out of `approval` for a human decision.
    #[must_use]
    pub const fn decide(approved: bool) -> Transition {
        if approved {
            Transition::Advance(Stage::Submission)
        } else {
            Transition::Pause
        }
    }
}
