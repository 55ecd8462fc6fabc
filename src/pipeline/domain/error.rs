//! Error types for pipeline domain validation and parsing.

use super::{RunId, RunStatus, Stage};
use thiserror::Error;

/// Errors returned while constructing or advancing pipeline domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineDomainError {
    /// The repository name does not follow `owner/repo` format.
    #[error("invalid repository name '{0}', expected owner/repo")]
    InvalidRepository(String),

    /// The branch name is empty or contains whitespace.
    #[error("invalid branch name '{0}'")]
    InvalidBranchName(String),

    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTaskTitle,

    /// The task prompt is empty after trimming.
    #[error("task prompt must not be empty")]
    EmptyTaskPrompt,

    /// A progress value exceeds 100.
    #[error("progress {0} is outside 0..=100")]
    ProgressOutOfRange(u8),

    /// The stage graph has no such edge.
    #[error(
        "run {run_id} cannot move from stage {} to {to}",
        from.map_or("start", Stage::as_str)
    )]
    InvalidStageTransition {
        /// Run identifier.
        run_id: RunId,
        /// Current stage, absent before the first stage.
        from: Option<Stage>,
        /// Requested stage.
        to: Stage,
    },

    /// The status lifecycle has no such edge.
    #[error("run {run_id} cannot move from status {from} to {to}")]
    InvalidStatusTransition {
        /// Run identifier.
        run_id: RunId,
        /// Current status.
        from: RunStatus,
        /// Requested status.
        to: RunStatus,
    },

    /// The run is completed or failed and can no longer change.
    #[error("run {0} is terminal and cannot change")]
    RunTerminal(RunId),

    /// Recording another retry would exceed the configured maximum.
    #[error("run {run_id} has used all {limit} iteration(s)")]
    RetryLimitExceeded {
        /// Run identifier.
        run_id: RunId,
        /// Configured maximum.
        limit: u32,
    },

    /// A failed run needs a human-readable cause.
    #[error("failure message must not be empty")]
    EmptyErrorMessage,
}

/// Error returned while parsing a stage name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown stage: {0}")]
pub struct ParseStageError(pub String);

/// Error returned while parsing an agent kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown agent kind: {0}")]
pub struct ParseAgentKindError(pub String);

/// Error returned while parsing a run status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown run status: {0}")]
pub struct ParseRunStatusError(pub String);
