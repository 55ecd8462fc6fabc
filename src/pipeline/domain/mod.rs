//! Domain model for the task orchestration engine.
//!
//! Holds the run aggregate, the per-run working state, stage results,
//! checkpoints and the transition table. Nothing here performs I/O.

mod checkpoint;
mod error;
mod events;
mod ids;
mod payload;
mod report;
mod run;
mod stage;
mod state;
mod transition;

pub use checkpoint::{Checkpoint, CheckpointPhase, PersistedCheckpointData, SnapshotError};
pub use error::{ParseAgentKindError, ParseRunStatusError, ParseStageError, PipelineDomainError};
pub use events::{ApprovalDecision, ProgressEvent};
pub use ids::{BranchName, CredentialsHandle, RepositoryFullName, RunId, TaskId, UserId};
pub use payload::{
    CodeChanges, FileChange, RepositoryContext, ResearchFindings, SecurityFinding,
    SecurityReport, Severity, SubmissionReceipt, TestReport,
};
pub use report::{StageOutcome, StagePayload, StageReport};
pub use run::{PersistedTaskRunData, Progress, RunStatus, TaskRun};
pub use stage::{AgentKind, Stage};
pub use state::{EventLevel, PipelineState, RepositoryInfo, StageEvent, TaskBrief};
pub use transition::{FailureReason, RetryBudget, Signal, Transition, TransitionTable};
