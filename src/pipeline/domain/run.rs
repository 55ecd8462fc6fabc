//! Task run aggregate root and its lifecycle types.

use super::{
    ParseRunStatusError, PipelineDomainError, RepositoryFullName, RunId, Stage, TaskId, UserId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Submitted but not yet started.
    Queued,
    /// Driving stages or waiting at the approval gate.
    Running,
    /// Approval was rejected; waiting for re-approval.
    Paused,
    /// Change submitted.
    Completed,
    /// Stopped by a fatal cause.
    Failed,
}

impl RunStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for `completed` and `failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Queued, Self::Running | Self::Failed)
                | (Self::Running, Self::Paused | Self::Completed | Self::Failed)
                | (Self::Paused, Self::Running | Self::Failed)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RunStatus {
    type Error = ParseRunStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseRunStatusError(value.to_owned())),
        }
    }
}

/// Completion percentage between 0 and 100.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Progress(u8);

impl Progress {
    /// Nothing done.
    pub const ZERO: Self = Self(0);

    /// Everything done.
    pub const COMPLETE: Self = Self(100);

    /// Creates a validated progress value.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineDomainError::ProgressOutOfRange`] above 100.
    pub const fn new(value: u8) -> Result<Self, PipelineDomainError> {
        if value > 100 {
            return Err(PipelineDomainError::ProgressOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Creates a progress value, clamping anything above 100.
    #[must_use]
    pub const fn saturating(value: u8) -> Self {
        if value > 100 { Self(100) } else { Self(value) }
    }

    /// Returns the percentage.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Progress {
    type Error = PipelineDomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Progress> for u8 {
    fn from(progress: Progress) -> Self {
        progress.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// One execution of the pipeline for a (task, repository, user) triple.
///
/// Mutated only by the workflow. Once `completed` or `failed` every mutator
/// returns [`PipelineDomainError::RunTerminal`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRun {
    id: RunId,
    task_id: TaskId,
    user_id: UserId,
    repository: RepositoryFullName,
    stage: Option<Stage>,
    progress: Progress,
    status: RunStatus,
    retry_count: u32,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskRunData {
    /// Persisted run identifier.
    pub id: RunId,
    /// Persisted task identifier.
    pub task_id: TaskId,
    /// Persisted user identifier.
    pub user_id: UserId,
    /// Persisted repository name.
    pub repository: RepositoryFullName,
    /// Persisted current stage.
    pub stage: Option<Stage>,
    /// Persisted progress.
    pub progress: Progress,
    /// Persisted status.
    pub status: RunStatus,
    /// Persisted retry counter.
    pub retry_count: u32,
    /// Persisted failure message.
    pub error_message: Option<String>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRun {
    /// Creates a queued run.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        user_id: UserId,
        repository: RepositoryFullName,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: RunId::new(),
            task_id,
            user_id,
            repository,
            stage: None,
            progress: Progress::ZERO,
            status: RunStatus::Queued,
            retry_count: 0,
            error_message: None,
            created_at: timestamp,
            updated_at: timestamp,
            completed_at: None,
        }
    }

    /// Reconstructs a run from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskRunData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            user_id: data.user_id,
            repository: data.repository,
            stage: data.stage,
            progress: data.progress,
            status: data.status,
            retry_count: data.retry_count,
            error_message: data.error_message,
            created_at: data.created_at,
            updated_at: data.updated_at,
            completed_at: data.completed_at,
        }
    }

    /// Returns the run identifier.
    #[must_use]
    pub const fn id(&self) -> RunId {
        self.id
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the acting user.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the target repository.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryFullName {
        &self.repository
    }

    /// Returns the current stage, absent while queued.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        self.stage
    }

    /// Returns the current progress.
    #[must_use]
    pub const fn progress(&self) -> Progress {
        self.progress
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns the number of failed test iterations recorded.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Returns the failure message, present only when failed.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the completion timestamp for terminal runs.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns `true` once the run is completed or failed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Moves a queued run to `running` and enters the first stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineDomainError::InvalidStatusTransition`] unless the
    /// run is queued.
    pub fn start(&mut self, clock: &impl Clock) -> Result<(), PipelineDomainError> {
        self.transition_status(RunStatus::Running)?;
        self.stage = Some(Stage::Research);
        self.touch(clock);
        Ok(())
    }

    /// Moves the run to a non-terminal `stage`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineDomainError::RunTerminal`] for finished runs and
    /// [`PipelineDomainError::InvalidStageTransition`] when the graph has no
    /// such edge or `stage` is terminal.
    pub fn enter_stage(
        &mut self,
        stage: Stage,
        clock: &impl Clock,
    ) -> Result<(), PipelineDomainError> {
        self.ensure_mutable()?;
        let allowed = match self.stage {
            Some(current) => current.can_transition_to(stage),
            None => stage == Stage::Research,
        };
        if !allowed || stage.is_terminal() {
            return Err(PipelineDomainError::InvalidStageTransition {
                run_id: self.id,
                from: self.stage,
                to: stage,
            });
        }
        self.stage = Some(stage);
        self.touch(clock);
        Ok(())
    }

    /// Raises progress to `progress` if it is higher than the current value.
    ///
    /// Lower values are ignored so progress never falls.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineDomainError::RunTerminal`] for finished runs.
    pub fn raise_progress(
        &mut self,
        progress: Progress,
        clock: &impl Clock,
    ) -> Result<(), PipelineDomainError> {
        self.ensure_mutable()?;
        if progress > self.progress {
            self.progress = progress;
            self.touch(clock);
        }
        Ok(())
    }

    /// Counts one failed test iteration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineDomainError::RetryLimitExceeded`] when the counter
    /// already equals `limit`, and [`PipelineDomainError::RunTerminal`] for
    /// finished runs.
    pub fn record_retry(
        &mut self,
        limit: u32,
        clock: &impl Clock,
    ) -> Result<u32, PipelineDomainError> {
        self.ensure_mutable()?;
        if self.retry_count >= limit {
            return Err(PipelineDomainError::RetryLimitExceeded {
                run_id: self.id,
                limit,
            });
        }
        self.retry_count += 1;
        self.touch(clock);
        Ok(self.retry_count)
    }

    /// Suspends a running run after a rejected approval.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineDomainError::InvalidStatusTransition`] unless the
    /// run is running.
    pub fn pause(&mut self, clock: &impl Clock) -> Result<(), PipelineDomainError> {
        self.transition_status(RunStatus::Paused)?;
        self.touch(clock);
        Ok(())
    }

    /// Reactivates a paused run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineDomainError::InvalidStatusTransition`] unless the
    /// run is paused.
    pub fn resume(&mut self, clock: &impl Clock) -> Result<(), PipelineDomainError> {
        self.transition_status(RunStatus::Running)?;
        self.touch(clock);
        Ok(())
    }

    /// Marks the run completed after a successful submission.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineDomainError::InvalidStageTransition`] unless the run
    /// is at the submission stage, or a status error unless it is running.
    pub fn complete(&mut self, clock: &impl Clock) -> Result<(), PipelineDomainError> {
        self.ensure_mutable()?;
        if self.stage != Some(Stage::Submission) {
            return Err(PipelineDomainError::InvalidStageTransition {
                run_id: self.id,
                from: self.stage,
                to: Stage::Done,
            });
        }
        self.transition_status(RunStatus::Completed)?;
        self.stage = Some(Stage::Done);
        self.progress = Progress::COMPLETE;
        self.finish(clock);
        Ok(())
    }

    /// Marks the run failed with a human-readable cause.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineDomainError::EmptyErrorMessage`] for a blank
    /// message and [`PipelineDomainError::RunTerminal`] for finished runs.
    pub fn fail(
        &mut self,
        message: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), PipelineDomainError> {
        let raw = message.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PipelineDomainError::EmptyErrorMessage);
        }
        self.transition_status(RunStatus::Failed)?;
        self.stage = Some(Stage::Failed);
        self.error_message = Some(trimmed.to_owned());
        self.finish(clock);
        Ok(())
    }

    const fn ensure_mutable(&self) -> Result<(), PipelineDomainError> {
        if self.status.is_terminal() {
            return Err(PipelineDomainError::RunTerminal(self.id));
        }
        Ok(())
    }

    fn transition_status(&mut self, target: RunStatus) -> Result<(), PipelineDomainError> {
        self.ensure_mutable()?;
        if !self.status.can_transition_to(target) {
            return Err(PipelineDomainError::InvalidStatusTransition {
                run_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }

    fn finish(&mut self, clock: &impl Clock) {
        let timestamp = clock.utc();
        self.updated_at = timestamp;
        self.completed_at = Some(timestamp);
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
