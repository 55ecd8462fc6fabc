//! Top-level driver for task runs.
//!
//! [`PipelineWorkflow`] owns the transition loop. The latest checkpoint of a
//! run is the authoritative copy of its [`PipelineState`]: every operation
//! restores it, advances the machine, and appends new checkpoints before and
//! after each stage. The [`TaskRun`] record and a [`ProgressEvent`] are
//! updated at every transition.

use crate::pipeline::{
    domain::{
        ApprovalDecision, Checkpoint, CheckpointPhase, CredentialsHandle, EventLevel,
        FailureReason, PipelineDomainError, PipelineState, ProgressEvent, RepositoryInfo, RunId,
        RunStatus, SnapshotError, Stage, TaskBrief, TaskId, TaskRun, Transition, TransitionTable,
        UserId,
    },
    ports::{
        CheckpointStore, CheckpointStoreError, ProgressNotifier, TaskRunRepository,
        TaskRunRepositoryError,
    },
};
use mockable::Clock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use super::{CoordinatorError, StageCoordinator, StageVerdict, recorded_verdict};

/// Comment recorded when the gate approves on its own.
pub const AUTO_APPROVAL_COMMENT: &str = "auto-approved";

/// Input for [`PipelineWorkflow::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSubmission {
    task_id: TaskId,
    user_id: UserId,
    task: TaskBrief,
    repository: RepositoryInfo,
    credentials: CredentialsHandle,
    working_tree: Option<PathBuf>,
}

impl RunSubmission {
    /// Creates a submission without a working tree.
    #[must_use]
    pub const fn new(
        task_id: TaskId,
        user_id: UserId,
        task: TaskBrief,
        repository: RepositoryInfo,
        credentials: CredentialsHandle,
    ) -> Self {
        Self {
            task_id,
            user_id,
            task,
            repository,
            credentials,
            working_tree: None,
        }
    }

    /// Sets the tree materialized for this run.
    #[must_use]
    pub fn with_working_tree(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_tree = Some(path.into());
        self
    }
}

/// Service-level errors for workflow operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] PipelineDomainError),
    /// Run persistence failed.
    #[error(transparent)]
    Repository(#[from] TaskRunRepositoryError),
    /// Checkpoint persistence failed.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointStoreError),
    /// A snapshot could not be captured or restored.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    /// The coordinator could not run a stage.
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
    /// No run has the given identifier.
    #[error("task run {0} not found")]
    NotFound(RunId),
    /// The run has no checkpoint to restore from.
    #[error("task run {0} has no checkpoint")]
    MissingCheckpoint(RunId),
    /// The run is not waiting for an approval decision.
    #[error("task run {run_id} is not awaiting approval (status {status})")]
    ApprovalNotAccepted {
        /// Run identifier.
        run_id: RunId,
        /// Status at the time of the call.
        status: RunStatus,
    },
}

/// Result type for workflow operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Per-run locks serializing operations on the same run.
type RunLocks = std::sync::Mutex<HashMap<RunId, Arc<Mutex<()>>>>;

/// Exclusive hold on one run.
///
/// Releasing the last holder removes the run's entry from the lock map.
struct RunLockGuard<'a> {
    locks: &'a RunLocks,
    run_id: RunId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RunLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.run_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.run_id);
        }
    }
}

/// A run and its restored state, plus the next checkpoint sequence.
struct Session {
    run: TaskRun,
    state: PipelineState,
    next_sequence: u64,
}

/// Drives task runs through the stage graph.
pub struct PipelineWorkflow<R, S, N, C>
where
    R: TaskRunRepository,
    S: CheckpointStore,
    N: ProgressNotifier,
    C: Clock + Send + Sync,
{
    runs: Arc<R>,
    checkpoints: Arc<S>,
    notifier: Arc<N>,
    coordinator: StageCoordinator<C>,
    clock: Arc<C>,
    auto_approve: bool,
    run_locks: RunLocks,
}

impl<R, S, N, C> PipelineWorkflow<R, S, N, C>
where
    R: TaskRunRepository,
    S: CheckpointStore,
    N: ProgressNotifier,
    C: Clock + Send + Sync,
{
    /// Creates a workflow.
    #[must_use]
    pub fn new(
        runs: Arc<R>,
        checkpoints: Arc<S>,
        notifier: Arc<N>,
        coordinator: StageCoordinator<C>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            runs,
            checkpoints,
            notifier,
            coordinator,
            clock,
            auto_approve: false,
            run_locks: RunLocks::default(),
        }
    }

    /// Approves every run at the gate without waiting for a human.
    #[must_use]
    pub const fn with_auto_approve(mut self, enabled: bool) -> Self {
        self.auto_approve = enabled;
        self
    }

    /// Creates a queued run and checkpoints its initial state.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when persistence fails.
    #[tracing::instrument(skip_all, fields(task_id = %submission.task_id))]
    pub async fn submit(&self, submission: RunSubmission) -> PipelineResult<TaskRun> {
        let RunSubmission {
            task_id,
            user_id,
            task,
            repository,
            credentials,
            working_tree,
        } = submission;
        let run = TaskRun::new(
            task_id,
            user_id,
            repository.full_name.clone(),
            &*self.clock,
        );
        let mut state = PipelineState::new(run.id(), task, repository, credentials);
        if let Some(path) = working_tree {
            state = state.with_working_tree(path);
        }

        self.runs.store(&run).await?;
        let mut session = Session {
            run,
            state,
            next_sequence: 0,
        };
        self.checkpoint(&mut session, None, CheckpointPhase::Submitted)
            .await?;
        self.notify(&session).await;
        info!(run_id = %session.run.id(), "task run submitted");
        Ok(session.run)
    }

    /// Starts a queued run and drives it until it finishes or suspends.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotFound`] for unknown runs, a domain error
    /// unless the run is queued, and persistence errors.
    #[tracing::instrument(skip(self), fields(run_id = %run_id))]
    pub async fn execute(&self, run_id: RunId) -> PipelineResult<TaskRun> {
        let _guard = self.lock_run(run_id).await;
        let mut session = self.open_session(run_id).await?;
        self.start(&mut session).await?;
        self.drive(&mut session).await?;
        Ok(session.run)
    }

    /// Submits a run and executes it.
    ///
    /// # Errors
    ///
    /// See [`Self::submit`] and [`Self::execute`].
    pub async fn launch(&self, submission: RunSubmission) -> PipelineResult<TaskRun> {
        let run = self.submit(submission).await?;
        self.execute(run.id()).await
    }

    /// Applies a human decision to a run waiting at the gate or paused.
    ///
    /// Approval moves the run to submission and drives it to the end.
    /// Rejection pauses it; no stage is replayed and stored results are
    /// kept.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ApprovalNotAccepted`] unless the run is at
    /// the approval gate or paused.
    #[tracing::instrument(
        skip(self, decision),
        fields(run_id = %decision.run_id(), approved = decision.approved())
    )]
    pub async fn decide(&self, decision: ApprovalDecision) -> PipelineResult<TaskRun> {
        let run_id = decision.run_id();
        let _guard = self.lock_run(run_id).await;
        let mut session = self.open_session(run_id).await?;
        let awaiting = match session.run.status() {
            RunStatus::Running => {
                session.run.stage() == Some(Stage::Approval) && session.state.approval_required()
            }
            RunStatus::Paused => true,
            RunStatus::Queued | RunStatus::Completed | RunStatus::Failed => false,
        };
        if !awaiting {
            return Err(PipelineError::ApprovalNotAccepted {
                run_id,
                status: session.run.status(),
            });
        }

        self.apply_decision(
            &mut session,
            decision.approved(),
            decision.comments().map(str::to_owned),
        )
        .await?;
        self.drive(&mut session).await?;
        Ok(session.run)
    }

    /// Continues a run from its latest checkpoint after a restart.
    ///
    /// Queued runs are executed. Runs suspended at the gate, paused, or
    /// finished are returned unchanged. Otherwise the stage recorded in the
    /// checkpoint is either re-run or, if its result was already merged,
    /// routed through the transition table.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Snapshot`] when the checkpoint fails its
    /// integrity check, and persistence errors.
    #[tracing::instrument(skip(self), fields(run_id = %run_id))]
    pub async fn resume(&self, run_id: RunId) -> PipelineResult<TaskRun> {
        let _guard = self.lock_run(run_id).await;
        let latest = self
            .checkpoints
            .latest(run_id)
            .await?
            .ok_or(PipelineError::MissingCheckpoint(run_id))?;
        let mut session = self.open_session(run_id).await?;

        match session.run.status() {
            RunStatus::Queued => {
                self.start(&mut session).await?;
                self.drive(&mut session).await?;
            }
            RunStatus::Running => {
                let settled = latest.phase() == CheckpointPhase::AfterStage
                    && latest.stage() == session.run.stage();
                let verdict = latest
                    .stage()
                    .filter(|_| settled)
                    .and_then(|stage| recorded_verdict(&session.state, stage));
                if let Some(found) = verdict {
                    info!(stage = %found.stage(), "resuming from a settled stage");
                    if self.apply(&mut session, &found).await? {
                        self.drive(&mut session).await?;
                    }
                } else {
                    info!(stage = ?session.run.stage(), "resuming by re-running the current stage");
                    self.drive(&mut session).await?;
                }
            }
            RunStatus::Paused | RunStatus::Completed | RunStatus::Failed => {}
        }
        Ok(session.run)
    }

    /// Returns the run with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Repository`] when lookup fails.
    pub async fn find_run(&self, run_id: RunId) -> PipelineResult<Option<TaskRun>> {
        Ok(self.runs.find_by_id(run_id).await?)
    }

    /// Returns every checkpoint of the run, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Checkpoint`] when lookup fails.
    pub async fn checkpoints(&self, run_id: RunId) -> PipelineResult<Vec<Checkpoint>> {
        Ok(self.checkpoints.list(run_id).await?)
    }

    /// Returns the state held by the latest checkpoint of the run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingCheckpoint`] when the run has none and
    /// [`PipelineError::Snapshot`] when it fails its integrity check.
    pub async fn state(&self, run_id: RunId) -> PipelineResult<PipelineState> {
        let latest = self
            .checkpoints
            .latest(run_id)
            .await?
            .ok_or(PipelineError::MissingCheckpoint(run_id))?;
        Ok(latest.restore()?)
    }

    async fn lock_run(&self, run_id: RunId) -> RunLockGuard<'_> {
        let lock = {
            let mut locks = self.run_locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(run_id).or_default())
        };
        RunLockGuard {
            locks: &self.run_locks,
            run_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Returns how many runs currently have a lock entry.
    #[cfg(test)]
    pub(crate) fn tracked_run_locks(&self) -> usize {
        self.run_locks
            .lock()
            .map_or_else(|poisoned| poisoned.into_inner().len(), |locks| locks.len())
    }

    async fn open_session(&self, run_id: RunId) -> PipelineResult<Session> {
        let run = self
            .runs
            .find_by_id(run_id)
            .await?
            .ok_or(PipelineError::NotFound(run_id))?;
        let latest = self
            .checkpoints
            .latest(run_id)
            .await?
            .ok_or(PipelineError::MissingCheckpoint(run_id))?;
        let state = latest.restore()?;
        Ok(Session {
            run,
            state,
            next_sequence: latest.sequence() + 1,
        })
    }

    async fn start(&self, session: &mut Session) -> PipelineResult<()> {
        session.run.start(&*self.clock)?;
        self.commit(session).await?;
        info!(run_id = %session.run.id(), "task run started");
        Ok(())
    }

    /// Runs stages until the run finishes, suspends, or pauses.
    async fn drive(&self, session: &mut Session) -> PipelineResult<()> {
        while session.run.status() == RunStatus::Running {
            let Some(stage) = session.run.stage() else {
                return Ok(());
            };
            if stage == Stage::Approval {
                if !self.open_gate(session).await? {
                    return Ok(());
                }
                continue;
            }
            if stage.is_terminal() {
                return Ok(());
            }

            self.checkpoint(session, Some(stage), CheckpointPhase::BeforeStage)
                .await?;
            let verdict = match self.coordinator.run_stage(stage, &mut session.state).await {
                Ok(verdict) => verdict,
                Err(err) => {
                    warn!(
                        run_id = %session.run.id(),
                        %stage,
                        error = %err,
                        "stage could not be dispatched"
                    );
                    let message = format!("{stage} stage failed: {err}");
                    self.fail(session, stage, message).await?;
                    return Ok(());
                }
            };
            self.checkpoint(session, Some(stage), CheckpointPhase::AfterStage)
                .await?;
            if !self.apply(session, &verdict).await? {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Applies the table's decision for `verdict`; returns `true` to keep
    /// driving.
    async fn apply(&self, session: &mut Session, verdict: &StageVerdict) -> PipelineResult<bool> {
        let stage = verdict.stage();
        let budget = self.coordinator.policy().budget(session.run.retry_count());
        match TransitionTable::next(stage, verdict.signal(), budget) {
            Transition::Advance(next) => {
                session.run.raise_progress(stage.milestone(), &*self.clock)?;
                session.run.enter_stage(next, &*self.clock)?;
                self.commit(session).await?;
                Ok(true)
            }
            Transition::Retry => {
                if let Err(err) = self
                    .coordinator
                    .record_retry(&mut session.run, &mut session.state)
                {
                    self.fail(session, stage, err.to_string()).await?;
                    return Ok(false);
                }
                info!(
                    run_id = %session.run.id(),
                    retry_count = session.run.retry_count(),
                    "tests failed, returning to coding"
                );
                session.run.enter_stage(Stage::Coding, &*self.clock)?;
                self.commit(session).await?;
                Ok(true)
            }
            Transition::Fail(reason) => {
                if reason == FailureReason::IterationLimit
                    && let Err(err) = self
                        .coordinator
                        .record_retry(&mut session.run, &mut session.state)
                {
                    warn!(
                        run_id = %session.run.id(),
                        error = %err,
                        "retry counter already at its bound"
                    );
                }
                let message = failure_message(reason, verdict.error());
                self.fail(session, stage, message).await?;
                Ok(false)
            }
            Transition::Complete => {
                session.run.complete(&*self.clock)?;
                self.checkpoint(session, Some(Stage::Done), CheckpointPhase::AfterStage)
                    .await?;
                self.commit(session).await?;
                info!(run_id = %session.run.id(), "task run completed");
                Ok(false)
            }
            Transition::Suspend | Transition::Pause | Transition::Halt => Ok(false),
        }
    }

    /// Sets the approval flag and progress; returns `true` when the gate
    /// approved on its own.
    async fn open_gate(&self, session: &mut Session) -> PipelineResult<bool> {
        if !session.state.approval_required() {
            session
                .run
                .raise_progress(Stage::Approval.milestone(), &*self.clock)?;
            session.state.require_approval();
            session.state.record_event(
                Stage::Approval,
                EventLevel::Info,
                "awaiting approval",
                self.clock.utc(),
            );
            self.checkpoint(session, Some(Stage::Approval), CheckpointPhase::BeforeStage)
                .await?;
            self.commit(session).await?;
        }
        if !self.auto_approve {
            info!(run_id = %session.run.id(), "task run awaiting approval");
            return Ok(false);
        }
        self.apply_decision(session, true, Some(AUTO_APPROVAL_COMMENT.to_owned()))
            .await?;
        Ok(true)
    }

    async fn apply_decision(
        &self,
        session: &mut Session,
        approved: bool,
        comments: Option<String>,
    ) -> PipelineResult<()> {
        session.state.record_decision(approved, comments);
        let (level, message) = if approved {
            (EventLevel::Info, "changes approved")
        } else {
            (EventLevel::Warning, "changes rejected")
        };
        session
            .state
            .record_event(Stage::Approval, level, message, self.clock.utc());

        match TransitionTable::decide(approved) {
            Transition::Advance(next) => {
                if session.run.status() == RunStatus::Paused {
                    session.run.resume(&*self.clock)?;
                }
                session.run.enter_stage(next, &*self.clock)?;
            }
            _ => {
                if session.run.status() == RunStatus::Running {
                    session.run.pause(&*self.clock)?;
                }
            }
        }
        self.checkpoint(session, Some(Stage::Approval), CheckpointPhase::Decision)
            .await?;
        self.commit(session).await?;
        info!(run_id = %session.run.id(), approved, "approval decision applied");
        Ok(())
    }

    async fn fail(
        &self,
        session: &mut Session,
        stage: Stage,
        message: String,
    ) -> PipelineResult<()> {
        warn!(run_id = %session.run.id(), %stage, %message, "task run failed");
        session
            .state
            .record_event(stage, EventLevel::Error, message.clone(), self.clock.utc());
        session.run.fail(message, &*self.clock)?;
        self.checkpoint(session, Some(Stage::Failed), CheckpointPhase::AfterStage)
            .await?;
        self.commit(session).await
    }

    async fn checkpoint(
        &self,
        session: &mut Session,
        stage: Option<Stage>,
        phase: CheckpointPhase,
    ) -> PipelineResult<()> {
        let checkpoint = Checkpoint::capture(
            &session.state,
            stage,
            phase,
            session.next_sequence,
            &*self.clock,
        )?;
        self.checkpoints.append(&checkpoint).await?;
        session.next_sequence += 1;
        Ok(())
    }

    /// Persists the run and emits a progress event.
    async fn commit(&self, session: &Session) -> PipelineResult<()> {
        self.runs.update(&session.run).await?;
        self.notify(session).await;
        Ok(())
    }

    async fn notify(&self, session: &Session) {
        let event = ProgressEvent {
            run_id: session.run.id(),
            stage: session.run.stage(),
            progress: session.run.progress(),
            status: session.run.status(),
            approval_required: session.state.approval_required(),
            emitted_at: self.clock.utc(),
        };
        if let Err(err) = self.notifier.notify(&event).await {
            warn!(run_id = %event.run_id, error = %err, "progress notification failed");
        }
    }
}

fn failure_message(reason: FailureReason, detail: Option<&str>) -> String {
    detail.map_or_else(|| reason.to_string(), |detail| format!("{reason}: {detail}"))
}
