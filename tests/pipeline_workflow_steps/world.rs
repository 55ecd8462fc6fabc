//! Shared world state for task run workflow BDD scenarios.

use std::sync::Arc;

use gropius::pipeline::{
    adapters::memory::{
        InMemoryCheckpointStore, InMemoryTaskRunRepository, RecordingProgressNotifier,
        ScriptedStageAgent,
    },
    domain::{
        AgentKind, BranchName, CredentialsHandle, RepositoryFullName, RepositoryInfo, StagePayload,
        StageReport, TaskBrief, TaskId, TaskRun, TestReport, UserId,
    },
    services::{
        AgentRoster, PipelineError, PipelineWorkflow, RetryPolicy, RunSubmission,
        StageCoordinator,
    },
};
use mockable::DefaultClock;
use rstest::fixture;

/// Workflow type used by the BDD world.
pub type TestWorkflow = PipelineWorkflow<
    InMemoryTaskRunRepository,
    InMemoryCheckpointStore,
    RecordingProgressNotifier,
    DefaultClock,
>;

/// How the scripted test suite behaves across iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteBehaviour {
    /// Fails this many times, then passes.
    FailsThenPasses(u32),
    /// Never passes.
    NeverPasses,
}

/// Scenario world for task run workflow behaviour tests.
pub struct PipelineWorld {
    pub suite: SuiteBehaviour,
    pub auto_approve: bool,
    pub workflow: Option<TestWorkflow>,
    pub last_run: Option<TaskRun>,
    pub last_decision: Option<Result<TaskRun, PipelineError>>,
}

impl PipelineWorld {
    /// Creates a world whose suite passes first time.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            suite: SuiteBehaviour::FailsThenPasses(0),
            auto_approve: false,
            workflow: None,
            last_run: None,
            last_decision: None,
        }
    }

    /// Returns the workflow, building it from the configured behaviour on
    /// first use.
    pub fn workflow(&mut self) -> &TestWorkflow {
        let suite = self.suite;
        let auto_approve = self.auto_approve;
        self.workflow
            .get_or_insert_with(|| build_workflow(suite, auto_approve))
    }
}

impl Default for PipelineWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn failing_report() -> StageReport {
    StageReport::failure_with(
        StagePayload::Testing(TestReport {
            tests_run: 1,
            tests_failed: 1,
            exit_code: Some(1),
            ..TestReport::default()
        }),
        "tests failed with exit code 1",
    )
}

fn testing_agent(suite: SuiteBehaviour) -> ScriptedStageAgent {
    match suite {
        SuiteBehaviour::FailsThenPasses(failures) => (0..failures)
            .fold(ScriptedStageAgent::new(AgentKind::Testing), |agent, _| {
                agent.then_report(failing_report())
            })
            .then_report(ScriptedStageAgent::success_report(AgentKind::Testing)),
        SuiteBehaviour::NeverPasses => {
            ScriptedStageAgent::new(AgentKind::Testing).then_report(failing_report())
        }
    }
}

fn build_workflow(suite: SuiteBehaviour, auto_approve: bool) -> TestWorkflow {
    let roster = AgentKind::ALL
        .into_iter()
        .fold(AgentRoster::new(), |roster, kind| {
            roster.with_agent(Arc::new(ScriptedStageAgent::new(kind)))
        })
        .with_agent(Arc::new(testing_agent(suite)));
    let clock = Arc::new(DefaultClock);
    PipelineWorkflow::new(
        Arc::new(InMemoryTaskRunRepository::new()),
        Arc::new(InMemoryCheckpointStore::new()),
        Arc::new(RecordingProgressNotifier::new()),
        StageCoordinator::new(roster, RetryPolicy::default(), Arc::clone(&clock)),
        clock,
    )
    .with_auto_approve(auto_approve)
}

/// Builds the submission every scenario launches.
///
/// # Errors
///
/// Returns an error if the fixed task values fail validation.
pub fn submission() -> Result<RunSubmission, eyre::Report> {
    let task = TaskBrief::new("Add retry header", "Send X-Retry on every retried request")?;
    let repository = RepositoryInfo {
        full_name: RepositoryFullName::new("octo/widgets")?,
        default_branch: BranchName::new("main")?,
    };
    Ok(RunSubmission::new(
        TaskId::new(),
        UserId::new(),
        task,
        repository,
        CredentialsHandle::new("token-123"),
    ))
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> PipelineWorld {
    PipelineWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
