//! Shared builders for end-to-end runs over in-memory adapters.

use gropius::pipeline::{
    adapters::{
        PatternSecretScanner,
        agents::{
            CodingAgent, ContextAgent, ResearchAgent, SecurityAgent, SubmissionAgent,
            TestingAgent,
        },
        memory::{
            InMemoryCheckpointStore, InMemoryTaskRunRepository, RecordingChangeSubmitter,
            RecordingProgressNotifier, ScriptedLanguageModel, ScriptedStageAgent,
        },
    },
    domain::{
        AgentKind, BranchName, CredentialsHandle, RepositoryFullName, RepositoryInfo, TaskBrief,
        TaskId, UserId,
    },
    services::{AgentRoster, PipelineWorkflow, RetryPolicy, RunSubmission, StageCoordinator},
};
use gropius::sandbox::{
    adapters::{ScriptedCommand, ScriptedSandboxRuntime},
    domain::ResourceLimits,
    services::ExecutionSandbox,
};
use mockable::DefaultClock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Workflow type used by every integration test.
pub type TestWorkflow = PipelineWorkflow<
    InMemoryTaskRunRepository,
    InMemoryCheckpointStore,
    RecordingProgressNotifier,
    DefaultClock,
>;

/// Owner and name of the repository every run targets.
pub const REPOSITORY: &str = "octo/widgets";

/// Coding response adding one Rust source file.
pub const CLEAN_CHANGE: &str = r#"```json
[{"path": "src/retry.rs", "content": "pub const RETRY_HEADER: &str = \"X-Retry\";\n", "description": "add header constant"}]
```"#;

/// Coding response that leaks a credential into the tree.
pub const LEAKY_CHANGE: &str = r#"[{"path": "config/deploy.env", "content": "aws_access_key_id=AKIAEXAMPLE\n"}]"#;

/// A workflow wired to the production stage agents and scripted
/// collaborators.
pub struct AgentPipeline {
    pub workflow: TestWorkflow,
    pub runtime: ScriptedSandboxRuntime,
    pub submitter: Arc<RecordingChangeSubmitter>,
    pub notifier: Arc<RecordingProgressNotifier>,
    pub mirror: TempDir,
}

impl AgentPipeline {
    /// Returns the working tree, which doubles as the repository mirror.
    pub fn tree(&self) -> PathBuf {
        tree_under(self.mirror.path())
    }

    /// Returns a submission whose working tree is [`Self::tree`].
    pub fn submission(&self) -> RunSubmission {
        submission().with_working_tree(self.tree())
    }
}

fn tree_under(mirror: &Path) -> PathBuf {
    REPOSITORY
        .split('/')
        .fold(mirror.to_path_buf(), |path, segment| path.join(segment))
}

/// Builds a pipeline whose coding model answers `coding_response` and whose
/// sandbox runs `cargo test` as scripted.
///
/// # Panics
///
/// Panics when the temporary tree cannot be prepared.
pub fn agent_pipeline(
    coding_response: &str,
    cargo_test: ScriptedCommand,
    test_timeout: Duration,
) -> AgentPipeline {
    let mirror = tempfile::tempdir().expect("mirror root");
    let tree = tree_under(mirror.path());
    std::fs::create_dir_all(tree.join("src")).expect("tree layout");
    std::fs::write(
        tree.join("Cargo.toml"),
        "[package]\nname = \"widgets\"\nversion = \"0.1.0\"\n",
    )
    .expect("manifest");
    std::fs::write(tree.join("src/lib.rs"), "pub mod retry;\n").expect("lib");

    let runtime = ScriptedSandboxRuntime::new();
    runtime.script("cargo test", cargo_test).expect("script");
    let sandbox = ExecutionSandbox::new(Arc::new(runtime.clone()), "rust:1-slim");
    let submitter = Arc::new(RecordingChangeSubmitter::new());
    let notifier = Arc::new(RecordingProgressNotifier::new());

    let roster = AgentRoster::new()
        .with_agent(Arc::new(ResearchAgent::new(Arc::new(
            ScriptedLanguageModel::new("Add the header in the retry middleware."),
        ))))
        .with_agent(Arc::new(ContextAgent::new(mirror.path())))
        .with_agent(Arc::new(CodingAgent::new(Arc::new(
            ScriptedLanguageModel::new(coding_response),
        ))))
        .with_agent(Arc::new(TestingAgent::new(
            sandbox,
            test_timeout,
            ResourceLimits::new(Some(512)),
        )))
        .with_agent(Arc::new(SecurityAgent::new(Arc::new(
            PatternSecretScanner::new().expect("built-in patterns"),
        ))))
        .with_agent(Arc::new(SubmissionAgent::new(Arc::clone(&submitter))));

    AgentPipeline {
        workflow: workflow(roster, Arc::clone(&notifier)),
        runtime,
        submitter,
        notifier,
        mirror,
    }
}

/// Builds a workflow where every stage succeeds immediately.
pub fn scripted_workflow() -> TestWorkflow {
    let roster = AgentKind::ALL
        .into_iter()
        .fold(AgentRoster::new(), |roster, kind| {
            roster.with_agent(Arc::new(ScriptedStageAgent::new(kind)))
        });
    workflow(roster, Arc::new(RecordingProgressNotifier::new()))
}

fn workflow(roster: AgentRoster, notifier: Arc<RecordingProgressNotifier>) -> TestWorkflow {
    let clock = Arc::new(DefaultClock);
    PipelineWorkflow::new(
        Arc::new(InMemoryTaskRunRepository::new()),
        Arc::new(InMemoryCheckpointStore::new()),
        notifier,
        StageCoordinator::new(roster, RetryPolicy::default(), Arc::clone(&clock)),
        clock,
    )
}

/// Returns a submission for the shared task without a working tree.
///
/// # Panics
///
/// Panics if the fixed task values fail validation.
pub fn submission() -> RunSubmission {
    let task = TaskBrief::new("Add retry header", "Send X-Retry on every retried request")
        .expect("task");
    let repository = RepositoryInfo {
        full_name: RepositoryFullName::new(REPOSITORY).expect("repository"),
        default_branch: BranchName::new("main").expect("branch"),
    };
    RunSubmission::new(
        TaskId::new(),
        UserId::new(),
        task,
        repository,
        CredentialsHandle::new("token-123"),
    )
}
