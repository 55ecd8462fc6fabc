//! Runs driven by the production stage agents.

use super::helpers::{CLEAN_CHANGE, LEAKY_CHANGE, agent_pipeline};
use gropius::pipeline::domain::{ApprovalDecision, RunStatus, Stage};
use gropius::sandbox::{adapters::ScriptedCommand, domain::CommandOutput};
use rstest::rstest;
use std::time::Duration;

const TEST_TIMEOUT: Duration = Duration::from_secs(30);

fn passing() -> ScriptedCommand {
    ScriptedCommand::exits(0, "test result: ok. 4 passed")
}

fn failing() -> ScriptedCommand {
    ScriptedCommand::Completes {
        output: CommandOutput::new(101, "test result: FAILED", "assertion failed"),
        delay: Duration::ZERO,
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approved_change_is_written_tested_and_submitted() {
    let pipeline = agent_pipeline(CLEAN_CHANGE, passing(), TEST_TIMEOUT);

    let waiting = pipeline
        .workflow
        .launch(pipeline.submission())
        .await
        .expect("launch");
    assert_eq!(waiting.stage(), Some(Stage::Approval));
    assert!(pipeline.submitter.requests().is_empty());

    let state = pipeline.workflow.state(waiting.id()).await.expect("state");
    let context = state.context().expect("context result");
    assert!(context.manifests.contains(&"Cargo.toml".to_owned()));
    assert!(state.research().is_some_and(|notes| !notes.notes.is_empty()));
    let written = std::fs::read_to_string(pipeline.tree().join("src/retry.rs")).expect("written");
    assert!(written.contains("X-Retry"));

    let finished = pipeline
        .workflow
        .decide(ApprovalDecision::approve(waiting.id()))
        .await
        .expect("approve");

    assert_eq!(finished.status(), RunStatus::Completed);
    let requests = pipeline.submitter.requests();
    let request = requests.first().expect("one submission");
    assert!(request.branch.starts_with("gropius/"));
    assert_eq!(request.title, "Add retry header");
    assert_eq!(request.changes.changes.len(), 1);
    assert_eq!(pipeline.runtime.executed_commands(), vec!["cargo test"]);
    assert_eq!(pipeline.runtime.live_environments(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_suite_exhausts_iterations_and_reclaims_every_sandbox() {
    let pipeline = agent_pipeline(CLEAN_CHANGE, failing(), TEST_TIMEOUT);

    let run = pipeline
        .workflow
        .launch(pipeline.submission())
        .await
        .expect("launch");

    assert_eq!(run.status(), RunStatus::Failed);
    assert_eq!(run.retry_count(), 5);
    assert_eq!(
        run.error_message(),
        Some("max iterations reached, tests still failing: tests failed with exit code 101")
    );
    let created = pipeline.runtime.created();
    assert_eq!(created.len(), 5);
    assert!(created
        .iter()
        .all(|id| pipeline.runtime.destroy_count(*id) == 1));
    assert_eq!(pipeline.runtime.live_environments(), 0);
    assert!(pipeline.submitter.requests().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unreachable_runtime_names_the_cause_after_the_iteration_limit() {
    let pipeline = agent_pipeline(CLEAN_CHANGE, passing(), TEST_TIMEOUT);
    pipeline
        .runtime
        .fail_creation("docker daemon unreachable")
        .expect("script creation failure");

    let run = pipeline
        .workflow
        .launch(pipeline.submission())
        .await
        .expect("launch");

    assert_eq!(run.status(), RunStatus::Failed);
    let message = run.error_message().expect("failure message");
    assert!(
        message.starts_with("max iterations reached, tests still failing: test sandbox failed")
    );
    assert!(message.contains("docker daemon unreachable"));
    assert!(pipeline.runtime.created().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn hanging_suite_times_out_each_iteration() {
    let pipeline = agent_pipeline(CLEAN_CHANGE, ScriptedCommand::Hangs, Duration::from_millis(20));

    let run = pipeline
        .workflow
        .launch(pipeline.submission())
        .await
        .expect("launch");

    assert_eq!(run.status(), RunStatus::Failed);
    let state = pipeline.workflow.state(run.id()).await.expect("state");
    let report = state.tests().expect("test report");
    assert!(report.timed_out);
    assert_eq!(report.exit_code, None);
    assert_eq!(pipeline.runtime.live_environments(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn leaked_credential_stops_the_run_before_approval() {
    let pipeline = agent_pipeline(LEAKY_CHANGE, passing(), TEST_TIMEOUT);

    let run = pipeline
        .workflow
        .launch(pipeline.submission())
        .await
        .expect("launch");

    assert_eq!(run.status(), RunStatus::Failed);
    assert_eq!(run.error_message(), Some("security scan failed: 1 finding(s)"));
    let state = pipeline.workflow.state(run.id()).await.expect("state");
    let findings = &state.security().expect("security report").findings;
    assert!(findings
        .iter()
        .any(|finding| finding.file == "config/deploy.env"));
    assert!(!state.approval_required());
    assert!(pipeline
        .notifier
        .events_for(run.id())
        .iter()
        .all(|event| !event.approval_required));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn run_without_a_tree_fails_at_coding() {
    let pipeline = agent_pipeline(CLEAN_CHANGE, passing(), TEST_TIMEOUT);

    let run = pipeline
        .workflow
        .launch(super::helpers::submission())
        .await
        .expect("launch");

    assert_eq!(run.status(), RunStatus::Failed);
    assert_eq!(
        run.error_message(),
        Some("coding stage failed: coding agent failed: coding agent requires a working tree")
    );
    assert!(pipeline.runtime.created().is_empty());
}
