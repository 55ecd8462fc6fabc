//! Independent runs and racing decisions.

use super::helpers::{scripted_workflow, submission};
use gropius::pipeline::{
    domain::{ApprovalDecision, RunStatus, Stage},
    services::PipelineError,
};
use rstest::rstest;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_runs_do_not_interfere() {
    let workflow = Arc::new(scripted_workflow());
    let mut launches = JoinSet::new();
    for _ in 0..8 {
        let shared = Arc::clone(&workflow);
        launches.spawn(async move { shared.launch(submission()).await });
    }

    let mut ids = HashSet::new();
    while let Some(joined) = launches.join_next().await {
        let run = joined.expect("task joined").expect("launch");
        assert_eq!(run.stage(), Some(Stage::Approval));
        let checkpoints = workflow.checkpoints(run.id()).await.expect("checkpoints");
        assert!(checkpoints
            .iter()
            .enumerate()
            .all(|(index, checkpoint)| checkpoint.sequence() == index as u64));
        assert!(checkpoints
            .iter()
            .all(|checkpoint| checkpoint.run_id() == run.id()));
        ids.insert(run.id());
    }
    assert_eq!(ids.len(), 8);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_approvals_submit_once() {
    let workflow = Arc::new(scripted_workflow());
    let run = workflow.launch(submission()).await.expect("launch");

    let mut decisions = JoinSet::new();
    for _ in 0..2 {
        let shared = Arc::clone(&workflow);
        let run_id = run.id();
        decisions.spawn(async move { shared.decide(ApprovalDecision::approve(run_id)).await });
    }

    let mut completed = 0;
    let mut refused = 0;
    while let Some(joined) = decisions.join_next().await {
        match joined.expect("task joined") {
            Ok(finished) => {
                assert_eq!(finished.status(), RunStatus::Completed);
                completed += 1;
            }
            Err(PipelineError::ApprovalNotAccepted { status, .. }) => {
                assert_eq!(status, RunStatus::Completed);
                refused += 1;
            }
            Err(other) => panic!("unexpected decision error: {other}"),
        }
    }
    assert_eq!((completed, refused), (1, 1));
}
