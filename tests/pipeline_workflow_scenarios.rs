//! Behaviour tests for the task run workflow.

mod pipeline_workflow_steps;

use pipeline_workflow_steps::world::{PipelineWorld, world};
use rstest_bdd_macros::scenario;

#[scenario(
    path = "tests/features/pipeline_workflow.feature",
    name = "A clean run waits at the approval gate"
)]
#[tokio::test(flavor = "multi_thread")]
async fn clean_run_waits_for_approval(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline_workflow.feature",
    name = "Approving a waiting run submits the change"
)]
#[tokio::test(flavor = "multi_thread")]
async fn approval_submits_the_change(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline_workflow.feature",
    name = "Rejecting a waiting run pauses it"
)]
#[tokio::test(flavor = "multi_thread")]
async fn rejection_pauses_the_run(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline_workflow.feature",
    name = "Failing tests are retried until they pass"
)]
#[tokio::test(flavor = "multi_thread")]
async fn failing_tests_are_retried(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline_workflow.feature",
    name = "Tests that never pass exhaust the iteration budget"
)]
#[tokio::test(flavor = "multi_thread")]
async fn persistent_failures_exhaust_the_budget(world: PipelineWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline_workflow.feature",
    name = "Deciding on a run that is not waiting is refused"
)]
#[tokio::test(flavor = "multi_thread")]
async fn decision_outside_the_gate_is_refused(world: PipelineWorld) {
    let _ = world;
}
