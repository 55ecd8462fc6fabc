//! Then steps for task run workflow BDD scenarios.

use super::world::PipelineWorld;
use gropius::pipeline::{
    domain::{RunStatus, Stage, TaskRun},
    services::PipelineError,
};
use rstest_bdd_macros::then;

fn last_run(world: &PipelineWorld) -> Result<&TaskRun, eyre::Report> {
    world
        .last_run
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing run in scenario world"))
}

#[then(r#"the run status is "{status}""#)]
fn run_status_is(world: &PipelineWorld, status: String) -> Result<(), eyre::Report> {
    let expected = RunStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let run = last_run(world)?;
    if run.status() != expected {
        return Err(eyre::eyre!(
            "expected status {expected}, found {}",
            run.status()
        ));
    }
    Ok(())
}

#[then(r#"the run is at the "{stage}" stage"#)]
fn run_is_at_stage(world: &PipelineWorld, stage: String) -> Result<(), eyre::Report> {
    let expected = Stage::try_from(stage.as_str())
        .map_err(|err| eyre::eyre!("invalid expected stage in scenario: {err}"))?;
    let run = last_run(world)?;
    if run.stage() != Some(expected) {
        return Err(eyre::eyre!(
            "expected stage {expected}, found {:?}",
            run.stage()
        ));
    }
    Ok(())
}

#[then("the run progress is {progress:u8}")]
fn run_progress_is(world: &PipelineWorld, progress: u8) -> Result<(), eyre::Report> {
    let actual = last_run(world)?.progress().value();
    if actual != progress {
        return Err(eyre::eyre!("expected progress {progress}, found {actual}"));
    }
    Ok(())
}

#[then("the run is awaiting approval")]
fn run_is_awaiting_approval(world: &PipelineWorld) -> Result<(), eyre::Report> {
    let run = last_run(world)?;
    if run.status() != RunStatus::Running || run.stage() != Some(Stage::Approval) {
        return Err(eyre::eyre!(
            "expected a running run at the gate, found {} at {:?}",
            run.status(),
            run.stage()
        ));
    }
    Ok(())
}

#[then("the retry count is {count:u32}")]
fn retry_count_is(world: &PipelineWorld, count: u32) -> Result<(), eyre::Report> {
    let actual = last_run(world)?.retry_count();
    if actual != count {
        return Err(eyre::eyre!("expected {count} retries, found {actual}"));
    }
    Ok(())
}

#[then(r#"the run failed with "{message}""#)]
fn run_failed_with(world: &PipelineWorld, message: String) -> Result<(), eyre::Report> {
    let actual = last_run(world)?.error_message();
    if actual != Some(message.as_str()) {
        return Err(eyre::eyre!("expected failure {message:?}, found {actual:?}"));
    }
    Ok(())
}

#[then("the decision is refused")]
fn decision_is_refused(world: &PipelineWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_decision
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing decision result"))?;
    if !matches!(result, Err(PipelineError::ApprovalNotAccepted { .. })) {
        return Err(eyre::eyre!(
            "expected ApprovalNotAccepted error, got {result:?}"
        ));
    }
    Ok(())
}
