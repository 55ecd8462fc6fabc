//! When steps for task run workflow BDD scenarios.

use super::world::{PipelineWorld, run_async, submission};
use eyre::WrapErr;
use gropius::pipeline::domain::ApprovalDecision;
use rstest_bdd_macros::when;

#[when("the run is launched")]
fn run_is_launched(world: &mut PipelineWorld) -> Result<(), eyre::Report> {
    let request = submission()?;
    let run = run_async(world.workflow().launch(request)).wrap_err("launch run")?;
    world.last_run = Some(run);
    Ok(())
}

fn decide(world: &mut PipelineWorld, approved: bool) -> Result<(), eyre::Report> {
    let run_id = world
        .last_run
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing launched run in scenario world"))?
        .id();
    let decision = if approved {
        ApprovalDecision::approve(run_id)
    } else {
        ApprovalDecision::reject(run_id)
    };

    let result = run_async(world.workflow().decide(decision));
    if let Ok(ref updated) = result {
        world.last_run = Some(updated.clone());
    }
    world.last_decision = Some(result);
    Ok(())
}

#[when("the run is approved")]
fn run_is_approved(world: &mut PipelineWorld) -> Result<(), eyre::Report> {
    decide(world, true)
}

#[when("the run is rejected")]
fn run_is_rejected(world: &mut PipelineWorld) -> Result<(), eyre::Report> {
    decide(world, false)
}
