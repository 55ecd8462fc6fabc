//! Given steps for task run workflow BDD scenarios.

use super::world::{PipelineWorld, SuiteBehaviour, run_async, submission};
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given("a task whose tests pass")]
fn tests_pass(world: &mut PipelineWorld) {
    world.suite = SuiteBehaviour::FailsThenPasses(0);
}

#[given("a task whose tests fail {failures:u32} times before passing")]
fn tests_fail_then_pass(world: &mut PipelineWorld, failures: u32) {
    world.suite = SuiteBehaviour::FailsThenPasses(failures);
}

#[given("a task whose tests never pass")]
fn tests_never_pass(world: &mut PipelineWorld) {
    world.suite = SuiteBehaviour::NeverPasses;
}

#[given("approvals are automatic")]
fn approvals_are_automatic(world: &mut PipelineWorld) {
    world.auto_approve = true;
}

#[given("the run has been launched")]
fn run_has_been_launched(world: &mut PipelineWorld) -> Result<(), eyre::Report> {
    let request = submission()?;
    let run = run_async(world.workflow().launch(request)).wrap_err("launch run in setup")?;
    world.last_run = Some(run);
    Ok(())
}
