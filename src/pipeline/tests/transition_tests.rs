//! Unit tests for the transition table and the stage graph.

use crate::pipeline::domain::{
    FailureReason, RetryBudget, Signal, Stage, Transition, TransitionTable,
};
use rstest::rstest;

const ROOMY: RetryBudget = RetryBudget::new(0, 5);

#[rstest]
#[case(Stage::Research, Signal::Passed, Transition::Advance(Stage::Context))]
#[case(Stage::Context, Signal::Passed, Transition::Advance(Stage::Coding))]
#[case(Stage::Coding, Signal::Passed, Transition::Advance(Stage::Testing))]
#[case(Stage::Testing, Signal::Passed, Transition::Advance(Stage::Security))]
#[case(Stage::Testing, Signal::Failed, Transition::Retry)]
#[case(Stage::Security, Signal::Passed, Transition::Advance(Stage::Approval))]
#[case(
    Stage::Security,
    Signal::Failed,
    Transition::Fail(FailureReason::SecurityFindings)
)]
#[case(Stage::Approval, Signal::Passed, Transition::Suspend)]
#[case(Stage::Submission, Signal::Passed, Transition::Complete)]
#[case(
    Stage::Submission,
    Signal::Failed,
    Transition::Fail(FailureReason::StageFailed(Stage::Submission))
)]
#[case(
    Stage::Research,
    Signal::Failed,
    Transition::Fail(FailureReason::StageFailed(Stage::Research))
)]
#[case(
    Stage::Coding,
    Signal::Failed,
    Transition::Fail(FailureReason::StageFailed(Stage::Coding))
)]
#[case(Stage::Done, Signal::Passed, Transition::Halt)]
#[case(Stage::Failed, Signal::Failed, Transition::Halt)]
fn table_routes_stage_outcomes(
    #[case] stage: Stage,
    #[case] signal: Signal,
    #[case] expected: Transition,
) {
    assert_eq!(TransitionTable::next(stage, signal, ROOMY), expected);
}

#[rstest]
#[case(0, 5, Transition::Retry)]
#[case(3, 5, Transition::Retry)]
#[case(4, 5, Transition::Fail(FailureReason::IterationLimit))]
#[case(0, 1, Transition::Fail(FailureReason::IterationLimit))]
fn failing_tests_retry_until_the_bound(
    #[case] used: u32,
    #[case] limit: u32,
    #[case] expected: Transition,
) {
    let budget = RetryBudget::new(used, limit);
    assert_eq!(
        TransitionTable::next(Stage::Testing, Signal::Failed, budget),
        expected
    );
}

#[rstest]
fn exhausted_budget_never_affects_other_stages() {
    let spent = RetryBudget::new(5, 5);
    assert_eq!(
        TransitionTable::next(Stage::Coding, Signal::Passed, spent),
        Transition::Advance(Stage::Testing)
    );
    assert_eq!(
        TransitionTable::next(Stage::Testing, Signal::Passed, spent),
        Transition::Advance(Stage::Security)
    );
}

#[rstest]
#[case(true, Transition::Advance(Stage::Submission))]
#[case(false, Transition::Pause)]
fn approval_decision_routes(#[case] approved: bool, #[case] expected: Transition) {
    assert_eq!(TransitionTable::decide(approved), expected);
}

#[rstest]
fn every_advance_is_a_legal_stage_edge() {
    for stage in Stage::ALL {
        for signal in [Signal::Passed, Signal::Failed] {
            if let Transition::Advance(next) = TransitionTable::next(stage, signal, ROOMY) {
                assert!(
                    stage.can_transition_to(next),
                    "{stage} -> {next} is not in the graph"
                );
            }
        }
    }
    assert!(Stage::Testing.can_transition_to(Stage::Coding));
    assert!(Stage::Approval.can_transition_to(Stage::Submission));
}

#[rstest]
#[case(Stage::Research, Stage::Coding)]
#[case(Stage::Coding, Stage::Security)]
#[case(Stage::Security, Stage::Submission)]
#[case(Stage::Approval, Stage::Coding)]
#[case(Stage::Done, Stage::Failed)]
#[case(Stage::Failed, Stage::Research)]
fn illegal_jumps_are_rejected(#[case] from: Stage, #[case] to: Stage) {
    assert!(!from.can_transition_to(to));
}

#[rstest]
fn failed_is_reachable_from_every_non_terminal_stage() {
    for stage in Stage::ALL.into_iter().filter(|stage| !stage.is_terminal()) {
        assert!(stage.can_transition_to(Stage::Failed), "{stage}");
    }
}

#[rstest]
#[case(FailureReason::IterationLimit, "max iterations reached, tests still failing")]
#[case(FailureReason::SecurityFindings, "security scan failed")]
#[case(FailureReason::StageFailed(Stage::Submission), "submission stage failed")]
fn failure_reasons_read_as_sentences(#[case] reason: FailureReason, #[case] expected: &str) {
    assert_eq!(reason.to_string(), expected);
}

#[rstest]
fn milestones_never_fall_along_the_happy_path() {
    let path = [
        Stage::Research,
        Stage::Context,
        Stage::Coding,
        Stage::Testing,
        Stage::Security,
        Stage::Approval,
        Stage::Submission,
        Stage::Done,
    ];
    let values: Vec<u8> = path.iter().map(|stage| stage.milestone().value()).collect();
    assert!(values.windows(2).all(|pair| matches!(pair, [a, b] if a <= b)));
    assert_eq!(Stage::Approval.milestone().value(), 95);
}
