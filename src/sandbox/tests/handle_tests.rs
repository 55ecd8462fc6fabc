//! Lifecycle and request validation tests.

use crate::sandbox::domain::{
    SandboxDomainError, SandboxHandle, SandboxId, SandboxLifecycle, SandboxRequest,
};
use rstest::rstest;
use std::time::Duration;

#[rstest]
#[case(SandboxLifecycle::Created, SandboxLifecycle::Running, true)]
#[case(SandboxLifecycle::Created, SandboxLifecycle::Errored, true)]
#[case(SandboxLifecycle::Created, SandboxLifecycle::Reclaimed, false)]
#[case(SandboxLifecycle::Running, SandboxLifecycle::Exited, true)]
#[case(SandboxLifecycle::Running, SandboxLifecycle::TimedOut, true)]
#[case(SandboxLifecycle::Running, SandboxLifecycle::Reclaimed, false)]
#[case(SandboxLifecycle::Exited, SandboxLifecycle::Reclaimed, true)]
#[case(SandboxLifecycle::TimedOut, SandboxLifecycle::Reclaimed, true)]
#[case(SandboxLifecycle::Errored, SandboxLifecycle::Reclaimed, true)]
#[case(SandboxLifecycle::Reclaimed, SandboxLifecycle::Running, false)]
#[case(SandboxLifecycle::Exited, SandboxLifecycle::Running, false)]
fn lifecycle_transitions(
    #[case] from: SandboxLifecycle,
    #[case] to: SandboxLifecycle,
    #[case] allowed: bool,
) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[rstest]
#[case("created", SandboxLifecycle::Created)]
#[case("timed_out", SandboxLifecycle::TimedOut)]
#[case(" Reclaimed ", SandboxLifecycle::Reclaimed)]
fn lifecycle_parses_canonical_names(#[case] raw: &str, #[case] expected: SandboxLifecycle) {
    assert_eq!(SandboxLifecycle::try_from(raw), Ok(expected));
}

#[rstest]
fn lifecycle_rejects_unknown_names() {
    assert!(SandboxLifecycle::try_from("paused").is_err());
}

#[rstest]
fn handle_records_history_and_rejects_illegal_moves() {
    let mut handle = SandboxHandle::new(SandboxId::new(), "pytest");
    handle
        .transition_to(SandboxLifecycle::Running)
        .expect("created -> running");
    handle
        .transition_to(SandboxLifecycle::TimedOut)
        .expect("running -> timed_out");

    let result = handle.transition_to(SandboxLifecycle::Running);
    assert!(matches!(
        result,
        Err(SandboxDomainError::InvalidLifecycleTransition {
            from: SandboxLifecycle::TimedOut,
            to: SandboxLifecycle::Running,
            ..
        })
    ));

    handle
        .transition_to(SandboxLifecycle::Reclaimed)
        .expect("timed_out -> reclaimed");
    assert!(handle.is_reclaimed());
    assert_eq!(
        handle.history(),
        &[
            SandboxLifecycle::Created,
            SandboxLifecycle::Running,
            SandboxLifecycle::TimedOut,
            SandboxLifecycle::Reclaimed,
        ]
    );
}

#[rstest]
#[case("   ")]
#[case("")]
fn request_rejects_blank_commands(#[case] command: &str) {
    let result = SandboxRequest::new(command, "/tmp", Duration::from_secs(1));
    assert_eq!(result, Err(SandboxDomainError::EmptyCommand));
}

#[rstest]
fn request_rejects_zero_timeout() {
    let result = SandboxRequest::new("pytest", "/tmp", Duration::ZERO);
    assert_eq!(result, Err(SandboxDomainError::ZeroTimeout));
}

#[rstest]
fn request_trims_command_and_disables_network_by_default() {
    let request =
        SandboxRequest::new("  cargo test  ", "/tmp", Duration::from_secs(5)).expect("valid");
    assert_eq!(request.command(), "cargo test");
    assert!(!request.limits().network_enabled());
    assert_eq!(request.limits().memory_limit_mb(), None);
}
