//! Execution service tests covering every exit path.

use crate::sandbox::{
    adapters::{ScriptedCommand, ScriptedSandboxRuntime},
    domain::{CommandOutput, ResourceLimits, SandboxLifecycle, SandboxRequest},
    services::{ExecutionSandbox, SandboxError},
};
use rstest::{fixture, rstest};
use std::sync::Arc;
use std::time::Duration;

const IMAGE: &str = "python:3.11-slim";

struct Harness {
    runtime: Arc<ScriptedSandboxRuntime>,
    sandbox: ExecutionSandbox<ScriptedSandboxRuntime>,
}

#[fixture]
fn harness() -> Harness {
    let runtime = Arc::new(ScriptedSandboxRuntime::new());
    let sandbox = ExecutionSandbox::new(Arc::clone(&runtime), IMAGE);
    Harness { runtime, sandbox }
}

fn request(command: &str, timeout: Duration) -> SandboxRequest {
    SandboxRequest::new(command, "/srv/checkout", timeout).expect("valid request")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn successful_command_reclaims_environment(harness: Harness) {
    harness
        .runtime
        .script("pytest", ScriptedCommand::exits(0, "3 passed"))
        .expect("script");

    let outcome = harness
        .sandbox
        .execute(&request("pytest", Duration::from_secs(5)))
        .await;

    let output = outcome.result().as_ref().expect("command should run");
    assert_eq!(output.stdout(), "3 passed");
    assert_eq!(
        outcome.handle().history(),
        &[
            SandboxLifecycle::Created,
            SandboxLifecycle::Running,
            SandboxLifecycle::Exited,
            SandboxLifecycle::Reclaimed,
        ]
    );
    assert_eq!(harness.runtime.destroy_count(outcome.handle().id()), 1);
    assert_eq!(harness.runtime.live_environments(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn non_zero_exit_is_a_result_not_an_error(harness: Harness) {
    harness
        .runtime
        .script(
            "pytest",
            ScriptedCommand::Completes {
                output: CommandOutput::new(1, "1 failed", "assertion error"),
                delay: Duration::ZERO,
            },
        )
        .expect("script");

    let output = harness
        .sandbox
        .run(&request("pytest", Duration::from_secs(5)))
        .await
        .expect("non-zero exit should be returned as output");

    assert_eq!(output.exit_code(), 1);
    assert!(!output.succeeded());
    assert_eq!(output.combined(), "1 failedassertion error");
}

#[rstest]
#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn hanging_command_times_out_and_is_reclaimed(harness: Harness) {
    harness
        .runtime
        .script("sleep 1000", ScriptedCommand::Hangs)
        .expect("script");

    let outcome = harness
        .sandbox
        .execute(&request("sleep 1000", Duration::from_secs(2)))
        .await;

    assert!(matches!(
        outcome.result(),
        Err(SandboxError::TimedOut { timeout, .. }) if *timeout == Duration::from_secs(2)
    ));
    assert!(outcome.handle().history().contains(&SandboxLifecycle::TimedOut));
    assert!(outcome.handle().is_reclaimed());
    assert_eq!(harness.runtime.live_environments(), 0);
}

#[rstest]
#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn slow_command_within_deadline_completes(harness: Harness) {
    harness
        .runtime
        .script(
            "make check",
            ScriptedCommand::Completes {
                output: CommandOutput::new(0, "ok", ""),
                delay: Duration::from_secs(3),
            },
        )
        .expect("script");

    let result = harness
        .sandbox
        .run(&request("make check", Duration::from_secs(10)))
        .await;

    assert!(result.is_ok());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn creation_failure_is_reported_without_leaking(harness: Harness) {
    harness
        .runtime
        .fail_creation("docker daemon unreachable")
        .expect("configure failure");

    let outcome = harness
        .sandbox
        .execute(&request("pytest", Duration::from_secs(5)))
        .await;

    assert!(matches!(
        outcome.result(),
        Err(SandboxError::CreationFailed { reason, .. }) if reason.contains("unreachable")
    ));
    assert_eq!(
        outcome.handle().history(),
        &[
            SandboxLifecycle::Created,
            SandboxLifecycle::Errored,
            SandboxLifecycle::Reclaimed,
        ]
    );
    assert!(harness.runtime.executed_commands().is_empty());
    assert_eq!(harness.runtime.live_environments(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn exec_failure_is_an_execution_error(harness: Harness) {
    harness
        .runtime
        .script("pytest", ScriptedCommand::Fails("exec refused".to_owned()))
        .expect("script");

    let result = harness
        .sandbox
        .run(&request("pytest", Duration::from_secs(5)))
        .await;

    assert!(matches!(result, Err(SandboxError::ExecutionFailed { .. })));
    assert_eq!(harness.runtime.live_environments(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn request_limits_reach_the_runtime(harness: Harness) {
    let limited = request("pytest", Duration::from_secs(5))
        .with_limits(ResourceLimits::new(Some(256)).with_network(false));

    harness.sandbox.run(&limited).await.expect("run");

    let spec = harness.runtime.last_spec().expect("environment was created");
    assert_eq!(spec.image, IMAGE);
    assert_eq!(spec.limits.memory_limit_mb(), Some(256));
    assert!(!spec.limits.network_enabled());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn abandoned_execution_is_reclaimed_in_background(harness: Harness) {
    harness
        .runtime
        .script("sleep 1000", ScriptedCommand::Hangs)
        .expect("script");

    let sandbox = harness.sandbox.clone();
    let task = tokio::spawn(async move {
        sandbox
            .execute(&request("sleep 1000", Duration::from_secs(600)))
            .await
    });

    for _ in 0..100 {
        if !harness.runtime.executed_commands().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    task.abort();
    let joined = task.await;
    assert!(joined.is_err(), "execution should have been cancelled");

    for _ in 0..100 {
        if harness.runtime.live_environments() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(harness.runtime.live_environments(), 0);
    assert_eq!(harness.runtime.created().len(), 1);
}
