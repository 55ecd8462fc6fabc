//! Test-execution stage agent.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

use super::detection::TestDetector;
use crate::pipeline::{
    domain::{AgentKind, StagePayload, StageReport, TestReport},
    ports::{StageAgent, StageAgentError, StageContext},
};
use crate::sandbox::{
    domain::{ResourceLimits, SandboxRequest},
    ports::SandboxRuntime,
    services::{ExecutionSandbox, SandboxError},
};

/// Runs the detected test command in a sandbox.
pub struct TestingAgent<R>
where
    R: SandboxRuntime + 'static,
{
    sandbox: ExecutionSandbox<R>,
    timeout: Duration,
    limits: ResourceLimits,
    detector: TestDetector,
}

impl<R> TestingAgent<R>
where
    R: SandboxRuntime + 'static,
{
    /// Creates a testing agent.
    #[must_use]
    pub const fn new(
        sandbox: ExecutionSandbox<R>,
        timeout: Duration,
        limits: ResourceLimits,
    ) -> Self {
        Self {
            sandbox,
            timeout,
            limits,
            detector: TestDetector,
        }
    }
}

#[async_trait]
impl<R> StageAgent for TestingAgent<R>
where
    R: SandboxRuntime + 'static,
{
    fn kind(&self) -> AgentKind {
        AgentKind::Testing
    }

    async fn execute(&self, context: &StageContext) -> Result<StageReport, StageAgentError> {
        let root = context.require_working_tree()?;
        let Some(framework) = self
            .detector
            .detect(root)
            .await
            .map_err(StageAgentError::collaborator)?
        else {
            info!(run_id = %context.run_id(), "no test framework detected");
            return Ok(StageReport::success(StagePayload::Testing(TestReport::default())));
        };

        let request = SandboxRequest::new(framework.command, root, self.timeout)
            .map_err(StageAgentError::collaborator)?
            .with_limits(self.limits);
        let mut report = TestReport {
            framework: Some(framework.name.to_owned()),
            command: Some(framework.command.to_owned()),
            tests_run: 1,
            ..TestReport::default()
        };

        match self.sandbox.run(&request).await {
            Ok(output) => {
                report.exit_code = Some(output.exit_code());
                report.output = output.combined();
                if output.succeeded() {
                    report.tests_passed = 1;
                    info!(run_id = %context.run_id(), framework = framework.name, "tests passed");
                    Ok(StageReport::success(StagePayload::Testing(report)))
                } else {
                    report.tests_failed = 1;
                    let message = format!("tests failed with exit code {}", output.exit_code());
                    warn!(run_id = %context.run_id(), framework = framework.name, %message);
                    Ok(StageReport::failure_with(StagePayload::Testing(report), message))
                }
            }
            Err(err) => {
                report.tests_failed = 1;
                report.timed_out = err.is_timeout();
                report.output = err.to_string();
                let message = match &err {
                    SandboxError::TimedOut { timeout, .. } => {
                        format!("test command timed out after {}s", timeout.as_secs())
                    }
                    other => format!("test sandbox failed: {other}"),
                };
                warn!(run_id = %context.run_id(), error = %err, "test execution did not complete");
                Ok(StageReport::failure_with(StagePayload::Testing(report), message))
            }
        }
    }
}
