//! Security stage agent.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::pipeline::{
    domain::{AgentKind, StagePayload, StageReport},
    ports::{SecretScanner, StageAgent, StageAgentError, StageContext},
};

/// Runs the secret scanner over the working tree.
pub struct SecurityAgent<S>
where
    S: SecretScanner,
{
    scanner: Arc<S>,
}

impl<S> SecurityAgent<S>
where
    S: SecretScanner,
{
    /// Creates a security agent backed by `scanner`.
    #[must_use]
    pub const fn new(scanner: Arc<S>) -> Self {
        Self { scanner }
    }
}

#[async_trait]
impl<S> StageAgent for SecurityAgent<S>
where
    S: SecretScanner,
{
    fn kind(&self) -> AgentKind {
        AgentKind::Security
    }

    async fn execute(&self, context: &StageContext) -> Result<StageReport, StageAgentError> {
        let root = context.require_working_tree()?;
        match self.scanner.scan(root).await {
            Ok(report) if report.passed() => {
                Ok(StageReport::success(StagePayload::Security(report)))
            }
            Ok(report) => {
                let count = report.findings.len();
                warn!(run_id = %context.run_id(), findings = count, "secrets detected");
                Ok(StageReport::failure_with(
                    StagePayload::Security(report),
                    format!("{count} finding(s)"),
                ))
            }
            Err(err) => Ok(StageReport::failure(err.to_string())),
        }
    }
}
