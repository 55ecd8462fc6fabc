//! Change-submission stage agent.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::pipeline::{
    domain::{AgentKind, StagePayload, StageReport},
    ports::{ChangeSubmitter, StageAgent, StageAgentError, StageContext, SubmissionRequest},
};

/// Submits the approved changes through a [`ChangeSubmitter`].
pub struct SubmissionAgent<S>
where
    S: ChangeSubmitter,
{
    submitter: Arc<S>,
}

impl<S> SubmissionAgent<S>
where
    S: ChangeSubmitter,
{
    /// Creates a submission agent backed by `submitter`.
    #[must_use]
    pub const fn new(submitter: Arc<S>) -> Self {
        Self { submitter }
    }
}

fn branch_for(context: &StageContext) -> String {
    format!("gropius/{}", context.run_id().into_inner().simple())
}

fn body_for(context: &StageContext) -> String {
    let task = context.task();
    task.description().map_or_else(
        || task.prompt().to_owned(),
        |description| format!("{description}\n\n{}", task.prompt()),
    )
}

#[async_trait]
impl<S> StageAgent for SubmissionAgent<S>
where
    S: ChangeSubmitter,
{
    fn kind(&self) -> AgentKind {
        AgentKind::Submission
    }

    async fn execute(&self, context: &StageContext) -> Result<StageReport, StageAgentError> {
        let changes = context.code().cloned().ok_or(StageAgentError::MissingInput {
            kind: AgentKind::Submission,
            input: "coding",
        })?;
        let request = SubmissionRequest {
            run_id: context.run_id(),
            repository: context.repository().clone(),
            credentials: context.credentials().clone(),
            branch: branch_for(context),
            title: context.task().title().to_owned(),
            body: body_for(context),
            changes,
        };
        match self.submitter.submit(&request).await {
            Ok(receipt) => {
                info!(
                    run_id = %context.run_id(),
                    reference = %receipt.reference,
                    "change submitted"
                );
                Ok(StageReport::success(StagePayload::Submission(receipt)))
            }
            Err(err) => {
                warn!(run_id = %context.run_id(), error = %err, "change submission failed");
                Ok(StageReport::failure(err.to_string()))
            }
        }
    }
}
