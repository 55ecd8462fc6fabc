//! Research stage agent.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use super::prompts;
use crate::pipeline::{
    domain::{AgentKind, ResearchFindings, StagePayload, StageReport},
    ports::{LanguageModel, StageAgent, StageAgentError, StageContext},
};

/// Asks the model for background notes on the task.
pub struct ResearchAgent<M>
where
    M: LanguageModel,
{
    model: Arc<M>,
}

impl<M> ResearchAgent<M>
where
    M: LanguageModel,
{
    /// Creates a research agent backed by `model`.
    #[must_use]
    pub const fn new(model: Arc<M>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<M> StageAgent for ResearchAgent<M>
where
    M: LanguageModel,
{
    fn kind(&self) -> AgentKind {
        AgentKind::Research
    }

    async fn execute(&self, context: &StageContext) -> Result<StageReport, StageAgentError> {
        let prompt = prompts::research(context).map_err(StageAgentError::collaborator)?;
        match self.model.complete(&prompt).await {
            Ok(notes) => Ok(StageReport::success(StagePayload::Research(
                ResearchFindings {
                    notes: notes.trim().to_owned(),
                },
            ))),
            Err(err) => {
                warn!(run_id = %context.run_id(), error = %err, "research model call failed");
                Ok(StageReport::failure(format!("research failed: {err}")))
            }
        }
    }
}
