//! Language model port used by the research and coding agents.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Completes a prompt.
///
/// Constructed explicitly and passed to each agent, never shared through a
/// process-wide instance.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the model's completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`LanguageModelError`] when the model cannot answer.
    async fn complete(&self, prompt: &str) -> Result<String, LanguageModelError>;
}

/// Errors returned by model clients.
#[derive(Debug, Clone, Error)]
pub enum LanguageModelError {
    /// The provider refused or is unreachable.
    #[error("model unavailable: {0}")]
    Unavailable(String),

    /// Any other client failure.
    #[error("model error: {0}")]
    Client(Arc<dyn std::error::Error + Send + Sync>),
}

impl LanguageModelError {
    /// Wraps a client error.
    pub fn client(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Client(Arc::new(err))
    }
}
