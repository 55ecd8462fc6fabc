//! Change submission port (branch push and change request).

use crate::pipeline::domain::{
    CodeChanges, CredentialsHandle, RepositoryInfo, RunId, SubmissionReceipt,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Everything needed to submit a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    /// Run submitting the change.
    pub run_id: RunId,
    /// Target repository.
    pub repository: RepositoryInfo,
    /// Credentials to act with.
    pub credentials: CredentialsHandle,
    /// Branch to push to.
    pub branch: String,
    /// Change request title.
    pub title: String,
    /// Change request body.
    pub body: String,
    /// Files to submit.
    pub changes: CodeChanges,
}

/// Pushes a change to the source host.
#[async_trait]
pub trait ChangeSubmitter: Send + Sync {
    /// Submits the change and returns where it landed.
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError`] when the host rejects the change.
    async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, SubmissionError>;
}

/// Errors returned by submitters.
#[derive(Debug, Clone, Error)]
pub enum SubmissionError {
    /// The host rejected the change.
    #[error("submission rejected: {0}")]
    Rejected(String),

    /// Transport failure.
    #[error("submission failed: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl SubmissionError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
