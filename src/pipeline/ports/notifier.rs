//! Progress notification port.

use crate::pipeline::domain::ProgressEvent;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Fans progress events out to observers.
#[async_trait]
pub trait ProgressNotifier: Send + Sync {
    /// Publishes one event.
    ///
    /// # Errors
    ///
    /// Returns [`NotifierError`] when the transport fails. The workflow logs
    /// such errors and carries on.
    async fn notify(&self, event: &ProgressEvent) -> Result<(), NotifierError>;
}

/// Errors returned by notification transports.
#[derive(Debug, Clone, Error)]
pub enum NotifierError {
    /// Transport failure.
    #[error("transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl NotifierError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
