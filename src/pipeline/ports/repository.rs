//! Repository port for task run persistence.

use crate::pipeline::domain::{RunId, TaskRun};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task run repository operations.
pub type TaskRunRepositoryResult<T> = Result<T, TaskRunRepositoryError>;

/// Task run persistence contract.
#[async_trait]
pub trait TaskRunRepository: Send + Sync {
    /// Stores a new run.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRunRepositoryError::DuplicateRun`] when the run ID
    /// already exists.
    async fn store(&self, run: &TaskRun) -> TaskRunRepositoryResult<()>;

    /// Persists changes to an existing run.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRunRepositoryError::NotFound`] when the run does not
    /// exist.
    async fn update(&self, run: &TaskRun) -> TaskRunRepositoryResult<()>;

    /// Finds a run by identifier.
    ///
    /// Returns `None` when the run does not exist.
    async fn find_by_id(&self, id: RunId) -> TaskRunRepositoryResult<Option<TaskRun>>;
}

/// Errors returned by task run repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRunRepositoryError {
    /// A run with the same identifier already exists.
    #[error("duplicate run identifier: {0}")]
    DuplicateRun(RunId),

    /// The run was not found.
    #[error("run not found: {0}")]
    NotFound(RunId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRunRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
