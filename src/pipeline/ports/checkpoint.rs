//! Append-only checkpoint persistence port.

use crate::pipeline::domain::{Checkpoint, RunId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for checkpoint store operations.
pub type CheckpointStoreResult<T> = Result<T, CheckpointStoreError>;

/// Append-only store keyed by (run, sequence).
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Appends a checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointStoreError::Duplicate`] when the sequence already
    /// exists and [`CheckpointStoreError::OutOfOrder`] when it is not the
    /// next sequence for the run.
    async fn append(&self, checkpoint: &Checkpoint) -> CheckpointStoreResult<()>;

    /// Returns every checkpoint of a run in sequence order.
    async fn list(&self, run_id: RunId) -> CheckpointStoreResult<Vec<Checkpoint>>;

    /// Returns the highest-sequence checkpoint of a run.
    async fn latest(&self, run_id: RunId) -> CheckpointStoreResult<Option<Checkpoint>>;
}

/// Errors returned by checkpoint store implementations.
#[derive(Debug, Clone, Error)]
pub enum CheckpointStoreError {
    /// The (run, sequence) key is already taken.
    #[error("checkpoint {sequence} already exists for run {run_id}")]
    Duplicate {
        /// Run identifier.
        run_id: RunId,
        /// Rejected sequence.
        sequence: u64,
    },

    /// The sequence skips ahead or goes back.
    #[error("checkpoint {sequence} for run {run_id} is out of order, expected {expected}")]
    OutOfOrder {
        /// Run identifier.
        run_id: RunId,
        /// Rejected sequence.
        sequence: u64,
        /// Next valid sequence.
        expected: u64,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl CheckpointStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
