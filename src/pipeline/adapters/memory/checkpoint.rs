//! In-memory append-only checkpoint store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::pipeline::{
    domain::{Checkpoint, RunId},
    ports::{CheckpointStore, CheckpointStoreError, CheckpointStoreResult},
};

/// Thread-safe in-memory checkpoint store.
///
/// Sequences per run must start at zero and increase by one.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointStore {
    state: Arc<RwLock<HashMap<RunId, Vec<Checkpoint>>>>,
}

impl InMemoryCheckpointStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a stored checkpoint in place, bypassing append-only rules.
    ///
    /// Exists so tests can simulate storage corruption.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointStoreError::Persistence`] when the lock is
    /// poisoned or the checkpoint was never stored.
    pub fn overwrite(&self, checkpoint: Checkpoint) -> CheckpointStoreResult<()> {
        let mut runs = self.state.write().map_err(lock_error)?;
        let slot = runs
            .get_mut(&checkpoint.run_id())
            .and_then(|entries| {
                entries
                    .iter_mut()
                    .find(|entry| entry.sequence() == checkpoint.sequence())
            })
            .ok_or_else(|| {
                CheckpointStoreError::persistence(std::io::Error::other("no such checkpoint"))
            })?;
        *slot = checkpoint;
        Ok(())
    }
}

fn lock_error(err: impl ToString) -> CheckpointStoreError {
    CheckpointStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn append(&self, checkpoint: &Checkpoint) -> CheckpointStoreResult<()> {
        let mut runs = self.state.write().map_err(lock_error)?;
        let entries = runs.entry(checkpoint.run_id()).or_default();
        let expected = u64::try_from(entries.len()).map_err(lock_error)?;
        let sequence = checkpoint.sequence();
        if sequence < expected {
            return Err(CheckpointStoreError::Duplicate {
                run_id: checkpoint.run_id(),
                sequence,
            });
        }
        if sequence > expected {
            return Err(CheckpointStoreError::OutOfOrder {
                run_id: checkpoint.run_id(),
                sequence,
                expected,
            });
        }
        entries.push(checkpoint.clone());
        Ok(())
    }

    async fn list(&self, run_id: RunId) -> CheckpointStoreResult<Vec<Checkpoint>> {
        let runs = self.state.read().map_err(lock_error)?;
        Ok(runs.get(&run_id).cloned().unwrap_or_default())
    }

    async fn latest(&self, run_id: RunId) -> CheckpointStoreResult<Option<Checkpoint>> {
        let runs = self.state.read().map_err(lock_error)?;
        Ok(runs.get(&run_id).and_then(|entries| entries.last().cloned()))
    }
}
