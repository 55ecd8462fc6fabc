//! In-memory task run repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::pipeline::{
    domain::{RunId, TaskRun},
    ports::{TaskRunRepository, TaskRunRepositoryError, TaskRunRepositoryResult},
};

/// Thread-safe in-memory task run repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRunRepository {
    state: Arc<RwLock<HashMap<RunId, TaskRun>>>,
}

impl InMemoryTaskRunRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl ToString) -> TaskRunRepositoryError {
    TaskRunRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TaskRunRepository for InMemoryTaskRunRepository {
    async fn store(&self, run: &TaskRun) -> TaskRunRepositoryResult<()> {
        let mut runs = self.state.write().map_err(lock_error)?;
        if runs.contains_key(&run.id()) {
            return Err(TaskRunRepositoryError::DuplicateRun(run.id()));
        }
        runs.insert(run.id(), run.clone());
        Ok(())
    }

    async fn update(&self, run: &TaskRun) -> TaskRunRepositoryResult<()> {
        let mut runs = self.state.write().map_err(lock_error)?;
        let stored = runs
            .get_mut(&run.id())
            .ok_or(TaskRunRepositoryError::NotFound(run.id()))?;
        *stored = run.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: RunId) -> TaskRunRepositoryResult<Option<TaskRun>> {
        let runs = self.state.read().map_err(lock_error)?;
        Ok(runs.get(&id).cloned())
    }
}
