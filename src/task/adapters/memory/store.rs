//! In-memory versioned task store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{Task, TaskId, TaskVersion},
    ports::{SaveOutcome, TaskStore, TaskStoreError, TaskStoreResult, VersionedTask},
};

/// Thread-safe in-memory task store with compare-and-swap saves.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<HashMap<TaskId, VersionedTask>>>,
}

impl InMemoryTaskStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl ToString) -> TaskStoreError {
    TaskStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: &Task) -> TaskStoreResult<TaskVersion> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.contains_key(&task.id()) {
            return Err(TaskStoreError::DuplicateTask(task.id()));
        }
        state.insert(
            task.id(),
            VersionedTask {
                task: task.clone(),
                version: TaskVersion::INITIAL,
            },
        );
        Ok(TaskVersion::INITIAL)
    }

    async fn load(&self, id: TaskId) -> TaskStoreResult<Option<VersionedTask>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.get(&id).cloned())
    }

    async fn save(&self, task: &Task, expected: TaskVersion) -> TaskStoreResult<SaveOutcome> {
        let mut state = self.state.write().map_err(lock_error)?;
        let stored = state
            .get_mut(&task.id())
            .ok_or_else(|| TaskStoreError::NotFound(task.id()))?;
        if stored.version != expected {
            return Ok(SaveOutcome::VersionMismatch);
        }
        let next_version = expected.next();
        *stored = VersionedTask {
            task: task.clone(),
            version: next_version,
        };
        Ok(SaveOutcome::Saved(next_version))
    }
}
