//! Persistence port for versioned task records.

use crate::task::domain::{Task, TaskId, TaskVersion};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// Task paired with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedTask {
    /// Stored task.
    pub task: Task,
    /// Version of the stored record.
    pub version: TaskVersion,
}

/// Outcome of a compare-and-swap save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The record was written and now carries the returned version.
    Saved(TaskVersion),
    /// The stored version no longer matches the expected version.
    VersionMismatch,
}

/// Task persistence contract.
///
/// Implementations must make [`TaskStore::save`] atomic: the record is
/// replaced only when its stored version equals `expected`.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Stores a new task at [`TaskVersion::INITIAL`].
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::DuplicateTask`] when the task ID already
    /// exists.
    async fn insert(&self, task: &Task) -> TaskStoreResult<TaskVersion>;

    /// Loads a task with its current version.
    ///
    /// Returns `None` when the task does not exist.
    async fn load(&self, id: TaskId) -> TaskStoreResult<Option<VersionedTask>>;

    /// Replaces a task if its stored version still equals `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist.
    async fn save(&self, task: &Task, expected: TaskVersion) -> TaskStoreResult<SaveOutcome>;
}

/// Errors returned by task store implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskStoreError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
