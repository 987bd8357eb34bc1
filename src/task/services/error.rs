//! Orchestrator error taxonomy.

use crate::task::{
    domain::{InvalidAmount, TaskDomainError, TaskId, TaskVersion},
    ports::{ExternalService, ExternalServiceError, TaskStoreError},
};
use std::fmt;
use thiserror::Error;

/// Machine-readable classification of an [`OrchestratorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrchestratorErrorKind {
    /// The event is not allowed from the task's state or for the caller.
    InvalidTransition,
    /// A monetary input was malformed.
    InvalidAmount,
    /// The task changed concurrently.
    Conflict,
    /// A collaborator failed.
    ExternalService,
    /// The task, or the workspace it refers to, does not exist.
    NotFound,
}

impl OrchestratorErrorKind {
    /// Returns the canonical snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidTransition => "invalid_transition",
            Self::InvalidAmount => "invalid_amount",
            Self::Conflict => "conflict",
            Self::ExternalService => "external_service",
            Self::NotFound => "not_found",
        }
    }
}

impl fmt::Display for OrchestratorErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by [`super::TaskOrchestrator`] operations.
#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    /// The event is not allowed from the task's state, or its guard failed.
    #[error(transparent)]
    InvalidTransition(TaskDomainError),

    /// A monetary input was malformed.
    #[error(transparent)]
    InvalidAmount(#[from] InvalidAmount),

    /// Another transition committed first.
    #[error("task {task_id} was modified concurrently (expected {expected})")]
    Conflict {
        /// Task that changed.
        task_id: TaskId,
        /// Version the failed transition started from.
        expected: TaskVersion,
    },

    /// A collaborator failed permanently or exhausted its retries.
    #[error(transparent)]
    ExternalService(#[from] ExternalServiceError),

    /// The task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The task has no workspace in its current state.
    #[error("task {0} has no workspace")]
    WorkspaceNotFound(TaskId),
}

impl OrchestratorError {
    /// Returns the error's classification.
    #[must_use]
    pub const fn kind(&self) -> OrchestratorErrorKind {
        match self {
            Self::InvalidTransition(_) => OrchestratorErrorKind::InvalidTransition,
            Self::InvalidAmount(_) => OrchestratorErrorKind::InvalidAmount,
            Self::Conflict { .. } => OrchestratorErrorKind::Conflict,
            Self::ExternalService(_) => OrchestratorErrorKind::ExternalService,
            Self::NotFound(_) | Self::WorkspaceNotFound(_) => OrchestratorErrorKind::NotFound,
        }
    }
}

impl From<TaskDomainError> for OrchestratorError {
    fn from(err: TaskDomainError) -> Self {
        match err {
            TaskDomainError::InvalidAmount(amount) => Self::InvalidAmount(amount),
            other => Self::InvalidTransition(other),
        }
    }
}

impl From<TaskStoreError> for OrchestratorError {
    fn from(err: TaskStoreError) -> Self {
        match err {
            TaskStoreError::DuplicateTask(task_id) => Self::Conflict {
                task_id,
                expected: TaskVersion::INITIAL,
            },
            TaskStoreError::NotFound(task_id) => Self::NotFound(task_id),
            TaskStoreError::Persistence(source) => Self::ExternalService(
                ExternalServiceError::backend(ExternalService::Persistence, source.as_ref()),
            ),
        }
    }
}

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
