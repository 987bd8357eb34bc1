//! Error types for task domain validation, parsing, and transitions.

use super::{InvalidAmount, ParticipantId, TaskEventKind, TaskId, TaskState};
use thiserror::Error;

/// Errors returned while constructing domain values or planning transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The requested event is not legal from the task's current state.
    #[error("cannot {event} task {task_id} while it is {from}")]
    InvalidStateTransition {
        /// Task identifier.
        task_id: TaskId,
        /// State the task was in when the event was requested.
        from: TaskState,
        /// Requested event.
        event: TaskEventKind,
    },

    /// The edge exists but its guard rejected the caller or the arguments.
    #[error("cannot {event} task {task_id}: {violation}")]
    GuardRejected {
        /// Task identifier.
        task_id: TaskId,
        /// Requested event.
        event: TaskEventKind,
        /// Guard that failed.
        violation: GuardViolation,
    },

    /// A transition was applied without an outcome its plan required.
    #[error("transition {event} on task {task_id} is missing the {missing} outcome")]
    IncompleteTransition {
        /// Task identifier.
        task_id: TaskId,
        /// Event being applied.
        event: TaskEventKind,
        /// Name of the missing step outcome.
        missing: &'static str,
    },

    /// Persisted task data violates a task invariant.
    #[error("persisted task {task_id} is inconsistent: {reason}")]
    InconsistentTask {
        /// Task identifier.
        task_id: TaskId,
        /// Invariant that does not hold.
        reason: &'static str,
    },

    /// A monetary value was malformed.
    #[error(transparent)]
    InvalidAmount(#[from] InvalidAmount),

    /// Only callers acting as a client may create tasks.
    #[error("participant {0} must act as a client to create a task")]
    CreatorNotClient(ParticipantId),

    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The participant identifier is empty or contains whitespace.
    #[error("invalid participant identifier '{0}'")]
    InvalidParticipantId(String),

    /// The repository name does not follow `owner/repo` format.
    #[error("invalid repository name '{0}', expected owner/repo")]
    InvalidRepository(String),

    /// The branch name is empty, contains a colon, or is too long.
    #[error("invalid branch name '{0}'")]
    InvalidBranchName(String),

    /// The pull request number is invalid.
    #[error("invalid pull request number {0}, expected a positive integer")]
    InvalidPullRequestNumber(u64),
}

/// Guard checks attached to individual edges of the task state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardViolation {
    /// Only the task's client may perform the event.
    CallerNotClient(ParticipantId),
    /// Only the assigned developer may perform the event.
    CallerNotAssignedDeveloper(ParticipantId),
    /// Only a caller acting as a developer may apply.
    CallerNotDeveloper(ParticipantId),
    /// Only an arbiter may resolve disputes.
    CallerNotArbiter(ParticipantId),
    /// Only the client or the assigned developer may raise a dispute.
    CallerNotParty(ParticipantId),
    /// The developer has already applied to the task.
    AlreadyApplied(ParticipantId),
    /// The developer being assigned never applied.
    NotAnApplicant(ParticipantId),
    /// The client cannot apply to their own task.
    ClientCannotApply(ParticipantId),
    /// Pull request review has not been completed.
    ReviewNotSatisfied,
}

impl std::fmt::Display for GuardViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CallerNotClient(id) => write!(f, "{id} is not the client of this task"),
            Self::CallerNotAssignedDeveloper(id) => {
                write!(f, "{id} is not the developer assigned to this task")
            }
            Self::CallerNotDeveloper(id) => write!(f, "{id} is not acting as a developer"),
            Self::CallerNotArbiter(id) => write!(f, "{id} is not an arbiter"),
            Self::CallerNotParty(id) => write!(f, "{id} is not a party to this task"),
            Self::AlreadyApplied(id) => write!(f, "{id} has already applied"),
            Self::NotAnApplicant(id) => write!(f, "{id} has not applied to this task"),
            Self::ClientCannotApply(id) => write!(f, "{id} cannot apply to their own task"),
            Self::ReviewNotSatisfied => f.write_str("pull request review is not complete"),
        }
    }
}

/// Error returned while parsing task states from persistence or callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task state: {0}")]
pub struct ParseTaskStateError(pub String);
