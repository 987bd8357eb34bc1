//! Task states, events, and the transition table.

use super::{ParseTaskStateError, ParticipantId, WorkspaceRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Task has been posted and accepts applications.
    Open,
    /// At least one developer has applied.
    Applied,
    /// A developer was assigned, the workspace provisioned, and escrow funded.
    Assigned,
    /// The assigned developer is working on the task.
    InProgress,
    /// Work has been submitted for the client's review.
    InReview,
    /// Work was accepted and escrow released.
    Completed,
    /// Task was cancelled and escrow refunded.
    Cancelled,
    /// A party raised a dispute that awaits arbitration.
    Disputed,
}

impl TaskState {
    /// Every state, in lifecycle order.
    pub const ALL: [Self; 8] = [
        Self::Open,
        Self::Applied,
        Self::Assigned,
        Self::InProgress,
        Self::InReview,
        Self::Completed,
        Self::Cancelled,
        Self::Disputed,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Applied => "applied",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::InReview => "in_review",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Disputed => "disputed",
        }
    }

    /// Returns `true` for states with no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns `true` for states that carry an assigned developer.
    #[must_use]
    pub const fn has_assigned_developer(self) -> bool {
        matches!(
            self,
            Self::Assigned | Self::InProgress | Self::InReview | Self::Completed | Self::Disputed
        )
    }

    /// Returns the state reached by `event`, or `None` when the edge does
    /// not exist.
    #[must_use]
    pub const fn target(self, event: &TaskEvent) -> Option<Self> {
        match (self, event) {
            (Self::Open | Self::Applied, TaskEvent::Apply(_)) => Some(Self::Applied),
            (Self::Applied, TaskEvent::Assign(_)) => Some(Self::Assigned),
            (Self::Assigned, TaskEvent::StartWork) | (Self::InReview, TaskEvent::RequestChanges) => {
                Some(Self::InProgress)
            }
            (Self::InProgress, TaskEvent::SubmitForReview) => Some(Self::InReview),
            (Self::InReview, TaskEvent::Approve) => Some(Self::Completed),
            (Self::Open | Self::Applied | Self::Assigned | Self::InProgress, TaskEvent::Cancel)
            | (Self::Disputed, TaskEvent::ResolveDispute(DisputeResolution::Cancel)) => {
                Some(Self::Cancelled)
            }
            (Self::InProgress | Self::InReview, TaskEvent::RaiseDispute) => Some(Self::Disputed),
            (Self::Disputed, TaskEvent::ResolveDispute(DisputeResolution::Resume)) => {
                Some(Self::InProgress)
            }
            _ => None,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskState {
    type Error = ParseTaskStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| ParseTaskStateError(value.to_owned()))
    }
}

/// Outcome an arbiter chooses for a disputed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeResolution {
    /// Work continues under the same developer.
    Resume,
    /// The task is cancelled and the client refunded.
    Cancel,
}

/// Event requested against a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskEvent {
    /// A developer applies to work on the task.
    Apply(ParticipantId),
    /// The client assigns one of the applicants.
    Assign(ParticipantId),
    /// The assigned developer starts work.
    StartWork,
    /// The assigned developer submits work for review.
    SubmitForReview,
    /// The client accepts the submitted work.
    Approve,
    /// The client sends the work back for changes.
    RequestChanges,
    /// The client cancels the task.
    Cancel,
    /// A party disputes the task.
    RaiseDispute,
    /// An arbiter resolves a dispute.
    ResolveDispute(DisputeResolution),
}

impl TaskEvent {
    /// Returns the payload-free kind of this event.
    #[must_use]
    pub const fn kind(&self) -> TaskEventKind {
        match self {
            Self::Apply(_) => TaskEventKind::Apply,
            Self::Assign(_) => TaskEventKind::Assign,
            Self::StartWork => TaskEventKind::StartWork,
            Self::SubmitForReview => TaskEventKind::SubmitForReview,
            Self::Approve => TaskEventKind::Approve,
            Self::RequestChanges => TaskEventKind::RequestChanges,
            Self::Cancel => TaskEventKind::Cancel,
            Self::RaiseDispute => TaskEventKind::RaiseDispute,
            Self::ResolveDispute(_) => TaskEventKind::ResolveDispute,
        }
    }
}

/// Payload-free event discriminant used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventKind {
    /// See [`TaskEvent::Apply`].
    Apply,
    /// See [`TaskEvent::Assign`].
    Assign,
    /// See [`TaskEvent::StartWork`].
    StartWork,
    /// See [`TaskEvent::SubmitForReview`].
    SubmitForReview,
    /// See [`TaskEvent::Approve`].
    Approve,
    /// See [`TaskEvent::RequestChanges`].
    RequestChanges,
    /// See [`TaskEvent::Cancel`].
    Cancel,
    /// See [`TaskEvent::RaiseDispute`].
    RaiseDispute,
    /// See [`TaskEvent::ResolveDispute`].
    ResolveDispute,
}

impl TaskEventKind {
    /// Returns the canonical name of the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Apply => "apply",
            Self::Assign => "assign",
            Self::StartWork => "start_work",
            Self::SubmitForReview => "submit_for_review",
            Self::Approve => "approve",
            Self::RequestChanges => "request_changes",
            Self::Cancel => "cancel",
            Self::RaiseDispute => "raise_dispute",
            Self::ResolveDispute => "resolve_dispute",
        }
    }
}

impl fmt::Display for TaskEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External step a transition requires before it may be persisted.
///
/// Steps are listed in the order they must be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionStep {
    /// Create (or reuse) the task's workspace.
    ProvisionWorkspace,
    /// Grant the developer access to the provisioned workspace.
    AddCollaborator(ParticipantId),
    /// Revoke a participant's access to the task's workspace.
    RemoveCollaborator(ParticipantId),
    /// Deposit the quoted total into escrow.
    DepositEscrow,
    /// Confirm pull request review is complete.
    VerifyReview(WorkspaceRef),
    /// Release escrow to the developer and platform.
    ReleaseEscrow,
    /// Return whatever the task holds in escrow to the client.
    RefundEscrow,
    /// Delete the workspace.
    TeardownWorkspace(WorkspaceRef),
    /// Delete any workspace the code host holds for the task, even one the
    /// task never recorded.
    ReclaimWorkspace,
}

impl TransitionStep {
    /// Returns a short step name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ProvisionWorkspace => "provision_workspace",
            Self::AddCollaborator(_) => "add_collaborator",
            Self::RemoveCollaborator(_) => "remove_collaborator",
            Self::DepositEscrow => "deposit_escrow",
            Self::VerifyReview(_) => "verify_review",
            Self::ReleaseEscrow => "release_escrow",
            Self::RefundEscrow => "refund_escrow",
            Self::TeardownWorkspace(_) => "teardown_workspace",
            Self::ReclaimWorkspace => "reclaim_workspace",
        }
    }
}
