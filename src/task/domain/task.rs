//! Task aggregate root and transition planning.

use super::{
    Caller, CallerRole, DisputeResolution, EscrowReceipt, EscrowState, GuardViolation,
    InvalidAmount, MinorUnits, ParticipantId, TaskDomainError, TaskEvent, TaskId,
    TaskState, TransitionStep, WorkspaceRef,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    title: String,
    value: MinorUnits,
    client_id: ParticipantId,
    applicants: Vec<ParticipantId>,
    assigned_developer: Option<ParticipantId>,
    workspace: Option<WorkspaceRef>,
    escrow: EscrowState,
    state: TaskState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted title.
    pub title: String,
    /// Persisted task value in minor units.
    pub value: MinorUnits,
    /// Persisted client identifier.
    pub client_id: ParticipantId,
    /// Persisted applicants, in application order.
    pub applicants: Vec<ParticipantId>,
    /// Persisted assigned developer, if any.
    pub assigned_developer: Option<ParticipantId>,
    /// Persisted workspace reference, if any.
    pub workspace: Option<WorkspaceRef>,
    /// Persisted escrow position.
    pub escrow: EscrowState,
    /// Persisted lifecycle state.
    pub state: TaskState,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest lifecycle timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Validated transition, computed without mutating the task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    task_id: TaskId,
    event: TaskEvent,
    from: TaskState,
    to: TaskState,
    steps: Vec<TransitionStep>,
}

impl TransitionPlan {
    /// Returns the task the plan applies to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the planned event.
    #[must_use]
    pub const fn event(&self) -> &TaskEvent {
        &self.event
    }

    /// Returns the state the plan was computed from.
    #[must_use]
    pub const fn from(&self) -> TaskState {
        self.from
    }

    /// Returns the state the plan leads to.
    #[must_use]
    pub const fn to(&self) -> TaskState {
        self.to
    }

    /// Returns the external steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[TransitionStep] {
        &self.steps
    }
}

/// Results gathered while executing a plan's steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcomes {
    /// Workspace returned by provisioning.
    pub workspace: Option<WorkspaceRef>,
    /// Receipt of the escrow deposit.
    pub deposit: Option<EscrowReceipt>,
    /// Receipt of the escrow release.
    pub release: Option<EscrowReceipt>,
    /// Receipt of the escrow refund.
    pub refund: Option<EscrowReceipt>,
    /// Whether the workspace has been torn down.
    pub workspace_torn_down: bool,
}

impl Task {
    /// Creates an open task posted by a client.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::CreatorNotClient`] when the caller is not
    /// acting as a client, [`TaskDomainError::EmptyTitle`] for a blank title,
    /// and [`TaskDomainError::InvalidAmount`] for a zero value.
    pub fn new(
        creator: &Caller,
        title: impl Into<String>,
        value: MinorUnits,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        if creator.role() != CallerRole::Client {
            return Err(TaskDomainError::CreatorNotClient(creator.id().clone()));
        }
        let raw_title = title.into();
        let trimmed_title = raw_title.trim();
        if trimmed_title.is_empty() {
            return Err(TaskDomainError::EmptyTitle);
        }
        if value == MinorUnits::ZERO {
            return Err(InvalidAmount::NonPositivePrincipal(0).into());
        }

        let timestamp = clock.utc();
        Ok(Self {
            id: TaskId::new(),
            title: trimmed_title.to_owned(),
            value,
            client_id: creator.id().clone(),
            applicants: Vec::new(),
            assigned_developer: None,
            workspace: None,
            escrow: EscrowState::Unfunded,
            state: TaskState::Open,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a task from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InconsistentTask`] when the stored fields
    /// violate the developer or workspace invariants.
    pub fn from_persisted(data: PersistedTaskData) -> Result<Self, TaskDomainError> {
        let task = Self {
            id: data.id,
            title: data.title,
            value: data.value,
            client_id: data.client_id,
            applicants: data.applicants,
            assigned_developer: data.assigned_developer,
            workspace: data.workspace,
            escrow: data.escrow,
            state: data.state,
            created_at: data.created_at,
            updated_at: data.updated_at,
        };
        task.check_invariants()?;
        Ok(task)
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the task value in minor units.
    #[must_use]
    pub const fn value(&self) -> MinorUnits {
        self.value
    }

    /// Returns the client who posted the task.
    #[must_use]
    pub const fn client_id(&self) -> &ParticipantId {
        &self.client_id
    }

    /// Returns developers who applied, in application order.
    #[must_use]
    pub fn applicants(&self) -> &[ParticipantId] {
        &self.applicants
    }

    /// Returns the assigned developer, if any.
    #[must_use]
    pub const fn assigned_developer(&self) -> Option<&ParticipantId> {
        self.assigned_developer.as_ref()
    }

    /// Returns the provisioned workspace, if any.
    #[must_use]
    pub const fn workspace(&self) -> Option<&WorkspaceRef> {
        self.workspace.as_ref()
    }

    /// Returns the escrow position.
    #[must_use]
    pub const fn escrow(&self) -> &EscrowState {
        &self.escrow
    }

    /// Returns the task lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest lifecycle timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Validates `event` for `caller` and lists the external steps it needs.
    ///
    /// The task is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] when no edge
    /// exists for the event and [`TaskDomainError::GuardRejected`] when the
    /// edge's guard fails.
    pub fn plan(&self, event: TaskEvent, caller: &Caller) -> Result<TransitionPlan, TaskDomainError> {
        let kind = event.kind();
        let to = self
            .state
            .target(&event)
            .ok_or(TaskDomainError::InvalidStateTransition {
                task_id: self.id,
                from: self.state,
                event: kind,
            })?;
        self.check_guard(&event, caller)
            .map_err(|violation| TaskDomainError::GuardRejected {
                task_id: self.id,
                event: kind,
                violation,
            })?;
        let steps = self.steps_for(&event)?;

        Ok(TransitionPlan {
            task_id: self.id,
            event,
            from: self.state,
            to,
            steps,
        })
    }

    /// Applies a planned transition once its steps have completed.
    ///
    /// Either every field is updated or none is.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] when the plan was
    /// computed for another task or state, and
    /// [`TaskDomainError::IncompleteTransition`] when an outcome the plan
    /// requires is missing.
    pub fn apply(
        &mut self,
        plan: &TransitionPlan,
        outcomes: &StepOutcomes,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        let kind = plan.event.kind();
        if plan.task_id != self.id || plan.from != self.state {
            return Err(TaskDomainError::InvalidStateTransition {
                task_id: self.id,
                from: self.state,
                event: kind,
            });
        }
        let task_id = self.id;
        let missing = |outcome: &'static str| TaskDomainError::IncompleteTransition {
            task_id,
            event: kind,
            missing: outcome,
        };

        match &plan.event {
            TaskEvent::Apply(developer) => self.applicants.push(developer.clone()),
            TaskEvent::Assign(developer) => {
                let workspace = outcomes.workspace.clone().ok_or_else(|| missing("workspace"))?;
                let deposit = outcomes.deposit.clone().ok_or_else(|| missing("deposit"))?;
                self.assigned_developer = Some(developer.clone());
                self.workspace = Some(workspace);
                self.escrow = EscrowState::Deposited { deposit };
            }
            TaskEvent::Approve => {
                let release = outcomes.release.clone().ok_or_else(|| missing("release"))?;
                let deposit = self.escrow.held().cloned().ok_or_else(|| missing("deposit"))?;
                if !outcomes.workspace_torn_down {
                    return Err(missing("teardown"));
                }
                self.escrow = EscrowState::Released { deposit, release };
                self.workspace = None;
            }
            TaskEvent::Cancel | TaskEvent::ResolveDispute(DisputeResolution::Cancel) => {
                let escrow = match self.escrow.held() {
                    Some(deposit) => EscrowState::Refunded {
                        deposit: deposit.clone(),
                        refund: outcomes.refund.clone().ok_or_else(|| missing("refund"))?,
                    },
                    // A reclaimed deposit was never recorded, so there is
                    // nothing to pair the refund receipt with.
                    None => self.escrow.clone(),
                };
                if self.workspace.is_some() && !outcomes.workspace_torn_down {
                    return Err(missing("teardown"));
                }
                self.escrow = escrow;
                self.workspace = None;
                self.assigned_developer = None;
            }
            TaskEvent::StartWork
            | TaskEvent::SubmitForReview
            | TaskEvent::RequestChanges
            | TaskEvent::RaiseDispute
            | TaskEvent::ResolveDispute(DisputeResolution::Resume) => {}
        }

        self.state = plan.to;
        self.touch(clock);
        Ok(())
    }

    fn is_client(&self, caller: &Caller) -> bool {
        caller.role() == CallerRole::Client && caller.id() == &self.client_id
    }

    fn is_assigned_developer(&self, caller: &Caller) -> bool {
        caller.role() == CallerRole::Developer
            && self.assigned_developer.as_ref() == Some(caller.id())
    }

    fn check_guard(&self, event: &TaskEvent, caller: &Caller) -> Result<(), GuardViolation> {
        let caller_id = caller.id().clone();
        match event {
            TaskEvent::Apply(developer) => {
                if caller.role() != CallerRole::Developer || caller.id() != developer {
                    Err(GuardViolation::CallerNotDeveloper(caller_id))
                } else if developer == &self.client_id {
                    Err(GuardViolation::ClientCannotApply(caller_id))
                } else if self.applicants.contains(developer) {
                    Err(GuardViolation::AlreadyApplied(caller_id))
                } else {
                    Ok(())
                }
            }
            TaskEvent::Assign(developer) => {
                if !self.is_client(caller) {
                    Err(GuardViolation::CallerNotClient(caller_id))
                } else if !self.applicants.contains(developer) {
                    Err(GuardViolation::NotAnApplicant(developer.clone()))
                } else {
                    Ok(())
                }
            }
            TaskEvent::StartWork | TaskEvent::SubmitForReview => {
                if self.is_assigned_developer(caller) {
                    Ok(())
                } else {
                    Err(GuardViolation::CallerNotAssignedDeveloper(caller_id))
                }
            }
            TaskEvent::Approve | TaskEvent::RequestChanges | TaskEvent::Cancel => {
                if self.is_client(caller) {
                    Ok(())
                } else {
                    Err(GuardViolation::CallerNotClient(caller_id))
                }
            }
            TaskEvent::RaiseDispute => {
                if self.is_client(caller) || self.is_assigned_developer(caller) {
                    Ok(())
                } else {
                    Err(GuardViolation::CallerNotParty(caller_id))
                }
            }
            TaskEvent::ResolveDispute(_) => {
                if caller.role() == CallerRole::Arbiter {
                    Ok(())
                } else {
                    Err(GuardViolation::CallerNotArbiter(caller_id))
                }
            }
        }
    }

    fn steps_for(&self, event: &TaskEvent) -> Result<Vec<TransitionStep>, TaskDomainError> {
        let steps = match event {
            TaskEvent::Assign(developer) => {
                // An earlier failed assignment may have granted access to another applicant.
                let revocations = self
                    .applicants
                    .iter()
                    .filter(|applicant| *applicant != developer)
                    .cloned()
                    .map(TransitionStep::RemoveCollaborator);
                std::iter::once(TransitionStep::ProvisionWorkspace)
                    .chain(revocations)
                    .chain([
                        TransitionStep::AddCollaborator(developer.clone()),
                        TransitionStep::DepositEscrow,
                    ])
                    .collect()
            }
            TaskEvent::Approve => {
                let workspace = self.workspace.clone().ok_or(TaskDomainError::InconsistentTask {
                    task_id: self.id,
                    reason: "task under review has no workspace",
                })?;
                vec![
                    TransitionStep::VerifyReview(workspace.clone()),
                    TransitionStep::ReleaseEscrow,
                    TransitionStep::TeardownWorkspace(workspace),
                ]
            }
            TaskEvent::Cancel | TaskEvent::ResolveDispute(DisputeResolution::Cancel) => {
                match (&self.workspace, &self.assigned_developer) {
                    (Some(workspace), Some(developer)) => vec![
                        TransitionStep::RefundEscrow,
                        TransitionStep::RemoveCollaborator(developer.clone()),
                        TransitionStep::TeardownWorkspace(workspace.clone()),
                    ],
                    // An assignment whose save was lost may have left a deposit
                    // and a workspace behind.
                    _ if self.state == TaskState::Applied => vec![
                        TransitionStep::RefundEscrow,
                        TransitionStep::ReclaimWorkspace,
                    ],
                    _ => Vec::new(),
                }
            }
            TaskEvent::Apply(_)
            | TaskEvent::StartWork
            | TaskEvent::SubmitForReview
            | TaskEvent::RequestChanges
            | TaskEvent::RaiseDispute
            | TaskEvent::ResolveDispute(DisputeResolution::Resume) => Vec::new(),
        };
        Ok(steps)
    }

    fn check_invariants(&self) -> Result<(), TaskDomainError> {
        let task_id = self.id;
        let inconsistent = |reason| TaskDomainError::InconsistentTask {
            task_id,
            reason,
        };
        if self.assigned_developer.is_some() != self.state.has_assigned_developer() {
            return Err(inconsistent("assigned developer does not match state"));
        }
        let workspace_expected = matches!(
            self.state,
            TaskState::Assigned | TaskState::InProgress | TaskState::InReview | TaskState::Disputed
        );
        if self.workspace.is_some() != workspace_expected {
            return Err(inconsistent("workspace does not match state"));
        }
        if self.value == MinorUnits::ZERO {
            return Err(inconsistent("task value is zero"));
        }
        Ok(())
    }

    /// Updates the `updated_at` timestamp to the current clock time.
    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
