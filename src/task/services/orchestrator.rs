//! Task orchestrator: drives lifecycle transitions and their side effects.
//!
//! Every transition follows the same shape: load the task with its version,
//! plan the event, execute the plan's steps against the collaborators, apply
//! the outcomes, and save with a compare-and-swap on the loaded version.
//! Nothing is persisted until every step has succeeded. Steps are idempotent,
//! so a transition that failed part way can be retried from the start.

use super::{
    OrchestratorConfig, OrchestratorError, OrchestratorResult, ReviewGate, retry::with_retry,
};
use crate::task::{
    domain::{
        Caller, DisputeResolution, EscrowQuote, GuardViolation, MinorUnits, ParticipantId, Payout,
        ReviewState, StepOutcomes, Task, TaskDomainError, TaskEvent, TaskId, TransitionPlan,
        TransitionStep, WorkspaceRef,
    },
    ports::{
        EscrowLedger, ExternalService, ExternalServiceResult, PullRequestSource, SaveOutcome,
        TaskStore, VersionedTask, WorkspaceProvisioner,
    },
};
use mockable::Clock;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Request payload for posting a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    title: String,
    value_minor_units: i64,
}

impl CreateTaskRequest {
    /// Creates a request for a task worth `value_minor_units`.
    #[must_use]
    pub fn new(title: impl Into<String>, value_minor_units: i64) -> Self {
        Self {
            title: title.into(),
            value_minor_units,
        }
    }
}

/// Coordinates task transitions with the code host and escrow.
pub struct TaskOrchestrator<S, W, P, E, C>
where
    S: TaskStore,
    W: WorkspaceProvisioner,
    P: PullRequestSource,
    E: EscrowLedger,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    workspaces: Arc<W>,
    review_gate: ReviewGate<P>,
    escrow: Arc<E>,
    clock: Arc<C>,
    config: OrchestratorConfig,
}

impl<S, W, P, E, C> TaskOrchestrator<S, W, P, E, C>
where
    S: TaskStore,
    W: WorkspaceProvisioner,
    P: PullRequestSource,
    E: EscrowLedger,
    C: Clock + Send + Sync,
{
    /// Creates an orchestrator over explicit collaborator handles.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        workspaces: Arc<W>,
        pull_requests: Arc<P>,
        escrow: Arc<E>,
        clock: Arc<C>,
        config: OrchestratorConfig,
    ) -> Self {
        let review_gate =
            ReviewGate::new(pull_requests).with_retry(config.retry, config.call_timeout);
        Self {
            store,
            workspaces,
            review_gate,
            escrow,
            clock,
            config,
        }
    }

    /// Returns the orchestrator's configuration.
    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Returns the review gate used to verify pull requests.
    #[must_use]
    pub const fn review_gate(&self) -> &ReviewGate<P> {
        &self.review_gate
    }

    /// Posts a new open task on behalf of a client.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidAmount`] for a non-positive or
    /// overflowing value, [`OrchestratorError::InvalidTransition`] when the
    /// creator is not a client or the title is empty, and
    /// [`OrchestratorError::ExternalService`] when persistence fails.
    #[instrument(skip_all, fields(creator = %creator.id()))]
    pub async fn create_task(
        &self,
        creator: &Caller,
        request: CreateTaskRequest,
    ) -> OrchestratorResult<Task> {
        let value = MinorUnits::positive(request.value_minor_units)?;
        EscrowQuote::compute(value, self.config.fee_rate)?;
        let task = Task::new(creator, request.title, value, &*self.clock)?;
        let version = self.store.insert(&task).await?;
        info!(task_id = %task.id(), %version, "task created");
        Ok(task)
    }

    /// Records the calling developer as an applicant.
    ///
    /// # Errors
    ///
    /// See [`Self::start_work`].
    pub async fn apply(&self, task_id: TaskId, caller: &Caller) -> OrchestratorResult<Task> {
        let event = TaskEvent::Apply(caller.id().clone());
        self.transition(task_id, caller, event).await
    }

    /// Assigns an applicant: provisions the workspace, revokes access for
    /// every other applicant, grants access, and deposits escrow.
    ///
    /// # Errors
    ///
    /// See [`Self::start_work`]. Collaborator failures leave the task in
    /// `Applied`; its effects are reconciled by a later assignment or
    /// cancellation.
    pub async fn assign(
        &self,
        task_id: TaskId,
        caller: &Caller,
        developer: ParticipantId,
    ) -> OrchestratorResult<Task> {
        self.transition(task_id, caller, TaskEvent::Assign(developer))
            .await
    }

    /// Marks work as started by the assigned developer.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotFound`] for an unknown task,
    /// [`OrchestratorError::InvalidTransition`] when the event is illegal
    /// from the current state or for the caller,
    /// [`OrchestratorError::ExternalService`] when a collaborator fails, and
    /// [`OrchestratorError::Conflict`] when the task changed concurrently.
    pub async fn start_work(&self, task_id: TaskId, caller: &Caller) -> OrchestratorResult<Task> {
        self.transition(task_id, caller, TaskEvent::StartWork).await
    }

    /// Submits the work for the client's review.
    ///
    /// # Errors
    ///
    /// See [`Self::start_work`].
    pub async fn submit_for_review(
        &self,
        task_id: TaskId,
        caller: &Caller,
    ) -> OrchestratorResult<Task> {
        self.transition(task_id, caller, TaskEvent::SubmitForReview)
            .await
    }

    /// Accepts the work: verifies review, releases escrow, and tears down
    /// the workspace.
    ///
    /// # Errors
    ///
    /// See [`Self::start_work`]. An unsatisfied review is an
    /// [`OrchestratorError::InvalidTransition`].
    pub async fn approve(&self, task_id: TaskId, caller: &Caller) -> OrchestratorResult<Task> {
        self.transition(task_id, caller, TaskEvent::Approve).await
    }

    /// Sends the work back to the developer.
    ///
    /// # Errors
    ///
    /// See [`Self::start_work`].
    pub async fn request_changes(
        &self,
        task_id: TaskId,
        caller: &Caller,
    ) -> OrchestratorResult<Task> {
        self.transition(task_id, caller, TaskEvent::RequestChanges)
            .await
    }

    /// Cancels the task, refunding escrow and tearing down any workspace.
    ///
    /// From `Applied` the escrow ledger and code host are still consulted,
    /// since an assignment that failed to save may have deposited funds or
    /// provisioned a workspace.
    ///
    /// # Errors
    ///
    /// See [`Self::start_work`].
    pub async fn cancel(&self, task_id: TaskId, caller: &Caller) -> OrchestratorResult<Task> {
        self.transition(task_id, caller, TaskEvent::Cancel).await
    }

    /// Moves the task into arbitration.
    ///
    /// # Errors
    ///
    /// See [`Self::start_work`].
    pub async fn raise_dispute(&self, task_id: TaskId, caller: &Caller) -> OrchestratorResult<Task> {
        self.transition(task_id, caller, TaskEvent::RaiseDispute)
            .await
    }

    /// Settles a dispute by resuming work or cancelling the task.
    ///
    /// # Errors
    ///
    /// See [`Self::start_work`].
    pub async fn resolve_dispute(
        &self,
        task_id: TaskId,
        caller: &Caller,
        resolution: DisputeResolution,
    ) -> OrchestratorResult<Task> {
        self.transition(task_id, caller, TaskEvent::ResolveDispute(resolution))
            .await
    }

    /// Loads the current task.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotFound`] for an unknown task.
    pub async fn get_task(&self, task_id: TaskId) -> OrchestratorResult<Task> {
        Ok(self.load(task_id).await?.task)
    }

    /// Quotes the escrow split for a task at the configured fee rate.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotFound`] for an unknown task and
    /// [`OrchestratorError::InvalidAmount`] when the quote overflows.
    pub async fn quote_for(&self, task_id: TaskId) -> OrchestratorResult<EscrowQuote> {
        let task = self.get_task(task_id).await?;
        Ok(EscrowQuote::compute(task.value(), self.config.fee_rate)?)
    }

    /// Fetches the current pull request review state of the task's
    /// workspace.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotFound`] for an unknown task,
    /// [`OrchestratorError::WorkspaceNotFound`] when the task has no
    /// workspace, and [`OrchestratorError::ExternalService`] when the listing
    /// fails.
    pub async fn review_state(&self, task_id: TaskId) -> OrchestratorResult<ReviewState> {
        let task = self.get_task(task_id).await?;
        let workspace = task
            .workspace()
            .ok_or(OrchestratorError::WorkspaceNotFound(task_id))?;
        let snapshot = self
            .review_gate
            .review_state(workspace, &*self.clock)
            .await?;
        debug!(
            %workspace,
            blocking = snapshot.blocking().count(),
            satisfied = snapshot.is_satisfied(),
            "review state fetched"
        );
        Ok(snapshot)
    }

    async fn load(&self, task_id: TaskId) -> OrchestratorResult<VersionedTask> {
        self.store
            .load(task_id)
            .await?
            .ok_or(OrchestratorError::NotFound(task_id))
    }

    #[instrument(
        skip_all,
        fields(task_id = %task_id, event = %event.kind(), caller = %caller.id())
    )]
    async fn transition(
        &self,
        task_id: TaskId,
        caller: &Caller,
        event: TaskEvent,
    ) -> OrchestratorResult<Task> {
        let VersionedTask { mut task, version } = self.load(task_id).await?;
        let plan = task.plan(event, caller)?;
        let outcomes = self.execute(&task, &plan).await?;
        task.apply(&plan, &outcomes, &*self.clock)?;

        match self.store.save(&task, version).await? {
            SaveOutcome::Saved(saved) => {
                info!(from = %plan.from(), to = %plan.to(), version = %saved, "transition committed");
                Ok(task)
            }
            SaveOutcome::VersionMismatch => {
                warn!(expected = %version, "task changed while the transition was running");
                Err(OrchestratorError::Conflict {
                    task_id,
                    expected: version,
                })
            }
        }
    }

    async fn execute(&self, task: &Task, plan: &TransitionPlan) -> OrchestratorResult<StepOutcomes> {
        let mut outcomes = StepOutcomes::default();
        for step in plan.steps() {
            debug!(step = step.name(), "executing step");
            self.run_step(task, plan, step, &mut outcomes).await?;
        }
        Ok(outcomes)
    }

    async fn run_step(
        &self,
        task: &Task,
        plan: &TransitionPlan,
        step: &TransitionStep,
        outcomes: &mut StepOutcomes,
    ) -> OrchestratorResult<()> {
        let task_id = task.id();
        match step {
            TransitionStep::ProvisionWorkspace => {
                let workspace = self
                    .call(ExternalService::CodeHost, "ensure workspace", || {
                        self.workspaces.ensure_workspace(task_id)
                    })
                    .await?;
                outcomes.workspace = Some(workspace);
            }
            TransitionStep::RemoveCollaborator(participant) => {
                let workspace = Self::provisioned(task, plan, outcomes)?;
                self.call(ExternalService::CodeHost, "remove collaborator", || {
                    self.workspaces.remove_collaborator(workspace, participant)
                })
                .await?;
            }
            TransitionStep::AddCollaborator(developer) => {
                let workspace = Self::provisioned(task, plan, outcomes)?;
                self.call(ExternalService::CodeHost, "add collaborator", || {
                    self.workspaces.add_collaborator(workspace, developer)
                })
                .await?;
            }
            TransitionStep::DepositEscrow => {
                let amount = EscrowQuote::compute(task.value(), self.config.fee_rate)?.total_deposit();
                let receipt = self
                    .call(ExternalService::Escrow, "deposit escrow", || {
                        self.escrow.deposit(task_id, amount)
                    })
                    .await?;
                outcomes.deposit = Some(receipt);
            }
            TransitionStep::VerifyReview(workspace) => {
                if !self.review_gate.is_review_satisfied(workspace).await? {
                    return Err(TaskDomainError::GuardRejected {
                        task_id,
                        event: plan.event().kind(),
                        violation: GuardViolation::ReviewNotSatisfied,
                    }
                    .into());
                }
            }
            TransitionStep::ReleaseEscrow => {
                let payout = Self::payout_for(task, plan)?;
                let receipt = self
                    .call(ExternalService::Escrow, "release escrow", || {
                        self.escrow.release(task_id, payout)
                    })
                    .await?;
                outcomes.release = Some(receipt);
            }
            TransitionStep::RefundEscrow => {
                let refund = self
                    .call(ExternalService::Escrow, "refund escrow", || {
                        self.escrow.refund(task_id)
                    })
                    .await?;
                if let Some(receipt) = refund.as_ref().filter(|_| task.escrow().held().is_none()) {
                    warn!(receipt = %receipt.id(), amount = %receipt.amount(), "refunded an unrecorded deposit");
                }
                outcomes.refund = refund;
            }
            TransitionStep::TeardownWorkspace(workspace) => {
                self.call(ExternalService::CodeHost, "teardown workspace", || {
                    self.workspaces.teardown_workspace(workspace)
                })
                .await?;
                outcomes.workspace_torn_down = true;
            }
            TransitionStep::ReclaimWorkspace => {
                let found = self
                    .call(ExternalService::CodeHost, "find workspace", || {
                        self.workspaces.find_workspace(task_id)
                    })
                    .await?;
                if let Some(workspace) = found {
                    warn!(%workspace, "tearing down an unrecorded workspace");
                    self.call(ExternalService::CodeHost, "teardown workspace", || {
                        self.workspaces.teardown_workspace(&workspace)
                    })
                    .await?;
                    outcomes.workspace_torn_down = true;
                }
            }
        }
        Ok(())
    }

    async fn call<T, F, Fut>(
        &self,
        service: ExternalService,
        operation: &'static str,
        call: F,
    ) -> OrchestratorResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ExternalServiceResult<T>>,
    {
        Ok(with_retry(
            &self.config.retry,
            self.config.call_timeout,
            service,
            operation,
            call,
        )
        .await?)
    }

    fn provisioned<'a>(
        task: &'a Task,
        plan: &TransitionPlan,
        outcomes: &'a StepOutcomes,
    ) -> Result<&'a WorkspaceRef, TaskDomainError> {
        outcomes
            .workspace
            .as_ref()
            .or_else(|| task.workspace())
            .ok_or_else(|| TaskDomainError::IncompleteTransition {
                task_id: task.id(),
                event: plan.event().kind(),
                missing: "workspace",
            })
    }

    /// Splits the held deposit into the developer's principal and the fee
    /// that was charged on top of it.
    fn payout_for(task: &Task, plan: &TransitionPlan) -> Result<Payout, TaskDomainError> {
        let deposit = task
            .escrow()
            .held()
            .ok_or_else(|| TaskDomainError::IncompleteTransition {
                task_id: task.id(),
                event: plan.event().kind(),
                missing: "deposit",
            })?;
        let platform = deposit
            .amount()
            .value()
            .checked_sub(task.value().value())
            .map(MinorUnits::new)
            .ok_or_else(|| TaskDomainError::InconsistentTask {
                task_id: task.id(),
                reason: "deposit is smaller than the task value",
            })?;
        Ok(Payout {
            developer: task.value(),
            platform,
        })
    }
}
