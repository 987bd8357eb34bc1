//! Shared world state for task settlement BDD scenarios.

use std::sync::Arc;

use bountyforge::task::{
    adapters::memory::{InMemoryCodeHost, InMemoryEscrowLedger, InMemoryTaskStore},
    domain::{Caller, FeeRate, ParticipantId, Task, TaskId},
    services::{OrchestratorConfig, OrchestratorResult, RetryPolicy, TaskOrchestrator},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Orchestrator type used by the BDD world.
pub type TestOrchestrator = TaskOrchestrator<
    InMemoryTaskStore,
    InMemoryCodeHost,
    InMemoryCodeHost,
    InMemoryEscrowLedger,
    DefaultClock,
>;

/// Scenario world for task settlement behaviour tests.
pub struct SettlementWorld {
    pub orchestrator: TestOrchestrator,
    pub host: InMemoryCodeHost,
    pub escrow: InMemoryEscrowLedger,
    pub task: Option<Task>,
    pub last_result: Option<OrchestratorResult<Task>>,
}

impl SettlementWorld {
    /// Creates a world charging a 5% platform fee with immediate retries.
    #[must_use]
    pub fn new() -> Self {
        let host = InMemoryCodeHost::new("acme");
        let escrow = InMemoryEscrowLedger::new();
        let shared_host = Arc::new(host.clone());
        let orchestrator = TaskOrchestrator::new(
            Arc::new(InMemoryTaskStore::new()),
            Arc::clone(&shared_host),
            shared_host,
            Arc::new(escrow.clone()),
            Arc::new(DefaultClock),
            OrchestratorConfig::default()
                .with_fee_rate(FeeRate::new(500))
                .with_retry(RetryPolicy::immediate()),
        );

        Self {
            orchestrator,
            host,
            escrow,
            task: None,
            last_result: None,
        }
    }

    /// Returns the task the scenario is driving.
    ///
    /// # Errors
    ///
    /// Returns an error when no task has been posted yet.
    pub fn task(&self) -> Result<&Task, eyre::Report> {
        self.task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }

    /// Returns the identifier of the task the scenario is driving.
    ///
    /// # Errors
    ///
    /// Returns an error when no task has been posted yet.
    pub fn task_id(&self) -> Result<TaskId, eyre::Report> {
        Ok(self.task()?.id())
    }

    /// Records a transition result, tracking the task when it succeeded.
    pub fn record(&mut self, result: OrchestratorResult<Task>) {
        if let Ok(ref updated) = result {
            self.task = Some(updated.clone());
        }
        self.last_result = Some(result);
    }
}

impl Default for SettlementWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> SettlementWorld {
    SettlementWorld::default()
}

/// The client posting tasks in every scenario.
///
/// # Errors
///
/// Returns an error if the participant identifier is rejected.
pub fn client() -> Result<Caller, eyre::Report> {
    Ok(Caller::client(ParticipantId::new("client-1")?))
}

/// A developer caller with the given identifier.
///
/// # Errors
///
/// Returns an error if the participant identifier is rejected.
pub fn developer(id: &str) -> Result<Caller, eyre::Report> {
    Ok(Caller::developer(ParticipantId::new(id)?))
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
