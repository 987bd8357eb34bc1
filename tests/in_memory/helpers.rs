//! Shared test helpers for in-memory settlement integration tests.

use std::sync::Arc;

use bountyforge::task::{
    adapters::memory::{InMemoryCodeHost, InMemoryEscrowLedger, InMemoryTaskStore},
    domain::{Caller, FeeRate, ParticipantId, Task},
    services::{CreateTaskRequest, OrchestratorConfig, RetryPolicy, TaskOrchestrator},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Orchestrator wired to in-memory collaborators.
pub type TestOrchestrator = TaskOrchestrator<
    InMemoryTaskStore,
    InMemoryCodeHost,
    InMemoryCodeHost,
    InMemoryEscrowLedger,
    DefaultClock,
>;

/// Task value used across the settlement scenarios.
pub const TASK_VALUE: i64 = 500_000;

/// Orchestrator plus handles onto its in-memory collaborators.
pub struct Settlement {
    pub orchestrator: TestOrchestrator,
    pub host: InMemoryCodeHost,
    pub escrow: InMemoryEscrowLedger,
}

impl Settlement {
    /// Posts a task, has the developer apply, and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if posting or applying fails.
    pub async fn applied_task(&self) -> Result<Task, eyre::Report> {
        let created = self
            .orchestrator
            .create_task(&client(), CreateTaskRequest::new("Port the exporter", TASK_VALUE))
            .await?;
        Ok(self.orchestrator.apply(created.id(), &developer()).await?)
    }

    /// Drives a fresh task through assignment.
    ///
    /// # Errors
    ///
    /// Returns an error if any transition fails.
    pub async fn assigned_task(&self) -> Result<Task, eyre::Report> {
        let applied = self.applied_task().await?;
        Ok(self
            .orchestrator
            .assign(applied.id(), &client(), developer().id().clone())
            .await?)
    }

    /// Drives a fresh task into review.
    ///
    /// # Errors
    ///
    /// Returns an error if any transition fails.
    pub async fn task_in_review(&self) -> Result<Task, eyre::Report> {
        let assigned = self.assigned_task().await?;
        self.orchestrator
            .start_work(assigned.id(), &developer())
            .await?;
        Ok(self
            .orchestrator
            .submit_for_review(assigned.id(), &developer())
            .await?)
    }
}

/// Provides an orchestrator charging a 5% fee with immediate retries.
#[fixture]
pub fn settlement() -> Settlement {
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
    Settlement {
        orchestrator,
        host,
        escrow,
    }
}

fn participant(id: &str) -> ParticipantId {
    ParticipantId::new(id).expect("valid participant id")
}

/// The client posting tasks.
#[must_use]
pub fn client() -> Caller {
    Caller::client(participant("client-1"))
}

/// The developer applying for tasks.
#[must_use]
pub fn developer() -> Caller {
    Caller::developer(participant("dev-1"))
}

/// The arbiter resolving disputes.
#[must_use]
pub fn arbiter() -> Caller {
    Caller::arbiter(participant("arbiter-1"))
}
