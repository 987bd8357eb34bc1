//! Cancellation and dispute refunds under collaborator failures.

use bountyforge::task::{
    adapters::memory::CodeHostOperation,
    domain::{DisputeResolution, EscrowOperation, EscrowState, TaskState},
    ports::ExternalFailureKind,
    services::OrchestratorErrorKind,
};
use rstest::rstest;

use super::helpers::{Settlement, arbiter, client, developer, settlement};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelling_an_applied_task_moves_no_funds(settlement: Settlement) {
    let applied = settlement.applied_task().await.expect("task is applied");

    let cancelled = settlement
        .orchestrator
        .cancel(applied.id(), &client())
        .await
        .expect("client cancels");

    assert_eq!(cancelled.state(), TaskState::Cancelled);
    assert_eq!(cancelled.escrow(), &EscrowState::Unfunded);
    assert_eq!(settlement.escrow.calls(EscrowOperation::Refund).expect("read calls"), 1);
    assert_eq!(settlement.escrow.refunds().expect("read counter"), 0);
    assert_eq!(settlement.host.workspaces_created().expect("read counter"), 0);
    assert_eq!(settlement.host.workspaces_torn_down().expect("read counter"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancel_retried_after_a_failed_teardown_refunds_once(settlement: Settlement) {
    let task = settlement.assigned_task().await.expect("task is assigned");
    let workspace = task.workspace().cloned().expect("workspace provisioned");
    settlement
        .host
        .fail_next(
            CodeHostOperation::TeardownWorkspace,
            ExternalFailureKind::Unauthorized,
            1,
        )
        .expect("script teardown failure");

    let failed = settlement.orchestrator.cancel(task.id(), &client()).await;
    let stored = settlement
        .orchestrator
        .get_task(task.id())
        .await
        .expect("load task");
    let retried = settlement
        .orchestrator
        .cancel(task.id(), &client())
        .await
        .expect("second cancel succeeds");

    assert_eq!(
        failed.map_err(|err| err.kind()).err(),
        Some(OrchestratorErrorKind::ExternalService)
    );
    assert_eq!(stored.state(), TaskState::Assigned);
    assert_eq!(retried.state(), TaskState::Cancelled);
    assert!(matches!(retried.escrow(), EscrowState::Refunded { .. }));
    // The retry repeats the refund call, but the ledger moves funds only once.
    assert_eq!(settlement.escrow.calls(EscrowOperation::Refund).expect("read calls"), 2);
    assert_eq!(settlement.escrow.refunds().expect("read counter"), 1);
    assert_eq!(
        settlement.host.calls(CodeHostOperation::TeardownWorkspace).expect("read calls"),
        2
    );
    assert_eq!(settlement.host.workspaces_torn_down().expect("read counter"), 1);
    assert!(!settlement.host.workspace_exists(&workspace).expect("read workspace"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transient_failures_during_cancel_settle_exactly_once(settlement: Settlement) {
    let task = settlement.assigned_task().await.expect("task is assigned");
    let workspace = task.workspace().cloned().expect("workspace provisioned");
    settlement
        .escrow
        .fail_next(EscrowOperation::Refund, ExternalFailureKind::Unavailable, 2)
        .expect("script refund failures");
    settlement
        .host
        .fail_next(
            CodeHostOperation::TeardownWorkspace,
            ExternalFailureKind::RateLimited,
            1,
        )
        .expect("script teardown failure");

    let cancelled = settlement
        .orchestrator
        .cancel(task.id(), &client())
        .await
        .expect("retries absorb transient failures");

    assert_eq!(cancelled.state(), TaskState::Cancelled);
    assert!(matches!(cancelled.escrow(), EscrowState::Refunded { .. }));
    assert_eq!(settlement.escrow.refunds().expect("read counter"), 1);
    assert_eq!(settlement.escrow.calls(EscrowOperation::Refund).expect("read calls"), 3);
    assert_eq!(settlement.host.workspaces_torn_down().expect("read counter"), 1);
    assert!(!settlement.host.workspace_exists(&workspace).expect("read workspace"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn exhausted_refund_retries_leave_the_task_assigned(settlement: Settlement) {
    let task = settlement.assigned_task().await.expect("task is assigned");
    settlement
        .escrow
        .fail_next(EscrowOperation::Refund, ExternalFailureKind::Unavailable, 3)
        .expect("script refund failures");

    let failed = settlement.orchestrator.cancel(task.id(), &client()).await;
    let stored = settlement
        .orchestrator
        .get_task(task.id())
        .await
        .expect("load task");
    let retried = settlement
        .orchestrator
        .cancel(task.id(), &client())
        .await
        .expect("second cancel succeeds");

    assert_eq!(
        failed.map_err(|err| err.kind()).err(),
        Some(OrchestratorErrorKind::ExternalService)
    );
    assert_eq!(stored.state(), TaskState::Assigned);
    assert_eq!(retried.state(), TaskState::Cancelled);
    assert_eq!(settlement.escrow.refunds().expect("read counter"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn arbiter_cancellation_refunds_a_disputed_task(settlement: Settlement) {
    let task = settlement.task_in_review().await.expect("task reaches review");
    settlement
        .orchestrator
        .raise_dispute(task.id(), &developer())
        .await
        .expect("developer disputes");

    let cancelled = settlement
        .orchestrator
        .resolve_dispute(task.id(), &arbiter(), DisputeResolution::Cancel)
        .await
        .expect("arbiter cancels");

    assert_eq!(cancelled.state(), TaskState::Cancelled);
    assert_eq!(cancelled.assigned_developer(), None);
    assert_eq!(settlement.escrow.refunds().expect("read counter"), 1);
    assert_eq!(settlement.escrow.releases().expect("read counter"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn clients_cannot_resolve_disputes(settlement: Settlement) {
    let task = settlement.task_in_review().await.expect("task reaches review");
    settlement
        .orchestrator
        .raise_dispute(task.id(), &client())
        .await
        .expect("client disputes");

    let result = settlement
        .orchestrator
        .resolve_dispute(task.id(), &client(), DisputeResolution::Cancel)
        .await;

    assert_eq!(
        result.map_err(|err| err.kind()).err(),
        Some(OrchestratorErrorKind::InvalidTransition)
    );
}
