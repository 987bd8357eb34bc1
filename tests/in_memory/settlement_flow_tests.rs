//! End-to-end settlement of a task through the in-memory collaborators.

use bountyforge::task::domain::{
    EscrowState, MinorUnits, Payout, PullRequestState, PullRequestSummary, TaskState,
};
use rstest::rstest;

use super::helpers::{Settlement, client, developer, settlement};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approved_task_pays_developer_and_platform(settlement: Settlement) {
    let task = settlement.task_in_review().await.expect("task reaches review");
    let workspace = task.workspace().cloned().expect("workspace provisioned");
    let number = settlement
        .host
        .open_pull_request(&workspace, "Exporter port")
        .expect("open pull request");
    settlement
        .host
        .upsert_pull_request(
            &workspace,
            PullRequestSummary::new(number, "Exporter port")
                .with_state(PullRequestState::Open)
                .with_reviews(1, 0),
        )
        .expect("approve pull request");

    let completed = settlement
        .orchestrator
        .approve(task.id(), &client())
        .await
        .expect("approval succeeds");

    assert_eq!(completed.state(), TaskState::Completed);
    assert_eq!(completed.workspace(), None);
    assert!(matches!(completed.escrow(), EscrowState::Released { .. }));
    assert_eq!(
        settlement.escrow.payout(task.id()).expect("read payout"),
        Some(Payout {
            developer: MinorUnits::new(500_000),
            platform: MinorUnits::new(25_000),
        })
    );
    assert_eq!(settlement.host.workspaces_torn_down().expect("read counter"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn assignment_deposits_value_plus_fee(settlement: Settlement) {
    let task = settlement.assigned_task().await.expect("task is assigned");

    assert_eq!(task.state(), TaskState::Assigned);
    assert_eq!(task.assigned_developer(), Some(developer().id()));
    assert_eq!(
        settlement.escrow.held(task.id()).expect("read escrow"),
        MinorUnits::new(525_000)
    );
    let stored = settlement
        .orchestrator
        .get_task(task.id())
        .await
        .expect("load task");
    assert_eq!(stored, task);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn requested_changes_return_work_to_the_developer(settlement: Settlement) {
    let task = settlement.task_in_review().await.expect("task reaches review");

    let reopened = settlement
        .orchestrator
        .request_changes(task.id(), &client())
        .await
        .expect("client requests changes");
    let resubmitted = settlement
        .orchestrator
        .submit_for_review(task.id(), &developer())
        .await
        .expect("developer resubmits");

    assert_eq!(reopened.state(), TaskState::InProgress);
    assert_eq!(resubmitted.state(), TaskState::InReview);
    assert_eq!(settlement.escrow.deposits().expect("read counter"), 1);
}
