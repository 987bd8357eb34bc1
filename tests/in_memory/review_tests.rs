//! Review gating of client approval.

use bountyforge::task::{
    adapters::memory::CodeHostOperation,
    domain::{PullRequestState, PullRequestSummary, TaskState},
    ports::ExternalFailureKind,
    services::OrchestratorErrorKind,
};
use rstest::rstest;

use super::helpers::{Settlement, client, settlement};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approval_without_pull_requests_is_rejected(settlement: Settlement) {
    let task = settlement.task_in_review().await.expect("task reaches review");

    let result = settlement.orchestrator.approve(task.id(), &client()).await;

    assert_eq!(
        result.map_err(|err| err.kind()).err(),
        Some(OrchestratorErrorKind::InvalidTransition)
    );
    assert_eq!(settlement.escrow.releases().expect("read counter"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn review_state_reports_blocking_pull_requests(settlement: Settlement) {
    let task = settlement.task_in_review().await.expect("task reaches review");
    let workspace = task.workspace().cloned().expect("workspace provisioned");
    let merged = settlement
        .host
        .open_pull_request(&workspace, "Schema")
        .expect("open pull request");
    settlement
        .host
        .upsert_pull_request(
            &workspace,
            PullRequestSummary::new(merged, "Schema").with_state(PullRequestState::Merged),
        )
        .expect("merge pull request");
    settlement
        .host
        .open_pull_request(&workspace, "Exporter")
        .expect("open pull request");

    let review = settlement
        .orchestrator
        .review_state(task.id())
        .await
        .expect("fetch review state");

    assert_eq!(review.pull_requests().len(), 2);
    assert_eq!(review.blocking().count(), 1);
    assert!(!review.is_satisfied());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unauthorized_listing_fails_approval_without_retry(settlement: Settlement) {
    let task = settlement.task_in_review().await.expect("task reaches review");
    settlement
        .host
        .fail_next(
            CodeHostOperation::ListPullRequests,
            ExternalFailureKind::Unauthorized,
            1,
        )
        .expect("script listing failure");

    let result = settlement.orchestrator.approve(task.id(), &client()).await;
    let stored = settlement
        .orchestrator
        .get_task(task.id())
        .await
        .expect("load task");

    assert_eq!(
        result.map_err(|err| err.kind()).err(),
        Some(OrchestratorErrorKind::ExternalService)
    );
    assert_eq!(stored.state(), TaskState::InReview);
    assert_eq!(
        settlement
            .host
            .calls(CodeHostOperation::ListPullRequests)
            .expect("read calls"),
        1
    );
}
