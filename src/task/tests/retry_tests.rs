//! Tests for external call retry and backoff.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::task::{
    ports::{ExternalFailureKind, ExternalService, ExternalServiceError},
    services::{RetryPolicy, with_retry},
};
use rstest::rstest;

fn failure(kind: ExternalFailureKind) -> ExternalServiceError {
    ExternalServiceError::new(ExternalService::Escrow, kind, "scripted")
}

#[rstest]
#[case(0, 200)]
#[case(1, 400)]
#[case(2, 800)]
#[case(5, 5_000)]
#[case(40, 5_000)]
fn backoff_doubles_up_to_the_cap(#[case] retry: u32, #[case] expected_millis: u64) {
    let policy = RetryPolicy::default();

    assert_eq!(policy.delay_for(retry), Duration::from_millis(expected_millis));
}

#[rstest]
#[case(429, ExternalFailureKind::RateLimited, true)]
#[case(408, ExternalFailureKind::Timeout, true)]
#[case(503, ExternalFailureKind::Unavailable, true)]
#[case(401, ExternalFailureKind::Unauthorized, false)]
#[case(403, ExternalFailureKind::Unauthorized, false)]
#[case(404, ExternalFailureKind::NotFound, false)]
#[case(422, ExternalFailureKind::Rejected, false)]
fn http_statuses_are_classified(
    #[case] status: u16,
    #[case] kind: ExternalFailureKind,
    #[case] retryable: bool,
) {
    let err = ExternalServiceError::from_http_status(ExternalService::CodeHost, status, "status");

    assert_eq!(err.kind(), kind);
    assert_eq!(err.is_retryable(), retryable);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transient_failures_are_retried_until_success() {
    let attempts = AtomicUsize::new(0);
    let counter = &attempts;

    let result = with_retry(
        &RetryPolicy::immediate(),
        Duration::from_secs(1),
        ExternalService::Escrow,
        "deposit escrow",
        || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(failure(ExternalFailureKind::Unavailable))
            } else {
                Ok("receipt")
            }
        },
    )
    .await;

    assert_eq!(result, Ok("receipt"));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn retries_are_bounded_by_the_policy() {
    let attempts = AtomicUsize::new(0);
    let counter = &attempts;

    let result: Result<(), _> = with_retry(
        &RetryPolicy::immediate(),
        Duration::from_secs(1),
        ExternalService::Escrow,
        "deposit escrow",
        || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(failure(ExternalFailureKind::RateLimited))
        },
    )
    .await;

    assert_eq!(
        result.map_err(|err| err.kind()),
        Err(ExternalFailureKind::RateLimited)
    );
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn permanent_failures_surface_immediately() {
    let attempts = AtomicUsize::new(0);
    let counter = &attempts;

    let result: Result<(), _> = with_retry(
        &RetryPolicy::immediate(),
        Duration::from_secs(1),
        ExternalService::CodeHost,
        "add collaborator",
        || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(failure(ExternalFailureKind::Unauthorized))
        },
    )
    .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn slow_calls_time_out_and_count_as_retryable() {
    let attempts = AtomicUsize::new(0);
    let counter = &attempts;

    let result = with_retry(
        &RetryPolicy::immediate(),
        Duration::from_millis(20),
        ExternalService::CodeHost,
        "ensure workspace",
        || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok::<_, ExternalServiceError>(7)
        },
    )
    .await;

    assert_eq!(result, Ok(7));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn exhausted_timeouts_report_a_timeout_failure() {
    let result: Result<(), _> = with_retry(
        &RetryPolicy::no_retry(),
        Duration::from_millis(10),
        ExternalService::Escrow,
        "release escrow",
        || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        },
    )
    .await;

    let err = result.expect_err("the only attempt times out");
    assert_eq!(err.kind(), ExternalFailureKind::Timeout);
    assert_eq!(err.service(), ExternalService::Escrow);
}
