//! Bounded retry of external collaborator calls.

use super::RetryPolicy;
use crate::task::ports::{ExternalService, ExternalServiceError, ExternalServiceResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::warn;

/// Runs `call` until it succeeds, fails permanently, or exhausts `policy`.
///
/// Each attempt is bounded by `call_timeout`; an elapsed attempt counts as a
/// retryable timeout failure.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    call_timeout: Duration,
    service: ExternalService,
    operation: &'static str,
    mut call: F,
) -> ExternalServiceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ExternalServiceResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut retry = 0_u32;
    loop {
        let err = match timeout(call_timeout, call())
            .await
            .unwrap_or_else(|_elapsed| Err(ExternalServiceError::timeout(service, operation)))
        {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };

        let attempt = retry.saturating_add(1);
        if !err.is_retryable() || attempt >= max_attempts {
            return Err(err);
        }
        let delay = policy.delay_for(retry);
        warn!(
            %service,
            operation,
            attempt,
            max_attempts,
            ?delay,
            error = %err,
            "retrying external call"
        );
        sleep(delay).await;
        retry = attempt;
    }
}
