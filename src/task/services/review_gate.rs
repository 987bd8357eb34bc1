//! Review gate over a workspace's pull requests.
//!
//! Pull requests are streamed page by page and never cached, so every call
//! observes the code host's current state. A stream that fails part way can
//! simply be requested again; it restarts from the first page.

use super::{RetryPolicy, retry::with_retry};
use crate::task::{
    domain::{PullRequestSummary, ReviewState, ReviewTally, WorkspaceRef},
    ports::{
        ExternalService, ExternalServiceError, ExternalServiceResult, PageRequest, PullRequestPage,
        PullRequestSource,
    },
};
use futures::{Stream, TryStreamExt, future, stream};
use mockable::Clock;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default number of pull requests requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Decides whether a workspace's pull requests allow completion.
#[derive(Debug)]
pub struct ReviewGate<P>
where
    P: PullRequestSource,
{
    source: Arc<P>,
    retry: RetryPolicy,
    call_timeout: Duration,
    page_size: u32,
}

impl<P> Clone for ReviewGate<P>
where
    P: PullRequestSource,
{
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            retry: self.retry,
            call_timeout: self.call_timeout,
            page_size: self.page_size,
        }
    }
}

impl<P> ReviewGate<P>
where
    P: PullRequestSource,
{
    /// Creates a review gate with the default retry policy and page size.
    #[must_use]
    pub fn new(source: Arc<P>) -> Self {
        Self {
            source,
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(10),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the retry policy and per-attempt timeout for page fetches.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy, call_timeout: Duration) -> Self {
        self.retry = retry;
        self.call_timeout = call_timeout;
        self
    }

    /// Sets the number of pull requests requested per page.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    async fn fetch_page(
        &self,
        workspace: &WorkspaceRef,
        request: PageRequest,
    ) -> ExternalServiceResult<PullRequestPage> {
        debug!(%workspace, cursor = ?request.cursor, "fetching pull request page");
        with_retry(
            &self.retry,
            self.call_timeout,
            ExternalService::CodeHost,
            "list pull requests",
            || self.source.pull_request_page(workspace, request.clone()),
        )
        .await
    }

    /// Streams every pull request of the workspace, fetching pages lazily.
    pub fn pull_requests<'a>(
        &'a self,
        workspace: &'a WorkspaceRef,
    ) -> impl Stream<Item = ExternalServiceResult<PullRequestSummary>> + Send + 'a {
        let per_page = self.page_size;
        stream::try_unfold(
            Some(PageRequest::first(per_page)),
            move |pending| async move {
                let Some(request) = pending else {
                    return Ok::<_, ExternalServiceError>(None);
                };
                let page = self.fetch_page(workspace, request).await?;
                let next = page.next.map(|cursor| PageRequest::after(cursor, per_page));
                let items = stream::iter(page.items.into_iter().map(Ok::<_, ExternalServiceError>));
                Ok(Some((items, next)))
            },
        )
        .try_flatten()
    }

    /// Streams the workspace's pull requests that are still open.
    pub fn list_open_work<'a>(
        &'a self,
        workspace: &'a WorkspaceRef,
    ) -> impl Stream<Item = ExternalServiceResult<PullRequestSummary>> + Send + 'a {
        self.pull_requests(workspace)
            .try_filter(|pull_request| future::ready(pull_request.is_open()))
    }

    /// Returns `true` when every non-withdrawn pull request is merged or
    /// approved without unresolved change requests, and at least one is.
    ///
    /// Stops fetching at the first blocking pull request.
    ///
    /// # Errors
    ///
    /// Returns the code-host failure that ended the listing.
    pub async fn is_review_satisfied(&self, workspace: &WorkspaceRef) -> ExternalServiceResult<bool> {
        let mut tally = ReviewTally::default();
        let mut pull_requests = pin!(self.pull_requests(workspace));
        while let Some(pull_request) = pull_requests.try_next().await? {
            if !tally.record(&pull_request) {
                debug!(%workspace, number = %pull_request.number(), "pull request blocks review");
                return Ok(false);
            }
        }
        Ok(tally.is_satisfied())
    }

    /// Fetches a snapshot of all the workspace's pull requests.
    ///
    /// # Errors
    ///
    /// Returns the code-host failure that ended the listing.
    pub async fn review_state(
        &self,
        workspace: &WorkspaceRef,
        clock: &impl Clock,
    ) -> ExternalServiceResult<ReviewState> {
        let pull_requests: Vec<PullRequestSummary> =
            self.pull_requests(workspace).try_collect().await?;
        Ok(ReviewState::new(pull_requests, clock.utc()))
    }
}
