//! Pull request review values read from the code host.
//!
//! Review data is never the source of truth for a task's state. It is
//! fetched on demand and only gates the `InReview -> Completed` transition.

use super::TaskDomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positive pull request number within a workspace repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PullRequestNumber(u64);

impl PullRequestNumber {
    /// Creates a validated pull request number.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidPullRequestNumber`] when the value
    /// is zero.
    pub const fn new(value: u64) -> Result<Self, TaskDomainError> {
        if value == 0 {
            return Err(TaskDomainError::InvalidPullRequestNumber(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PullRequestNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a pull request on the code host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    /// Open and awaiting review or merge.
    Open,
    /// Merged into the base branch.
    Merged,
    /// Closed without merging.
    Closed,
}

/// Review-relevant summary of one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSummary {
    number: PullRequestNumber,
    title: String,
    state: PullRequestState,
    approvals: u32,
    unresolved_change_requests: u32,
}

impl PullRequestSummary {
    /// Creates an open pull request summary with no reviews.
    #[must_use]
    pub fn new(number: PullRequestNumber, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            state: PullRequestState::Open,
            approvals: 0,
            unresolved_change_requests: 0,
        }
    }

    /// Sets the pull request state.
    #[must_use]
    pub const fn with_state(mut self, state: PullRequestState) -> Self {
        self.state = state;
        self
    }

    /// Sets approval and outstanding change-request counts.
    #[must_use]
    pub const fn with_reviews(mut self, approvals: u32, unresolved_change_requests: u32) -> Self {
        self.approvals = approvals;
        self.unresolved_change_requests = unresolved_change_requests;
        self
    }

    /// Returns the pull request number.
    #[must_use]
    pub const fn number(&self) -> PullRequestNumber {
        self.number
    }

    /// Returns the pull request title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the pull request state.
    #[must_use]
    pub const fn state(&self) -> PullRequestState {
        self.state
    }

    /// Returns the number of approving reviews.
    #[must_use]
    pub const fn approvals(&self) -> u32 {
        self.approvals
    }

    /// Returns the number of change requests not yet resolved.
    #[must_use]
    pub const fn unresolved_change_requests(&self) -> u32 {
        self.unresolved_change_requests
    }

    /// Returns `true` while the pull request is still open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.state, PullRequestState::Open)
    }

    /// Returns `true` when the pull request was closed without merging.
    #[must_use]
    pub const fn is_withdrawn(&self) -> bool {
        matches!(self.state, PullRequestState::Closed)
    }

    /// Returns `true` when the pull request is merged, or approved with no
    /// unresolved change requests.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        match self.state {
            PullRequestState::Merged => true,
            PullRequestState::Open => self.approvals > 0 && self.unresolved_change_requests == 0,
            PullRequestState::Closed => false,
        }
    }
}

/// Running verdict over a sequence of pull requests.
///
/// Withdrawn pull requests are ignored. The verdict is satisfied once at
/// least one pull request has been seen and every counted one is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReviewTally {
    settled: usize,
    blocking: usize,
}

impl ReviewTally {
    /// Records one pull request and returns `false` if it blocks completion.
    pub const fn record(&mut self, pull_request: &PullRequestSummary) -> bool {
        if pull_request.is_withdrawn() {
            return true;
        }
        if pull_request.is_settled() {
            self.settled = self.settled.saturating_add(1);
            true
        } else {
            self.blocking = self.blocking.saturating_add(1);
            false
        }
    }

    /// Returns `true` when the recorded pull requests satisfy review.
    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        self.settled > 0 && self.blocking == 0
    }
}

/// Point-in-time snapshot of a workspace's pull requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewState {
    pull_requests: Vec<PullRequestSummary>,
    fetched_at: DateTime<Utc>,
}

impl ReviewState {
    /// Creates a snapshot from fetched pull requests.
    #[must_use]
    pub const fn new(pull_requests: Vec<PullRequestSummary>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            pull_requests,
            fetched_at,
        }
    }

    /// Returns the pull requests in the snapshot.
    #[must_use]
    pub fn pull_requests(&self) -> &[PullRequestSummary] {
        &self.pull_requests
    }

    /// Returns when the snapshot was taken.
    #[must_use]
    pub const fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Returns pull requests that still block completion.
    pub fn blocking(&self) -> impl Iterator<Item = &PullRequestSummary> {
        self.pull_requests
            .iter()
            .filter(|pr| !pr.is_withdrawn() && !pr.is_settled())
    }

    /// Returns `true` when nothing blocks completion and at least one pull
    /// request is settled.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.blocking().next().is_none()
            && self.pull_requests.iter().any(PullRequestSummary::is_settled)
    }
}
