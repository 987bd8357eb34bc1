//! Code-host ports for workspace provisioning and pull request listing.

use super::ExternalServiceResult;
use crate::task::domain::{ParticipantId, PullRequestSummary, TaskId, WorkspaceRef};
use async_trait::async_trait;

/// Capability to manage the repository backing a task's workspace.
///
/// Every operation is idempotent. Implementations report transport and API
/// failures as [`super::ExternalServiceError`], marking rate limits as
/// retryable and authorization or not-found responses as permanent.
#[async_trait]
pub trait WorkspaceProvisioner: Send + Sync {
    /// Returns the workspace for `task_id`, creating it if absent.
    ///
    /// Concurrent calls for the same task converge on one workspace.
    async fn ensure_workspace(&self, task_id: TaskId) -> ExternalServiceResult<WorkspaceRef>;

    /// Returns the workspace held for `task_id` without creating one.
    async fn find_workspace(&self, task_id: TaskId) -> ExternalServiceResult<Option<WorkspaceRef>>;

    /// Grants a developer collaborator access. Already present is success.
    async fn add_collaborator(
        &self,
        workspace: &WorkspaceRef,
        developer: &ParticipantId,
    ) -> ExternalServiceResult<()>;

    /// Revokes a developer's access. Already absent is success.
    async fn remove_collaborator(
        &self,
        workspace: &WorkspaceRef,
        developer: &ParticipantId,
    ) -> ExternalServiceResult<()>;

    /// Deletes the workspace. A missing workspace is success.
    async fn teardown_workspace(&self, workspace: &WorkspaceRef) -> ExternalServiceResult<()>;
}

/// Opaque continuation token issued by the code host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCursor(String);

impl PageCursor {
    /// Wraps a collaborator-issued cursor.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the cursor as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Request for one page of pull requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Continuation token; `None` requests the first page.
    pub cursor: Option<PageCursor>,
    /// Maximum number of items to return.
    pub per_page: u32,
}

impl PageRequest {
    /// Requests the first page.
    #[must_use]
    pub const fn first(per_page: u32) -> Self {
        Self {
            cursor: None,
            per_page,
        }
    }

    /// Requests the page following `cursor`.
    #[must_use]
    pub const fn after(cursor: PageCursor, per_page: u32) -> Self {
        Self {
            cursor: Some(cursor),
            per_page,
        }
    }
}

/// One page of pull requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PullRequestPage {
    /// Pull requests on this page.
    pub items: Vec<PullRequestSummary>,
    /// Cursor for the next page; `None` on the last page.
    pub next: Option<PageCursor>,
}

/// Read access to the pull requests opened against a workspace.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Fetches one page of pull requests, including merged and closed ones.
    async fn pull_request_page(
        &self,
        workspace: &WorkspaceRef,
        page: PageRequest,
    ) -> ExternalServiceResult<PullRequestPage>;
}
