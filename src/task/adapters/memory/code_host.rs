//! In-memory code host for workspace provisioning and review tests.

use super::failures::{FailureScript, lock_failure};
use crate::task::{
    domain::{
        BranchName, ParticipantId, PullRequestNumber, PullRequestSummary,
        RepositoryFullName, TaskDomainError, TaskId, WorkspaceRef,
    },
    ports::{
        ExternalFailureKind, ExternalService, ExternalServiceError, ExternalServiceResult,
        PageCursor, PageRequest, PullRequestPage, PullRequestSource, WorkspaceProvisioner,
    },
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

/// Operations of the in-memory code host, used to script failures and read
/// call counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeHostOperation {
    /// [`WorkspaceProvisioner::ensure_workspace`].
    EnsureWorkspace,
    /// [`WorkspaceProvisioner::find_workspace`].
    FindWorkspace,
    /// [`WorkspaceProvisioner::add_collaborator`].
    AddCollaborator,
    /// [`WorkspaceProvisioner::remove_collaborator`].
    RemoveCollaborator,
    /// [`WorkspaceProvisioner::teardown_workspace`].
    TeardownWorkspace,
    /// [`PullRequestSource::pull_request_page`].
    ListPullRequests,
}

/// In-memory code host adapter.
///
/// This adapter models repository, collaborator, and pull request state
/// without calling a real platform. Repositories are named
/// `<owner>/task-<task id>` and target the `main` branch.
#[derive(Debug, Clone)]
pub struct InMemoryCodeHost {
    owner: String,
    page_size_limit: u32,
    state: Arc<RwLock<CodeHostState>>,
}

#[derive(Debug)]
struct CodeHostState {
    repositories: HashMap<RepositoryFullName, Repository>,
    created: usize,
    torn_down: usize,
    failures: FailureScript<CodeHostOperation>,
}

#[derive(Debug)]
struct Repository {
    workspace: WorkspaceRef,
    collaborators: HashSet<ParticipantId>,
    pull_requests: Vec<PullRequestSummary>,
}

impl Default for InMemoryCodeHost {
    fn default() -> Self {
        Self::new("bountyforge")
    }
}

impl InMemoryCodeHost {
    /// Creates an empty code host that provisions repositories under `owner`.
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            page_size_limit: 100,
            state: Arc::new(RwLock::new(CodeHostState {
                repositories: HashMap::new(),
                created: 0,
                torn_down: 0,
                failures: FailureScript::new(ExternalService::CodeHost),
            })),
        }
    }

    /// Caps the number of pull requests returned per page.
    #[must_use]
    pub const fn with_page_size(mut self, limit: u32) -> Self {
        self.page_size_limit = limit;
        self
    }

    fn repository_for(&self, task_id: TaskId) -> ExternalServiceResult<RepositoryFullName> {
        RepositoryFullName::for_task(&self.owner, task_id).map_err(|err| rejection(&err))
    }

    fn write(&self) -> ExternalServiceResult<RwLockWriteGuard<'_, CodeHostState>> {
        self.state
            .write()
            .map_err(|err| lock_failure(ExternalService::CodeHost, err))
    }

    /// Makes the next `times` calls to `operation` fail with `kind`.
    ///
    /// # Errors
    ///
    /// Returns a code-host failure when lock acquisition fails.
    pub fn fail_next(
        &self,
        operation: CodeHostOperation,
        kind: ExternalFailureKind,
        times: usize,
    ) -> ExternalServiceResult<()> {
        self.write()?.failures.push(operation, kind, times);
        Ok(())
    }

    /// Inserts or replaces a pull request in the workspace's repository.
    ///
    /// # Errors
    ///
    /// Returns a not-found failure when the workspace does not exist.
    pub fn upsert_pull_request(
        &self,
        workspace: &WorkspaceRef,
        pull_request: PullRequestSummary,
    ) -> ExternalServiceResult<()> {
        let mut state = self.write()?;
        let repository = state
            .repositories
            .get_mut(workspace.repository())
            .ok_or_else(|| missing_workspace(workspace))?;
        repository
            .pull_requests
            .retain(|existing| existing.number() != pull_request.number());
        repository.pull_requests.push(pull_request);
        repository.pull_requests.sort_by_key(PullRequestSummary::number);
        Ok(())
    }

    /// Opens a new pull request and returns its number.
    ///
    /// # Errors
    ///
    /// Returns a not-found failure when the workspace does not exist.
    pub fn open_pull_request(
        &self,
        workspace: &WorkspaceRef,
        title: &str,
    ) -> ExternalServiceResult<PullRequestNumber> {
        let next = {
            let state = self.write()?;
            let repository = state
                .repositories
                .get(workspace.repository())
                .ok_or_else(|| missing_workspace(workspace))?;
            let highest = repository
                .pull_requests
                .iter()
                .map(|pr| pr.number().value())
                .max()
                .unwrap_or_default();
            PullRequestNumber::new(highest.saturating_add(1)).map_err(|err| rejection(&err))?
        };
        self.upsert_pull_request(workspace, PullRequestSummary::new(next, title))?;
        Ok(next)
    }

    /// Returns `true` while the workspace exists.
    ///
    /// # Errors
    ///
    /// Returns a code-host failure when lock acquisition fails.
    pub fn workspace_exists(&self, workspace: &WorkspaceRef) -> ExternalServiceResult<bool> {
        Ok(self.write()?.repositories.contains_key(workspace.repository()))
    }

    /// Returns the workspace's current collaborators.
    ///
    /// # Errors
    ///
    /// Returns a not-found failure when the workspace does not exist.
    pub fn collaborators(&self, workspace: &WorkspaceRef) -> ExternalServiceResult<HashSet<ParticipantId>> {
        let state = self.write()?;
        state
            .repositories
            .get(workspace.repository())
            .map(|repository| repository.collaborators.clone())
            .ok_or_else(|| missing_workspace(workspace))
    }

    /// Returns how many workspaces have actually been created.
    ///
    /// # Errors
    ///
    /// Returns a code-host failure when lock acquisition fails.
    pub fn workspaces_created(&self) -> ExternalServiceResult<usize> {
        Ok(self.write()?.created)
    }

    /// Returns how many workspaces have actually been deleted.
    ///
    /// # Errors
    ///
    /// Returns a code-host failure when lock acquisition fails.
    pub fn workspaces_torn_down(&self) -> ExternalServiceResult<usize> {
        Ok(self.write()?.torn_down)
    }

    /// Returns how many times `operation` was invoked, including failures.
    ///
    /// # Errors
    ///
    /// Returns a code-host failure when lock acquisition fails.
    pub fn calls(&self, operation: CodeHostOperation) -> ExternalServiceResult<usize> {
        Ok(self.write()?.failures.calls(operation))
    }
}

fn rejection(err: &TaskDomainError) -> ExternalServiceError {
    ExternalServiceError::new(
        ExternalService::CodeHost,
        ExternalFailureKind::Rejected,
        err.to_string(),
    )
}

fn missing_workspace(workspace: &WorkspaceRef) -> ExternalServiceError {
    ExternalServiceError::new(
        ExternalService::CodeHost,
        ExternalFailureKind::NotFound,
        format!("workspace {workspace} does not exist"),
    )
}

fn invalid_cursor(cursor: &PageCursor) -> ExternalServiceError {
    ExternalServiceError::new(
        ExternalService::CodeHost,
        ExternalFailureKind::Rejected,
        format!("invalid page cursor '{}'", cursor.as_str()),
    )
}

#[async_trait]
impl WorkspaceProvisioner for InMemoryCodeHost {
    async fn ensure_workspace(&self, task_id: TaskId) -> ExternalServiceResult<WorkspaceRef> {
        let mut state = self.write()?;
        state.failures.on_call(CodeHostOperation::EnsureWorkspace)?;

        let repository_name = self.repository_for(task_id)?;
        if let Some(existing) = state.repositories.get(&repository_name) {
            return Ok(existing.workspace.clone());
        }

        let base_branch = BranchName::new("main").map_err(|err| rejection(&err))?;
        let workspace = WorkspaceRef::new(repository_name.clone(), base_branch);
        state.repositories.insert(
            repository_name,
            Repository {
                workspace: workspace.clone(),
                collaborators: HashSet::new(),
                pull_requests: Vec::new(),
            },
        );
        state.created = state.created.saturating_add(1);
        Ok(workspace)
    }

    async fn find_workspace(&self, task_id: TaskId) -> ExternalServiceResult<Option<WorkspaceRef>> {
        let mut state = self.write()?;
        state.failures.on_call(CodeHostOperation::FindWorkspace)?;
        let repository_name = self.repository_for(task_id)?;
        Ok(state
            .repositories
            .get(&repository_name)
            .map(|repository| repository.workspace.clone()))
    }

    async fn add_collaborator(
        &self,
        workspace: &WorkspaceRef,
        developer: &ParticipantId,
    ) -> ExternalServiceResult<()> {
        let mut state = self.write()?;
        state.failures.on_call(CodeHostOperation::AddCollaborator)?;
        let repository = state
            .repositories
            .get_mut(workspace.repository())
            .ok_or_else(|| missing_workspace(workspace))?;
        repository.collaborators.insert(developer.clone());
        Ok(())
    }

    async fn remove_collaborator(
        &self,
        workspace: &WorkspaceRef,
        developer: &ParticipantId,
    ) -> ExternalServiceResult<()> {
        let mut state = self.write()?;
        state.failures.on_call(CodeHostOperation::RemoveCollaborator)?;
        if let Some(repository) = state.repositories.get_mut(workspace.repository()) {
            repository.collaborators.remove(developer);
        }
        Ok(())
    }

    async fn teardown_workspace(&self, workspace: &WorkspaceRef) -> ExternalServiceResult<()> {
        let mut state = self.write()?;
        state.failures.on_call(CodeHostOperation::TeardownWorkspace)?;
        if state.repositories.remove(workspace.repository()).is_some() {
            state.torn_down = state.torn_down.saturating_add(1);
        }
        Ok(())
    }
}

#[async_trait]
impl PullRequestSource for InMemoryCodeHost {
    async fn pull_request_page(
        &self,
        workspace: &WorkspaceRef,
        page: PageRequest,
    ) -> ExternalServiceResult<PullRequestPage> {
        let mut state = self.write()?;
        state.failures.on_call(CodeHostOperation::ListPullRequests)?;
        let repository = state
            .repositories
            .get(workspace.repository())
            .ok_or_else(|| missing_workspace(workspace))?;

        let offset = page.cursor.as_ref().map_or(Ok(0), |cursor| {
            cursor
                .as_str()
                .parse::<usize>()
                .map_err(|_| invalid_cursor(cursor))
        })?;
        let per_page = usize::try_from(page.per_page.clamp(1, self.page_size_limit.max(1)))
            .unwrap_or(1);
        let items: Vec<PullRequestSummary> = repository
            .pull_requests
            .iter()
            .skip(offset)
            .take(per_page)
            .cloned()
            .collect();
        let consumed = offset.saturating_add(items.len());
        let next = (consumed < repository.pull_requests.len())
            .then(|| PageCursor::new(consumed.to_string()));

        Ok(PullRequestPage { items, next })
    }
}
