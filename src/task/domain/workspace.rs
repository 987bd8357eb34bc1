//! Collaboration workspace references owned by a task.

use super::{RepositoryFullName, TaskDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for a validated branch name.
const MAX_BRANCH_NAME_LENGTH: usize = 200;

/// Validated Git branch name.
///
/// Branch names must be non-empty after trimming, must not contain colon
/// characters, and must not exceed `MAX_BRANCH_NAME_LENGTH` characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(String);

impl BranchName {
    /// Creates a validated branch name.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidBranchName`] when the value is empty,
    /// contains a colon, or exceeds the length limit.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let normalized = raw.trim();

        if normalized.is_empty()
            || normalized.contains(':')
            || normalized.len() > MAX_BRANCH_NAME_LENGTH
        {
            return Err(TaskDomainError::InvalidBranchName(raw));
        }

        Ok(Self(normalized.to_owned()))
    }

    /// Returns the branch name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to the external repository provisioned for a task.
///
/// The base branch is the review target that pull requests are opened
/// against. Displayed as `owner/repo:base-branch`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceRef {
    repository: RepositoryFullName,
    base_branch: BranchName,
}

impl WorkspaceRef {
    /// Creates a workspace reference from validated components.
    #[must_use]
    pub const fn new(repository: RepositoryFullName, base_branch: BranchName) -> Self {
        Self {
            repository,
            base_branch,
        }
    }

    /// Returns the repository identifier.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryFullName {
        &self.repository
    }

    /// Returns the branch pull requests target.
    #[must_use]
    pub const fn base_branch(&self) -> &BranchName {
        &self.base_branch
    }
}

impl fmt::Display for WorkspaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.base_branch)
    }
}
