//! Caller identity as supplied by the identity collaborator.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque participant identifier owned by the identity collaborator.
///
/// The same identifier is used as the developer's handle on the code host
/// when they are added as a workspace collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Creates a validated participant identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidParticipantId`] when the value is
    /// empty after trimming or contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() || normalized.chars().any(char::is_whitespace) {
            return Err(TaskDomainError::InvalidParticipantId(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = TaskDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(value: ParticipantId) -> Self {
        value.0
    }
}

impl AsRef<str> for ParticipantId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role the caller is acting in for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    /// A client posting and paying for tasks.
    Client,
    /// A developer applying for and delivering tasks.
    Developer,
    /// A platform arbiter resolving disputes.
    Arbiter,
}

/// Authenticated caller of an orchestrator operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caller {
    id: ParticipantId,
    role: CallerRole,
}

impl Caller {
    /// Creates a caller from an identity and role.
    #[must_use]
    pub const fn new(id: ParticipantId, role: CallerRole) -> Self {
        Self { id, role }
    }

    /// Creates a caller acting as a client.
    #[must_use]
    pub const fn client(id: ParticipantId) -> Self {
        Self::new(id, CallerRole::Client)
    }

    /// Creates a caller acting as a developer.
    #[must_use]
    pub const fn developer(id: ParticipantId) -> Self {
        Self::new(id, CallerRole::Developer)
    }

    /// Creates a caller acting as an arbiter.
    #[must_use]
    pub const fn arbiter(id: ParticipantId) -> Self {
        Self::new(id, CallerRole::Arbiter)
    }

    /// Returns the caller identifier.
    #[must_use]
    pub const fn id(&self) -> &ParticipantId {
        &self.id
    }

    /// Returns the role the caller is acting in.
    #[must_use]
    pub const fn role(&self) -> CallerRole {
        self.role
    }
}
