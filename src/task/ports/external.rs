//! Failure taxonomy shared by every external collaborator.

use std::fmt;
use thiserror::Error;

/// Result type for external collaborator calls.
pub type ExternalServiceResult<T> = Result<T, ExternalServiceError>;

/// External system a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalService {
    /// The code-hosting platform.
    CodeHost,
    /// The on-chain or custodial escrow.
    Escrow,
    /// The task store.
    Persistence,
}

impl ExternalService {
    /// Returns a short service name for messages and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CodeHost => "code host",
            Self::Escrow => "escrow",
            Self::Persistence => "task store",
        }
    }
}

impl fmt::Display for ExternalService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of an external failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalFailureKind {
    /// The collaborator throttled the request.
    RateLimited,
    /// The call did not complete in time.
    Timeout,
    /// The connection failed or the collaborator was temporarily unavailable.
    Unavailable,
    /// The credentials were rejected or lack permission.
    Unauthorized,
    /// The referenced resource does not exist.
    NotFound,
    /// The collaborator refused the request as invalid.
    Rejected,
}

impl ExternalFailureKind {
    /// Returns `true` when retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout | Self::Unavailable)
    }

    /// Classifies an HTTP status code returned by a collaborator API.
    #[must_use]
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            408 | 504 => Self::Timeout,
            401 | 403 => Self::Unauthorized,
            404 | 410 => Self::NotFound,
            500..=599 => Self::Unavailable,
            _ => Self::Rejected,
        }
    }

    /// Returns the canonical name of the failure kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate limited",
            Self::Timeout => "timed out",
            Self::Unavailable => "unavailable",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not found",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ExternalFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by the code host, escrow, or task store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{service} {kind}: {message}")]
pub struct ExternalServiceError {
    service: ExternalService,
    kind: ExternalFailureKind,
    message: String,
}

impl ExternalServiceError {
    /// Creates an external failure.
    #[must_use]
    pub fn new(service: ExternalService, kind: ExternalFailureKind, message: impl Into<String>) -> Self {
        Self {
            service,
            kind,
            message: message.into(),
        }
    }

    /// Creates a failure from an HTTP status returned by a collaborator API.
    #[must_use]
    pub fn from_http_status(service: ExternalService, status: u16, message: impl Into<String>) -> Self {
        Self::new(service, ExternalFailureKind::from_http_status(status), message)
    }

    /// Creates a timeout failure for a call that exceeded its deadline.
    #[must_use]
    pub fn timeout(service: ExternalService, operation: &str) -> Self {
        Self::new(
            service,
            ExternalFailureKind::Timeout,
            format!("{operation} did not complete in time"),
        )
    }

    /// Wraps an opaque transport or backend error as a non-retryable failure.
    #[must_use]
    pub fn backend(service: ExternalService, err: &(dyn std::error::Error + Send + Sync)) -> Self {
        Self::new(service, ExternalFailureKind::Rejected, err.to_string())
    }

    /// Returns the failing service.
    #[must_use]
    pub const fn service(&self) -> ExternalService {
        self.service
    }

    /// Returns the failure classification.
    #[must_use]
    pub const fn kind(&self) -> ExternalFailureKind {
        self.kind
    }

    /// Returns the collaborator's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` when retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
