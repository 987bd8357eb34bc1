//! Port contracts for task lifecycle and settlement.
//!
//! Ports define infrastructure-agnostic interfaces used by task services:
//! the task store, the code host, and the escrow collaborator.

pub mod code_host;
pub mod escrow;
pub mod external;
pub mod store;

pub use code_host::{PageCursor, PageRequest, PullRequestPage, PullRequestSource, WorkspaceProvisioner};
pub use escrow::EscrowLedger;
pub use external::{ExternalFailureKind, ExternalService, ExternalServiceError, ExternalServiceResult};
pub use store::{SaveOutcome, TaskStore, TaskStoreError, TaskStoreResult, VersionedTask};
