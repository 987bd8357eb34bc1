//! Domain model for task lifecycle and settlement.
//!
//! The domain owns the task state machine, the escrow amount calculator, and
//! the values exchanged with the code host and the escrow collaborator. It
//! performs no I/O: transitions are planned as a list of external steps and
//! applied once the orchestrator reports their outcomes.

mod error;
mod escrow;
mod ids;
mod participant;
mod review;
mod state;
mod task;
mod workspace;

pub use error::{GuardViolation, ParseTaskStateError, TaskDomainError};
pub use escrow::{
    EscrowOperation, EscrowQuote, EscrowReceipt, EscrowState, FeeRate, InvalidAmount, MinorUnits,
    Payout, ReceiptId, quote_escrow,
};
pub use ids::{RepositoryFullName, TaskId, TaskVersion};
pub use participant::{Caller, CallerRole, ParticipantId};
pub use review::{
    PullRequestNumber, PullRequestState, PullRequestSummary, ReviewState, ReviewTally,
};
pub use state::{DisputeResolution, TaskEvent, TaskEventKind, TaskState, TransitionStep};
pub use task::{PersistedTaskData, StepOutcomes, Task, TransitionPlan};
pub use workspace::{BranchName, WorkspaceRef};
