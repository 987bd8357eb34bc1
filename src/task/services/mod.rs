//! Application services for task lifecycle and settlement.

mod config;
mod error;
mod orchestrator;
mod retry;
mod review_gate;

pub use config::{OrchestratorConfig, RetryPolicy};
pub use error::{OrchestratorError, OrchestratorErrorKind, OrchestratorResult};
pub use orchestrator::{CreateTaskRequest, TaskOrchestrator};
pub use review_gate::{DEFAULT_PAGE_SIZE, ReviewGate};

#[cfg(test)]
pub(crate) use retry::with_retry;
