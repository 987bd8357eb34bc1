//! Escrow port for depositing, releasing, and refunding task funds.

use super::ExternalServiceResult;
use crate::task::domain::{EscrowReceipt, MinorUnits, Payout, TaskId};
use async_trait::async_trait;

/// On-chain or custodial escrow contract.
///
/// Every operation is idempotent per task: repeating a call that already
/// took effect returns the original receipt without moving funds again.
#[async_trait]
pub trait EscrowLedger: Send + Sync {
    /// Moves `amount` from the client into escrow for `task_id`.
    async fn deposit(&self, task_id: TaskId, amount: MinorUnits) -> ExternalServiceResult<EscrowReceipt>;

    /// Disburses the task's escrow according to `payout`.
    async fn release(&self, task_id: TaskId, payout: Payout) -> ExternalServiceResult<EscrowReceipt>;

    /// Returns the full deposit held for `task_id` to the client.
    ///
    /// Returns `None` when nothing was ever deposited for the task, so a
    /// cancellation can reconcile escrow without knowing whether an earlier
    /// deposit took effect.
    async fn refund(&self, task_id: TaskId) -> ExternalServiceResult<Option<EscrowReceipt>>;
}
