//! In-memory escrow ledger.

use super::failures::{FailureScript, lock_failure};
use crate::task::{
    domain::{EscrowOperation, EscrowReceipt, MinorUnits, Payout, ReceiptId, TaskId},
    ports::{
        EscrowLedger, ExternalFailureKind, ExternalService, ExternalServiceError,
        ExternalServiceResult,
    },
};
use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use uuid::Uuid;

/// Thread-safe escrow ledger keeping one account per task.
///
/// Repeating an operation that already took effect returns the original
/// receipt, so retried calls never move funds twice. Requests that
/// contradict the account's history are rejected as permanent failures.
/// Receipts are stamped with the injected clock.
pub struct InMemoryEscrowLedger<C: Clock + Send + Sync = DefaultClock> {
    state: Arc<RwLock<LedgerState>>,
    clock: Arc<C>,
}

impl<C: Clock + Send + Sync> Clone for InMemoryEscrowLedger<C> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C: Clock + Send + Sync> fmt::Debug for InMemoryEscrowLedger<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryEscrowLedger")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct LedgerState {
    accounts: HashMap<TaskId, Account>,
    deposits: usize,
    releases: usize,
    refunds: usize,
    failures: FailureScript<EscrowOperation>,
}

#[derive(Debug, Default)]
struct Account {
    deposit: Option<EscrowReceipt>,
    release: Option<(EscrowReceipt, Payout)>,
    refund: Option<EscrowReceipt>,
}

impl Default for InMemoryEscrowLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEscrowLedger {
    /// Creates an empty ledger stamping receipts with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }
}

fn rejected(message: String) -> ExternalServiceError {
    ExternalServiceError::new(ExternalService::Escrow, ExternalFailureKind::Rejected, message)
}

impl<C: Clock + Send + Sync> InMemoryEscrowLedger<C> {
    /// Creates an empty ledger stamping receipts with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<C>) -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState {
                accounts: HashMap::new(),
                deposits: 0,
                releases: 0,
                refunds: 0,
                failures: FailureScript::new(ExternalService::Escrow),
            })),
            clock,
        }
    }

    fn receipt(&self, task_id: TaskId, operation: EscrowOperation, amount: MinorUnits) -> EscrowReceipt {
        EscrowReceipt::new(
            ReceiptId::new(format!("{operation}-{}", Uuid::new_v4())),
            task_id,
            operation,
            amount,
            self.clock.utc(),
        )
    }

    fn write(&self) -> ExternalServiceResult<RwLockWriteGuard<'_, LedgerState>> {
        self.state
            .write()
            .map_err(|err| lock_failure(ExternalService::Escrow, err))
    }

    /// Makes the next `times` calls to `operation` fail with `kind`.
    ///
    /// # Errors
    ///
    /// Returns an escrow failure when lock acquisition fails.
    pub fn fail_next(
        &self,
        operation: EscrowOperation,
        kind: ExternalFailureKind,
        times: usize,
    ) -> ExternalServiceResult<()> {
        self.write()?.failures.push(operation, kind, times);
        Ok(())
    }

    /// Returns how many times `operation` was invoked, including failures
    /// and idempotent repeats.
    ///
    /// # Errors
    ///
    /// Returns an escrow failure when lock acquisition fails.
    pub fn calls(&self, operation: EscrowOperation) -> ExternalServiceResult<usize> {
        Ok(self.write()?.failures.calls(operation))
    }

    /// Returns how many deposits actually moved funds.
    ///
    /// # Errors
    ///
    /// Returns an escrow failure when lock acquisition fails.
    pub fn deposits(&self) -> ExternalServiceResult<usize> {
        Ok(self.write()?.deposits)
    }

    /// Returns how many releases actually moved funds.
    ///
    /// # Errors
    ///
    /// Returns an escrow failure when lock acquisition fails.
    pub fn releases(&self) -> ExternalServiceResult<usize> {
        Ok(self.write()?.releases)
    }

    /// Returns how many refunds actually moved funds.
    ///
    /// # Errors
    ///
    /// Returns an escrow failure when lock acquisition fails.
    pub fn refunds(&self) -> ExternalServiceResult<usize> {
        Ok(self.write()?.refunds)
    }

    /// Returns the amount currently held for `task_id`.
    ///
    /// # Errors
    ///
    /// Returns an escrow failure when lock acquisition fails.
    pub fn held(&self, task_id: TaskId) -> ExternalServiceResult<MinorUnits> {
        let state = self.write()?;
        let held = state
            .accounts
            .get(&task_id)
            .filter(|account| account.release.is_none() && account.refund.is_none())
            .and_then(|account| account.deposit.as_ref())
            .map_or(MinorUnits::ZERO, EscrowReceipt::amount);
        Ok(held)
    }

    /// Returns the disbursement made for `task_id`, if released.
    ///
    /// # Errors
    ///
    /// Returns an escrow failure when lock acquisition fails.
    pub fn payout(&self, task_id: TaskId) -> ExternalServiceResult<Option<Payout>> {
        let state = self.write()?;
        Ok(state
            .accounts
            .get(&task_id)
            .and_then(|account| account.release.as_ref())
            .map(|(_, payout)| *payout))
    }
}

#[async_trait]
impl<C: Clock + Send + Sync> EscrowLedger for InMemoryEscrowLedger<C> {
    async fn deposit(&self, task_id: TaskId, amount: MinorUnits) -> ExternalServiceResult<EscrowReceipt> {
        let mut state = self.write()?;
        state.failures.on_call(EscrowOperation::Deposit)?;
        if amount == MinorUnits::ZERO {
            return Err(rejected(format!("deposit for task {task_id} must be positive")));
        }

        let account = state.accounts.entry(task_id).or_default();
        if let Some(existing) = &account.deposit {
            if existing.amount() != amount {
                return Err(rejected(format!(
                    "task {task_id} already holds a deposit of {}, refusing {amount}",
                    existing.amount()
                )));
            }
            return Ok(existing.clone());
        }

        let recorded = self.receipt(task_id, EscrowOperation::Deposit, amount);
        account.deposit = Some(recorded.clone());
        state.deposits = state.deposits.saturating_add(1);
        Ok(recorded)
    }

    async fn release(&self, task_id: TaskId, payout: Payout) -> ExternalServiceResult<EscrowReceipt> {
        let mut state = self.write()?;
        state.failures.on_call(EscrowOperation::Release)?;
        let total = payout
            .total()
            .ok_or_else(|| rejected(format!("payout for task {task_id} overflows")))?;

        let account = state
            .accounts
            .get_mut(&task_id)
            .ok_or_else(|| rejected(format!("task {task_id} has no escrow account")))?;
        if let Some((existing, _)) = &account.release {
            return Ok(existing.clone());
        }
        if account.refund.is_some() {
            return Err(rejected(format!("task {task_id} escrow was already refunded")));
        }
        let held = account
            .deposit
            .as_ref()
            .map(EscrowReceipt::amount)
            .ok_or_else(|| rejected(format!("task {task_id} holds no deposit")))?;
        if total > held {
            return Err(rejected(format!(
                "payout of {total} exceeds the {held} held for task {task_id}"
            )));
        }

        let recorded = self.receipt(task_id, EscrowOperation::Release, total);
        account.release = Some((recorded.clone(), payout));
        state.releases = state.releases.saturating_add(1);
        Ok(recorded)
    }

    async fn refund(&self, task_id: TaskId) -> ExternalServiceResult<Option<EscrowReceipt>> {
        let mut state = self.write()?;
        state.failures.on_call(EscrowOperation::Refund)?;

        let Some(account) = state.accounts.get_mut(&task_id) else {
            return Ok(None);
        };
        if let Some(existing) = &account.refund {
            return Ok(Some(existing.clone()));
        }
        if account.release.is_some() {
            return Err(rejected(format!("task {task_id} escrow was already released")));
        }
        let Some(held) = account.deposit.as_ref().map(EscrowReceipt::amount) else {
            return Ok(None);
        };

        let recorded = self.receipt(task_id, EscrowOperation::Refund, held);
        account.refund = Some(recorded.clone());
        state.refunds = state.refunds.saturating_add(1);
        Ok(Some(recorded))
    }
}
