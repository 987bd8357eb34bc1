//! Escrow amounts, quotes, and receipts.
//!
//! All arithmetic is performed on integer minor units. The quote is a pure
//! function of the principal and the fee rate; it is recomputed whenever a
//! deposit or release is enacted and never persisted on its own.
//!
//! Settlement policy:
//!
//! - the client deposits [`EscrowQuote::total_deposit`] (principal plus fee);
//! - completion releases the principal to the developer and the rest of the
//!   held deposit to the platform, so a fee-rate change after the deposit
//!   never unbalances the release;
//! - cancellation refunds the full deposited amount to the client.

use super::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of basis points in one whole (100%).
const BASIS_POINTS_PER_WHOLE: u128 = 10_000;

/// Errors returned for malformed monetary input.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum InvalidAmount {
    /// The principal is zero or negative.
    #[error("principal must be a positive amount of minor units, got {0}")]
    NonPositivePrincipal(i128),

    /// The fee rate is negative.
    #[error("fee rate must be a non-negative number of basis points, got {0}")]
    NegativeFeeRate(i64),

    /// The fee or total deposit does not fit the settlement amount range.
    #[error("escrow amount overflows the settlement range")]
    Overflow,
}

/// Amount in the smallest indivisible unit of the settlement currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(u64);

impl MinorUnits {
    /// Zero minor units.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw amount.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Creates a strictly positive amount from a signed boundary value.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidAmount::NonPositivePrincipal`] when the value is zero
    /// or negative.
    pub fn positive(value: i64) -> Result<Self, InvalidAmount> {
        u64::try_from(value)
            .ok()
            .filter(|amount| *amount > 0)
            .map(Self)
            .ok_or_else(|| InvalidAmount::NonPositivePrincipal(i128::from(value)))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Adds two amounts, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform fee rate expressed in basis points (300 = 3%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeRate(u64);

impl FeeRate {
    /// Creates a fee rate from unsigned basis points.
    #[must_use]
    pub const fn new(basis_points: u64) -> Self {
        Self(basis_points)
    }

    /// Creates a fee rate from a signed boundary value.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidAmount::NegativeFeeRate`] when the value is negative.
    pub fn from_basis_points(basis_points: i64) -> Result<Self, InvalidAmount> {
        u64::try_from(basis_points)
            .map(Self)
            .map_err(|_| InvalidAmount::NegativeFeeRate(basis_points))
    }

    /// Returns the rate in basis points.
    #[must_use]
    pub const fn basis_points(self) -> u64 {
        self.0
    }
}

impl Default for FeeRate {
    fn default() -> Self {
        Self(300)
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bps", self.0)
    }
}

/// Exact split of a task's value into principal, fee, and deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EscrowQuote {
    principal: MinorUnits,
    platform_fee: MinorUnits,
    total_deposit: MinorUnits,
}

impl EscrowQuote {
    /// Computes the quote for a principal at the given fee rate.
    ///
    /// The fee is `floor(principal * rate / 10000)`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidAmount::NonPositivePrincipal`] for a zero principal
    /// and [`InvalidAmount::Overflow`] when the fee or total does not fit.
    pub fn compute(principal: MinorUnits, fee_rate: FeeRate) -> Result<Self, InvalidAmount> {
        if principal == MinorUnits::ZERO {
            return Err(InvalidAmount::NonPositivePrincipal(0));
        }
        let scaled = u128::from(principal.value())
            .checked_mul(u128::from(fee_rate.basis_points()))
            .ok_or(InvalidAmount::Overflow)?;
        let fee = scaled
            .checked_div(BASIS_POINTS_PER_WHOLE)
            .and_then(|fee| u64::try_from(fee).ok())
            .map(MinorUnits::new)
            .ok_or(InvalidAmount::Overflow)?;
        let total_deposit = principal.checked_add(fee).ok_or(InvalidAmount::Overflow)?;

        Ok(Self {
            principal,
            platform_fee: fee,
            total_deposit,
        })
    }

    /// Returns the amount owed to the developer.
    #[must_use]
    pub const fn principal(&self) -> MinorUnits {
        self.principal
    }

    /// Returns the platform fee.
    #[must_use]
    pub const fn platform_fee(&self) -> MinorUnits {
        self.platform_fee
    }

    /// Returns the amount the client deposits.
    #[must_use]
    pub const fn total_deposit(&self) -> MinorUnits {
        self.total_deposit
    }
}

/// Computes an escrow quote from raw boundary values.
///
/// # Errors
///
/// Returns [`InvalidAmount`] for a non-positive principal, a negative fee
/// rate, or an overflowing total. Inputs are never clamped.
///
/// # Examples
///
///     use bountyforge::task::domain::quote_escrow;
///
///     let quote = quote_escrow(1_000_000, 300).expect("valid amounts");
///     assert_eq!(quote.platform_fee().value(), 30_000);
///     assert_eq!(quote.total_deposit().value(), 1_030_000);
pub fn quote_escrow(principal: i64, fee_rate_basis_points: i64) -> Result<EscrowQuote, InvalidAmount> {
    let validated_principal = MinorUnits::positive(principal)?;
    let fee_rate = FeeRate::from_basis_points(fee_rate_basis_points)?;
    EscrowQuote::compute(validated_principal, fee_rate)
}

/// Split of released escrow funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Payout {
    /// Amount released to the developer.
    pub developer: MinorUnits,
    /// Amount retained by the platform.
    pub platform: MinorUnits,
}

impl Payout {
    /// Returns the total amount leaving escrow.
    #[must_use]
    pub const fn total(&self) -> Option<MinorUnits> {
        self.developer.checked_add(self.platform)
    }
}

/// Identifier of an escrow transaction recorded by the escrow collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(String);

impl ReceiptId {
    /// Wraps a collaborator-issued receipt identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of escrow movement a receipt records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowOperation {
    /// Funds moved from the client into escrow.
    Deposit,
    /// Funds moved from escrow to the developer and platform.
    Release,
    /// Funds returned from escrow to the client.
    Refund,
}

impl EscrowOperation {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Release => "release",
            Self::Refund => "refund",
        }
    }
}

impl fmt::Display for EscrowOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proof of an escrow movement returned by the escrow collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowReceipt {
    id: ReceiptId,
    task_id: TaskId,
    operation: EscrowOperation,
    amount: MinorUnits,
    recorded_at: DateTime<Utc>,
}

impl EscrowReceipt {
    /// Creates a receipt.
    #[must_use]
    pub const fn new(
        id: ReceiptId,
        task_id: TaskId,
        operation: EscrowOperation,
        amount: MinorUnits,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            task_id,
            operation,
            amount,
            recorded_at,
        }
    }

    /// Returns the receipt identifier.
    #[must_use]
    pub const fn id(&self) -> &ReceiptId {
        &self.id
    }

    /// Returns the task the movement belongs to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the kind of movement.
    #[must_use]
    pub const fn operation(&self) -> EscrowOperation {
        self.operation
    }

    /// Returns the amount moved.
    #[must_use]
    pub const fn amount(&self) -> MinorUnits {
        self.amount
    }

    /// Returns when the collaborator recorded the movement.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

/// Escrow position of a task.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EscrowState {
    /// Nothing has been deposited.
    #[default]
    Unfunded,
    /// The client's deposit is held in escrow.
    Deposited {
        /// Deposit receipt.
        deposit: EscrowReceipt,
    },
    /// Escrow was released on completion.
    Released {
        /// Deposit receipt.
        deposit: EscrowReceipt,
        /// Release receipt.
        release: EscrowReceipt,
    },
    /// Escrow was refunded on cancellation.
    Refunded {
        /// Deposit receipt.
        deposit: EscrowReceipt,
        /// Refund receipt.
        refund: EscrowReceipt,
    },
}

impl EscrowState {
    /// Returns the deposit receipt when funds were ever deposited.
    #[must_use]
    pub const fn deposit(&self) -> Option<&EscrowReceipt> {
        match self {
            Self::Unfunded => None,
            Self::Deposited { deposit }
            | Self::Released { deposit, .. }
            | Self::Refunded { deposit, .. } => Some(deposit),
        }
    }

    /// Returns the receipt of funds currently held in escrow, if any.
    #[must_use]
    pub const fn held(&self) -> Option<&EscrowReceipt> {
        match self {
            Self::Deposited { deposit } => Some(deposit),
            Self::Unfunded | Self::Released { .. } | Self::Refunded { .. } => None,
        }
    }
}
