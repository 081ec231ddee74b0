//! Fee domain types.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// Lifecycle status of a fee record.
///
/// PENDING and PAID are live states. CANCELLED, INACTIVE and TRANSFERRED are
/// terminal: a terminal fee never receives money and is not what a student
/// currently owes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeStatus {
    /// Money is still owed.
    Pending,
    /// Nothing is owed.
    Paid,
    /// Replaced by a new fee during a batch switch.
    Cancelled,
    /// Withdrawn or frozen with money still owed.
    Inactive,
    /// Moved to another record.
    Transferred,
}

impl FeeStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
            Self::Inactive => "INACTIVE",
            Self::Transferred => "TRANSFERRED",
        }
    }

    /// Parses a status from its stored form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PAID" => Some(Self::Paid),
            "CANCELLED" => Some(Self::Cancelled),
            "INACTIVE" => Some(Self::Inactive),
            "TRANSFERRED" => Some(Self::Transferred),
            _ => None,
        }
    }

    /// Returns true if the fee can never change again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Inactive | Self::Transferred)
    }

    /// The live status for an outstanding balance.
    #[must_use]
    pub const fn for_balance(balance: i64) -> Self {
        if balance == 0 { Self::Paid } else { Self::Pending }
    }
}

impl fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The parts of a stored fee that balance arithmetic needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSnapshot {
    /// Fee id.
    pub id: Uuid,
    /// Current status.
    pub status: FeeStatus,
    /// Sticker price at creation.
    pub total_course_fee: i64,
    /// Discount granted.
    pub discount_amount: i64,
    /// Credit carried over from a fee frozen by a split switch.
    pub carry_over_amount: i64,
    /// `total_course_fee - discount_amount - carry_over_amount`.
    pub final_fee: i64,
    /// Stored outstanding balance. `None` means never initialised.
    pub balance_amount: Option<i64>,
    /// Set once a split switch froze this fee.
    pub frozen: bool,
}

impl FeeSnapshot {
    /// Outstanding balance, reading an uninitialised balance as the full final fee.
    #[must_use]
    pub fn outstanding(&self) -> i64 {
        self.balance_amount.unwrap_or(self.final_fee)
    }

    /// Fails unless money may still move on this fee.
    ///
    /// A fee frozen by a split reports `FeeFrozen` whatever its status.
    pub fn ensure_mutable(&self) -> Result<(), LedgerError> {
        if self.frozen {
            return Err(LedgerError::FeeFrozen(self.id));
        }
        if self.status.is_terminal() {
            return Err(LedgerError::TerminalFee {
                fee_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }
}

/// Result of a balance computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    /// Balance after the change.
    pub new_balance: i64,
    /// Status after the change.
    pub new_status: FeeStatus,
    /// True only when this change moved the fee into PAID.
    pub completed: bool,
}

impl BalanceUpdate {
    pub(crate) fn from_previous(previous: FeeStatus, new_balance: i64) -> Self {
        let new_status = FeeStatus::for_balance(new_balance);
        Self {
            new_balance,
            new_status,
            completed: new_status == FeeStatus::Paid && previous != FeeStatus::Paid,
        }
    }
}

/// Monetary terms of a fee about to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTerms {
    /// Sticker price.
    pub total_course_fee: i64,
    /// Discount granted.
    pub discount_amount: i64,
    /// Credit carried from a frozen fee.
    pub carry_over_amount: i64,
    /// Amount payable.
    pub final_fee: i64,
    /// Opening balance.
    pub balance_amount: i64,
    /// Opening status.
    pub status: FeeStatus,
}

impl FeeTerms {
    /// Terms for a fresh admission at the course base fee.
    pub fn admission(base_fee: i64, discount_amount: i64) -> Result<Self, LedgerError> {
        if base_fee < 0 {
            return Err(LedgerError::Validation(format!(
                "course base fee {base_fee} is negative"
            )));
        }
        if !(0..=base_fee).contains(&discount_amount) {
            return Err(LedgerError::Validation(format!(
                "discount {discount_amount} must be between 0 and {base_fee}"
            )));
        }
        let final_fee = base_fee - discount_amount;
        Ok(Self {
            total_course_fee: base_fee,
            discount_amount,
            carry_over_amount: 0,
            final_fee,
            balance_amount: final_fee,
            status: FeeStatus::for_balance(final_fee),
        })
    }

    /// Terms for a fee that replaces an old one and inherits its payments.
    #[must_use]
    pub fn replacement(base_fee: i64, paid_on_old: i64) -> Self {
        let balance = (base_fee - paid_on_old).max(0);
        Self {
            total_course_fee: base_fee,
            discount_amount: 0,
            carry_over_amount: 0,
            final_fee: base_fee,
            balance_amount: balance,
            status: FeeStatus::for_balance(balance),
        }
    }

    /// Terms for a fee that starts fresh next to a frozen one.
    ///
    /// The frozen fee keeps its payments, so the money already paid enters as
    /// carry-over credit instead of as linked payments.
    #[must_use]
    pub fn split(base_fee: i64, paid_on_old: i64) -> Self {
        let carry_over = paid_on_old.clamp(0, base_fee.max(0));
        let final_fee = base_fee - carry_over;
        Self {
            total_course_fee: base_fee,
            discount_amount: 0,
            carry_over_amount: carry_over,
            final_fee,
            balance_amount: final_fee,
            status: FeeStatus::for_balance(final_fee),
        }
    }
}
