//! Balance arithmetic for fee records.
//!
//! These functions compute what a fee should look like after money moves.
//! They never touch storage; the repository layer applies the result under a
//! row lock and, as a safety net, rebuilds the balance with [`FeeLedger::recompute`]
//! from the payments actually linked to the fee.

use crate::error::LedgerError;
use crate::fee::types::{BalanceUpdate, FeeSnapshot};

/// Stateless fee balance calculator.
pub struct FeeLedger;

impl FeeLedger {
    /// Applies an incoming payment.
    ///
    /// The balance is clamped at zero and the fee becomes PAID when nothing is
    /// left owing.
    ///
    /// # Errors
    ///
    /// - `Validation` if the amount is not positive
    /// - `TerminalFee` / `FeeFrozen` if the fee can no longer change
    /// - `FeeAlreadyPaid` if nothing is owed
    pub fn apply_money(fee: &FeeSnapshot, amount: i64) -> Result<BalanceUpdate, LedgerError> {
        ensure_positive(amount)?;
        fee.ensure_mutable()?;

        let outstanding = fee.outstanding();
        if outstanding == 0 {
            return Err(LedgerError::FeeAlreadyPaid(fee.id));
        }

        let new_balance = outstanding.saturating_sub(amount).max(0);
        Ok(BalanceUpdate::from_previous(fee.status, new_balance))
    }

    /// Gives a previously applied payment back to the fee.
    ///
    /// # Errors
    ///
    /// - `Validation` if the amount is not positive
    /// - `TerminalFee` / `FeeFrozen` if the fee can no longer change
    pub fn reverse_money(fee: &FeeSnapshot, amount: i64) -> Result<BalanceUpdate, LedgerError> {
        ensure_positive(amount)?;
        fee.ensure_mutable()?;

        let new_balance = fee
            .outstanding()
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Validation(format!("amount {amount} overflows balance")))?;
        Ok(BalanceUpdate::from_previous(fee.status, new_balance))
    }

    /// Replaces the amount of an already applied payment in one step.
    ///
    /// The balance moves by `old_amount - new_amount`, clamped at zero.
    pub fn adjust(
        fee: &FeeSnapshot,
        old_amount: i64,
        new_amount: i64,
    ) -> Result<BalanceUpdate, LedgerError> {
        ensure_positive(new_amount)?;
        fee.ensure_mutable()?;

        let delta = old_amount - new_amount;
        let new_balance = fee.outstanding().saturating_add(delta).max(0);
        Ok(BalanceUpdate::from_previous(fee.status, new_balance))
    }

    /// Rebuilds the balance from the sum of PAID payments linked to the fee.
    pub fn recompute(fee: &FeeSnapshot, paid_total: i64) -> Result<BalanceUpdate, LedgerError> {
        fee.ensure_mutable()?;
        if paid_total < 0 {
            return Err(LedgerError::ConsistencyViolation(format!(
                "fee {} has negative paid total {paid_total}",
                fee.id
            )));
        }

        let new_balance = (fee.final_fee - paid_total).max(0);
        Ok(BalanceUpdate::from_previous(fee.status, new_balance))
    }

    /// Changes the discount and returns the new final fee with the rebuilt balance.
    pub fn with_discount(
        fee: &FeeSnapshot,
        discount_amount: i64,
        paid_total: i64,
    ) -> Result<(i64, BalanceUpdate), LedgerError> {
        fee.ensure_mutable()?;

        let ceiling = fee.total_course_fee - fee.carry_over_amount;
        if !(0..=ceiling).contains(&discount_amount) {
            return Err(LedgerError::Validation(format!(
                "discount {discount_amount} must be between 0 and {ceiling}"
            )));
        }

        let final_fee = ceiling - discount_amount;
        let rebased = FeeSnapshot {
            discount_amount,
            final_fee,
            ..fee.clone()
        };
        let update = Self::recompute(&rebased, paid_total)?;
        Ok((final_fee, update))
    }
}

fn ensure_positive(amount: i64) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::Validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee::types::FeeStatus;
    use uuid::Uuid;

    fn fee(final_fee: i64, balance: Option<i64>, status: FeeStatus) -> FeeSnapshot {
        FeeSnapshot {
            id: Uuid::nil(),
            status,
            total_course_fee: final_fee,
            discount_amount: 0,
            carry_over_amount: 0,
            final_fee,
            balance_amount: balance,
            frozen: false,
        }
    }

    #[test]
    fn test_two_cash_payments_complete_fee_once() {
        let start = fee(30_000, None, FeeStatus::Pending);

        let first = FeeLedger::apply_money(&start, 10_000).unwrap();
        assert_eq!(first.new_balance, 20_000);
        assert_eq!(first.new_status, FeeStatus::Pending);
        assert!(!first.completed);

        let after_first = fee(30_000, Some(first.new_balance), first.new_status);
        let second = FeeLedger::apply_money(&after_first, 20_000).unwrap();
        assert_eq!(second.new_balance, 0);
        assert_eq!(second.new_status, FeeStatus::Paid);
        assert!(second.completed);

        let paid = fee(30_000, Some(0), FeeStatus::Paid);
        let resaved = FeeLedger::recompute(&paid, 30_000).unwrap();
        assert!(!resaved.completed);
    }

    #[test]
    fn test_overpayment_clamps_at_zero() {
        let start = fee(10_000, Some(4_000), FeeStatus::Pending);
        let update = FeeLedger::apply_money(&start, 9_000).unwrap();
        assert_eq!(update.new_balance, 0);
    }

    #[test]
    fn test_rejects_terminal_frozen_and_paid_fees() {
        let cancelled = fee(10_000, Some(5_000), FeeStatus::Cancelled);
        assert!(matches!(
            FeeLedger::apply_money(&cancelled, 100),
            Err(LedgerError::TerminalFee { .. })
        ));

        let mut frozen = fee(10_000, Some(0), FeeStatus::Paid);
        frozen.frozen = true;
        assert!(matches!(
            FeeLedger::reverse_money(&frozen, 100),
            Err(LedgerError::FeeFrozen(_))
        ));

        let paid = fee(10_000, Some(0), FeeStatus::Paid);
        assert!(matches!(
            FeeLedger::apply_money(&paid, 100),
            Err(LedgerError::FeeAlreadyPaid(_))
        ));
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let start = fee(10_000, None, FeeStatus::Pending);
        assert!(matches!(
            FeeLedger::apply_money(&start, 0),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            FeeLedger::reverse_money(&start, -5),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_reverse_reopens_paid_fee() {
        let paid = fee(10_000, Some(0), FeeStatus::Paid);
        let update = FeeLedger::reverse_money(&paid, 2_500).unwrap();
        assert_eq!(update.new_balance, 2_500);
        assert_eq!(update.new_status, FeeStatus::Pending);
    }

    #[test]
    fn test_adjust_applies_single_delta() {
        let start = fee(30_000, Some(25_000), FeeStatus::Pending);
        let update = FeeLedger::adjust(&start, 5_000, 8_000).unwrap();
        assert_eq!(update.new_balance, 22_000);

        let lowered = FeeLedger::adjust(&start, 5_000, 1_000).unwrap();
        assert_eq!(lowered.new_balance, 29_000);
    }

    #[test]
    fn test_discount_can_complete_fee() {
        let start = fee(30_000, Some(5_000), FeeStatus::Pending);
        let (final_fee, update) = FeeLedger::with_discount(&start, 5_000, 25_000).unwrap();
        assert_eq!(final_fee, 25_000);
        assert_eq!(update.new_balance, 0);
        assert!(update.completed);

        assert!(FeeLedger::with_discount(&start, 30_001, 0).is_err());
    }

    #[test]
    fn test_recompute_flags_negative_totals() {
        let start = fee(30_000, Some(30_000), FeeStatus::Pending);
        assert!(matches!(
            FeeLedger::recompute(&start, -1),
            Err(LedgerError::ConsistencyViolation(_))
        ));
    }
}
