//! Batch switch planning.
//!
//! The planner decides every row change of a switch up front. The repository
//! then writes the plan inside one transaction, so a switch either lands
//! completely or not at all.

use serde::Serialize;
use tuition_shared::types::TransferId;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::fee::{FeeSnapshot, FeeStatus, FeeTerms};
use crate::occupancy::SeatCount;
use crate::switch::policy::SwitchPolicy;

/// What happens to the fee the student is leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OldFeeDisposition {
    /// Left untouched and still owed.
    Keep,
    /// Marked CANCELLED.
    Cancel,
    /// Frozen as a historical record with the given status.
    Freeze(FeeStatus),
}

/// Facts a plan is computed from.
#[derive(Debug, Clone)]
pub struct SwitchContext {
    /// Chosen policy.
    pub policy: SwitchPolicy,
    /// The active fee at the source batch.
    pub old_fee: FeeSnapshot,
    /// Sum of PAID payments linked to the old fee.
    pub paid_on_old: i64,
    /// Base fee of the destination batch's course.
    pub destination_base_fee: i64,
}

/// Every fee-side change of one switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchPlan {
    /// Chosen policy.
    pub policy: SwitchPolicy,
    /// Correlates both fee rows and the history row.
    pub transfer_id: TransferId,
    /// Terms of the fee to create, if any.
    pub new_fee: Option<FeeTerms>,
    /// Fate of the old fee.
    pub old_fee: OldFeeDisposition,
    /// Move PAID payments of the old fee to the new one.
    pub relink_paid_payments: bool,
    /// Copy the old fee's advance onto the new one.
    pub carry_advance: bool,
    /// Delete unpaid dues scheduled against the old fee.
    pub purge_old_dues: bool,
}

impl SwitchPlan {
    /// The fee the history row points to after the switch.
    #[must_use]
    pub fn fee_id_to(&self, old_fee_id: Uuid, new_fee_id: Option<Uuid>) -> Uuid {
        match (self.new_fee, new_fee_id) {
            (Some(_), Some(id)) => id,
            _ => old_fee_id,
        }
    }
}

/// Stateless batch switch planner.
pub struct SwitchPlanner;

impl SwitchPlanner {
    /// Validates the request against current state, before anything is written.
    ///
    /// # Errors
    ///
    /// - `Validation` when source and target are the same batch
    /// - `BatchMismatch` when the student is not in `from_batch_id`
    /// - `TargetNotFound` when the target batch is missing
    /// - `BatchFull` when the target has no free seat
    pub fn check_preconditions(
        student_id: Uuid,
        current_batch_id: Option<Uuid>,
        from_batch_id: Uuid,
        to_batch_id: Uuid,
        target: Option<SeatCount>,
    ) -> Result<SeatCount, LedgerError> {
        if from_batch_id == to_batch_id {
            return Err(LedgerError::Validation(
                "source and target batch are the same".to_string(),
            ));
        }
        if current_batch_id != Some(from_batch_id) {
            return Err(LedgerError::BatchMismatch {
                student_id,
                expected: from_batch_id,
                actual: current_batch_id,
            });
        }
        let target = target.ok_or(LedgerError::TargetNotFound(to_batch_id))?;
        if !target.has_free_seat() {
            return Err(LedgerError::BatchFull {
                batch_id: target.batch_id,
                slot_limit: target.slot_limit,
            });
        }
        Ok(target)
    }

    /// Computes the fee-side plan for a switch.
    ///
    /// # Errors
    ///
    /// - `TerminalFee` / `FeeFrozen` if the old fee is not live
    /// - `Validation` for a negative destination price
    /// - `ConsistencyViolation` for a negative paid total
    pub fn plan(ctx: &SwitchContext, transfer_id: TransferId) -> Result<SwitchPlan, LedgerError> {
        ctx.old_fee.ensure_mutable()?;
        if ctx.destination_base_fee < 0 {
            return Err(LedgerError::Validation(format!(
                "destination base fee {} is negative",
                ctx.destination_base_fee
            )));
        }
        if ctx.paid_on_old < 0 {
            return Err(LedgerError::ConsistencyViolation(format!(
                "fee {} has negative paid total {}",
                ctx.old_fee.id, ctx.paid_on_old
            )));
        }

        let plan = match ctx.policy {
            SwitchPolicy::Transfer => SwitchPlan {
                policy: ctx.policy,
                transfer_id,
                new_fee: None,
                old_fee: OldFeeDisposition::Keep,
                relink_paid_payments: false,
                carry_advance: false,
                purge_old_dues: false,
            },
            SwitchPolicy::NewFee => SwitchPlan {
                policy: ctx.policy,
                transfer_id,
                new_fee: Some(FeeTerms::replacement(
                    ctx.destination_base_fee,
                    ctx.paid_on_old,
                )),
                old_fee: OldFeeDisposition::Cancel,
                relink_paid_payments: true,
                carry_advance: true,
                purge_old_dues: true,
            },
            SwitchPolicy::Split => {
                let frozen_status = if ctx.old_fee.outstanding() == 0 {
                    FeeStatus::Paid
                } else {
                    FeeStatus::Inactive
                };
                SwitchPlan {
                    policy: ctx.policy,
                    transfer_id,
                    new_fee: Some(FeeTerms::split(ctx.destination_base_fee, ctx.paid_on_old)),
                    old_fee: OldFeeDisposition::Freeze(frozen_status),
                    relink_paid_payments: false,
                    carry_advance: false,
                    purge_old_dues: true,
                }
            }
        };
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn old_fee(final_fee: i64, balance: i64) -> FeeSnapshot {
        FeeSnapshot {
            id: Uuid::from_u128(1),
            status: FeeStatus::for_balance(balance),
            total_course_fee: final_fee,
            discount_amount: 0,
            carry_over_amount: 0,
            final_fee,
            balance_amount: Some(balance),
            frozen: false,
        }
    }

    fn ctx(policy: SwitchPolicy, destination_base_fee: i64) -> SwitchContext {
        SwitchContext {
            policy,
            old_fee: old_fee(30_000, 20_000),
            paid_on_old: 10_000,
            destination_base_fee,
        }
    }

    #[test]
    fn test_transfer_keeps_fee() {
        let plan = SwitchPlanner::plan(&ctx(SwitchPolicy::Transfer, 40_000), TransferId::new())
            .unwrap();
        assert_eq!(plan.new_fee, None);
        assert_eq!(plan.old_fee, OldFeeDisposition::Keep);
        let old = Uuid::from_u128(1);
        assert_eq!(plan.fee_id_to(old, None), old);
    }

    #[test]
    fn test_new_fee_prices_destination_and_relinks() {
        let plan =
            SwitchPlanner::plan(&ctx(SwitchPolicy::NewFee, 40_000), TransferId::new()).unwrap();
        let terms = plan.new_fee.unwrap();
        assert_eq!(terms.final_fee, 40_000);
        assert_eq!(terms.balance_amount, 30_000);
        assert_eq!(plan.old_fee, OldFeeDisposition::Cancel);
        assert!(plan.relink_paid_payments);
    }

    #[test]
    fn test_split_freezes_old_fee() {
        let plan =
            SwitchPlanner::plan(&ctx(SwitchPolicy::Split, 40_000), TransferId::new()).unwrap();
        assert_eq!(plan.new_fee.unwrap().balance_amount, 30_000);
        assert_eq!(plan.old_fee, OldFeeDisposition::Freeze(FeeStatus::Inactive));
        assert!(!plan.relink_paid_payments);

        let settled = SwitchContext {
            old_fee: old_fee(30_000, 0),
            paid_on_old: 30_000,
            ..ctx(SwitchPolicy::Split, 20_000)
        };
        let plan = SwitchPlanner::plan(&settled, TransferId::new()).unwrap();
        assert_eq!(plan.old_fee, OldFeeDisposition::Freeze(FeeStatus::Paid));
        assert_eq!(plan.new_fee.unwrap().status, FeeStatus::Paid);
    }

    #[test]
    fn test_preconditions() {
        let student = Uuid::from_u128(5);
        let a = Uuid::from_u128(10);
        let b = Uuid::from_u128(11);
        let open = SeatCount {
            batch_id: b,
            slot_limit: 2,
            current_count: 1,
        };

        assert!(SwitchPlanner::check_preconditions(student, Some(a), a, b, Some(open)).is_ok());
        assert!(matches!(
            SwitchPlanner::check_preconditions(student, Some(b), a, b, Some(open)),
            Err(LedgerError::BatchMismatch { .. })
        ));
        assert!(matches!(
            SwitchPlanner::check_preconditions(student, Some(a), a, b, None),
            Err(LedgerError::TargetNotFound(_))
        ));
        let full = SeatCount {
            current_count: 2,
            ..open
        };
        assert!(matches!(
            SwitchPlanner::check_preconditions(student, Some(a), a, b, Some(full)),
            Err(LedgerError::BatchFull { .. })
        ));
        assert!(matches!(
            SwitchPlanner::check_preconditions(student, Some(a), a, a, Some(open)),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_terminal_old_fee_rejected() {
        let mut context = ctx(SwitchPolicy::NewFee, 40_000);
        context.old_fee.status = FeeStatus::Cancelled;
        assert!(matches!(
            SwitchPlanner::plan(&context, TransferId::new()),
            Err(LedgerError::TerminalFee { .. })
        ));
    }
}
