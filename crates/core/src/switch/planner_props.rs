//! Property-based tests for SwitchPlanner.
//!
//! The new fee's opening balance must agree with a rebuild from the payments
//! it will own after the switch.

use proptest::prelude::*;
use tuition_shared::types::TransferId;
use uuid::Uuid;

use crate::fee::{FeeLedger, FeeSnapshot, FeeStatus};
use crate::switch::planner::{OldFeeDisposition, SwitchContext, SwitchPlanner};
use crate::switch::policy::SwitchPolicy;

fn arb_policy() -> impl Strategy<Value = SwitchPolicy> {
    prop_oneof![
        Just(SwitchPolicy::Transfer),
        Just(SwitchPolicy::NewFee),
        Just(SwitchPolicy::Split),
    ]
}

fn arb_context() -> impl Strategy<Value = SwitchContext> {
    (arb_policy(), 1i64..200_000, 0i64..=100, 0i64..300_000).prop_map(
        |(policy, old_final, paid_pct, destination_base_fee)| {
            let paid_on_old = old_final * paid_pct / 100;
            let balance = old_final - paid_on_old;
            SwitchContext {
                policy,
                old_fee: FeeSnapshot {
                    id: Uuid::nil(),
                    status: FeeStatus::for_balance(balance),
                    total_course_fee: old_final,
                    discount_amount: 0,
                    carry_over_amount: 0,
                    final_fee: old_final,
                    balance_amount: Some(balance),
                    frozen: false,
                },
                paid_on_old,
                destination_base_fee,
            }
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_new_fee_balance_matches_owned_payments(ctx in arb_context()) {
        let plan = SwitchPlanner::plan(&ctx, TransferId::new()).unwrap();

        let Some(terms) = plan.new_fee else {
            prop_assert_eq!(ctx.policy, SwitchPolicy::Transfer);
            prop_assert_eq!(plan.old_fee, OldFeeDisposition::Keep);
            return Ok(());
        };

        let expected = (ctx.destination_base_fee - ctx.paid_on_old).max(0);
        prop_assert_eq!(terms.balance_amount, expected);
        prop_assert_eq!(
            terms.final_fee,
            terms.total_course_fee - terms.discount_amount - terms.carry_over_amount
        );

        let owned = if plan.relink_paid_payments { ctx.paid_on_old } else { 0 };
        let snapshot = FeeSnapshot {
            id: Uuid::nil(),
            status: terms.status,
            total_course_fee: terms.total_course_fee,
            discount_amount: terms.discount_amount,
            carry_over_amount: terms.carry_over_amount,
            final_fee: terms.final_fee,
            balance_amount: Some(terms.balance_amount),
            frozen: false,
        };
        let rebuilt = FeeLedger::recompute(&snapshot, owned).unwrap();
        prop_assert_eq!(rebuilt.new_balance, terms.balance_amount);
        prop_assert_eq!(rebuilt.new_status, terms.status);
    }

    #[test]
    fn prop_split_freezes_by_old_balance(ctx in arb_context()) {
        prop_assume!(ctx.policy == SwitchPolicy::Split);
        let plan = SwitchPlanner::plan(&ctx, TransferId::new()).unwrap();
        let expected = if ctx.old_fee.outstanding() == 0 {
            FeeStatus::Paid
        } else {
            FeeStatus::Inactive
        };
        prop_assert_eq!(plan.old_fee, OldFeeDisposition::Freeze(expected));
    }
}
