//! Property-based tests for FeeLedger.
//!
//! These tests validate the balance invariant, reversal as an exact inverse,
//! and the at-most-once completion signal.

use proptest::prelude::*;
use uuid::Uuid;

use crate::fee::ledger::FeeLedger;
use crate::fee::types::{FeeSnapshot, FeeStatus};

/// Strategy for a live fee with a final fee and some amount already paid.
fn arb_live_fee() -> impl Strategy<Value = (FeeSnapshot, i64)> {
    (1i64..500_000, 0i64..=100).prop_map(|(final_fee, paid_pct)| {
        let paid = final_fee * paid_pct / 100;
        let balance = final_fee - paid;
        let snapshot = FeeSnapshot {
            id: Uuid::nil(),
            status: FeeStatus::for_balance(balance),
            total_course_fee: final_fee,
            discount_amount: 0,
            carry_over_amount: 0,
            final_fee,
            balance_amount: Some(balance),
            frozen: false,
        };
        (snapshot, paid)
    })
}

fn after(fee: &FeeSnapshot, balance: i64, status: FeeStatus) -> FeeSnapshot {
    FeeSnapshot {
        balance_amount: Some(balance),
        status,
        ..fee.clone()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // =========================================================================
    // Reversal restores balance and status exactly for any amount within
    // the outstanding balance.
    // =========================================================================
    #[test]
    fn prop_reverse_undoes_apply(
        (fee, _paid) in arb_live_fee(),
        pct in 1i64..=100,
    ) {
        prop_assume!(fee.outstanding() > 0);
        let amount = (fee.outstanding() * pct / 100).max(1);

        let applied = FeeLedger::apply_money(&fee, amount).unwrap();
        let mid = after(&fee, applied.new_balance, applied.new_status);
        let reversed = FeeLedger::reverse_money(&mid, amount).unwrap();

        prop_assert_eq!(reversed.new_balance, fee.outstanding());
        prop_assert_eq!(reversed.new_status, fee.status);
    }

    // =========================================================================
    // Balance never goes negative and PAID holds exactly at zero.
    // =========================================================================
    #[test]
    fn prop_apply_clamps_and_sets_status(
        (fee, _paid) in arb_live_fee(),
        amount in 1i64..1_000_000,
    ) {
        prop_assume!(fee.outstanding() > 0);
        let update = FeeLedger::apply_money(&fee, amount).unwrap();

        prop_assert!(update.new_balance >= 0);
        prop_assert_eq!(update.new_status == FeeStatus::Paid, update.new_balance == 0);
        prop_assert_eq!(update.completed, update.new_balance == 0);
    }

    // =========================================================================
    // Sequential postings agree with a rebuild from the payment total.
    // =========================================================================
    #[test]
    fn prop_sequential_postings_match_recompute(
        final_fee in 1i64..200_000,
        payments in prop::collection::vec(1i64..50_000, 1..8),
    ) {
        let mut fee = FeeSnapshot {
            id: Uuid::nil(),
            status: FeeStatus::Pending,
            total_course_fee: final_fee,
            discount_amount: 0,
            carry_over_amount: 0,
            final_fee,
            balance_amount: None,
            frozen: false,
        };
        let mut paid_total = 0;
        let mut completions = 0;

        for amount in payments {
            let Ok(update) = FeeLedger::apply_money(&fee, amount) else {
                prop_assert_eq!(fee.outstanding(), 0);
                continue;
            };
            paid_total += amount;
            if update.completed {
                completions += 1;
            }
            let rebuilt = FeeLedger::recompute(&fee, paid_total).unwrap();
            prop_assert_eq!(rebuilt.new_balance, update.new_balance);
            fee = after(&fee, update.new_balance, update.new_status);
        }

        prop_assert!(completions <= 1);
        prop_assert_eq!(completions == 1, fee.status == FeeStatus::Paid);
    }

    // =========================================================================
    // Editing an amount in place matches a rebuild with the new amount.
    // =========================================================================
    #[test]
    fn prop_adjust_matches_recompute_without_clamping(
        final_fee in 10_000i64..200_000,
        others in 0i64..5_000,
        old_amount in 1i64..5_000,
        new_amount in 1i64..5_000,
    ) {
        let paid_before = others + old_amount;
        let fee = FeeSnapshot {
            id: Uuid::nil(),
            status: FeeStatus::Pending,
            total_course_fee: final_fee,
            discount_amount: 0,
            carry_over_amount: 0,
            final_fee,
            balance_amount: Some(final_fee - paid_before),
            frozen: false,
        };

        let adjusted = FeeLedger::adjust(&fee, old_amount, new_amount).unwrap();
        let rebuilt = FeeLedger::recompute(&fee, others + new_amount).unwrap();
        prop_assert_eq!(adjusted, rebuilt);
    }
}
