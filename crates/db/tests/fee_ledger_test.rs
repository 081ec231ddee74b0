//! Fee ledger integration tests: balances, completion and reversal.

mod common;

use common::{Ledger, completions};
use sea_orm::{ActiveModelTrait, Set};
use tuition_core::LedgerError;
use tuition_core::fee::FeeStatus as CoreFeeStatus;
use tuition_db::entities::fees;
use tuition_db::entities::sea_orm_active_enums::FeeStatus;
use tuition_db::repositories::Admission;
use tuition_shared::types::FeeId;

// ============================================================================
// Admission
// ============================================================================

#[tokio::test]
async fn test_admission_creates_fee_from_course_base() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;

    assert_eq!(enrolled.fee.final_fee, 30_000);
    assert_eq!(enrolled.fee.balance_amount.unwrap_or(enrolled.fee.final_fee), 30_000);
    assert_eq!(enrolled.fee.status, FeeStatus::Pending);
    assert_eq!(enrolled.student.current_batch_id, Some(enrolled.batch.id));
    assert_eq!(enrolled.batch.current_count, 1);
}

#[tokio::test]
async fn test_admission_discounted_to_zero_completes() {
    let ledger = Ledger::new().await;
    let batch = ledger.batch(12_000, 5).await;
    let student = ledger.student("Ravi").await;

    let committed = ledger
        .enrollment
        .admit(
            &ledger.actor,
            Admission {
                student_id: student.id,
                batch_id: batch.id,
                discount_amount: 12_000,
                note: Some("scholarship".to_string()),
            },
        )
        .await
        .unwrap();

    let fee = &committed.value.fee;
    assert_eq!(fee.status, FeeStatus::Paid);
    assert_eq!(fee.balance_amount, Some(0));
    assert!(committed.completes_fee(FeeId::from_uuid(fee.id)));
}

#[tokio::test]
async fn test_second_admission_is_rejected() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;
    let other = ledger.batch(30_000, 5).await;

    let err = ledger
        .enrollment
        .admit(
            &ledger.actor,
            Admission {
                student_id: enrolled.student.id,
                batch_id: other.id,
                discount_amount: 0,
                note: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));
    assert_eq!(ledger.directory.batch(other.id).await.unwrap().current_count, 0);
}

// ============================================================================
// Scenario A: two cash payments complete the fee exactly once
// ============================================================================

#[tokio::test]
async fn test_cash_payments_complete_fee_once() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;
    let fee_id = enrolled.fee.id;

    let first = ledger.cash_from(enrolled.student.id, 10_000).await;
    let fee = ledger.fee(fee_id).await;
    assert_eq!(fee.balance_amount, Some(20_000));
    assert_eq!(fee.status, FeeStatus::Pending);
    assert_eq!(completions(&first), 0);

    let second = ledger.cash_from(enrolled.student.id, 20_000).await;
    let fee = ledger.fee(fee_id).await;
    assert_eq!(fee.balance_amount, Some(0));
    assert_eq!(fee.status, FeeStatus::Paid);
    assert_eq!(completions(&second), 1);
    assert!(second.completes_fee(FeeId::from_uuid(fee_id)));

    ledger.assert_balance_invariant(fee_id).await;
}

#[tokio::test]
async fn test_payment_on_paid_fee_is_rejected() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 5_000).await;
    let _ = ledger.cash_from(enrolled.student.id, 5_000).await;

    let err = ledger
        .cash
        .create(&ledger.actor, common::student_cash(enrolled.student.id, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::FeeAlreadyPaid(id) if id == enrolled.fee.id));
}

#[tokio::test]
async fn test_overpayment_clamps_balance_at_zero() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 5_000).await;

    let committed = ledger.cash_from(enrolled.student.id, 8_000).await;
    let fee = committed.value.fee.unwrap();
    assert_eq!(fee.balance_amount, Some(0));
    assert_eq!(fee.status, FeeStatus::Paid);
}

// ============================================================================
// Reversal is the inverse of applying money
// ============================================================================

#[tokio::test]
async fn test_deleting_payment_restores_balance_and_status() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;
    let before = ledger.fee(enrolled.fee.id).await;

    let posted = ledger.cash_from(enrolled.student.id, 30_000).await;
    assert_eq!(ledger.fee(enrolled.fee.id).await.status, FeeStatus::Paid);

    let _ = ledger
        .cash
        .delete(&ledger.actor, posted.value.entry.id)
        .await
        .unwrap();

    let after = ledger.fee(enrolled.fee.id).await;
    assert_eq!(after.balance_amount, Some(30_000));
    assert_eq!(after.status, before.status);
    assert!(ledger.paid_payments(enrolled.fee.id).await.is_empty());
}

// ============================================================================
// Discount and recompute
// ============================================================================

#[tokio::test]
async fn test_discount_that_clears_balance_completes_fee() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;
    let _ = ledger.cash_from(enrolled.student.id, 25_000).await;

    let committed = ledger
        .fees
        .apply_discount(&ledger.actor, enrolled.fee.id, 5_000)
        .await
        .unwrap();

    assert_eq!(committed.value.fee.final_fee, 25_000);
    assert_eq!(committed.value.update.new_balance, 0);
    assert_eq!(committed.value.update.new_status, CoreFeeStatus::Paid);
    assert!(committed.completes_fee(FeeId::from_uuid(enrolled.fee.id)));
}

#[tokio::test]
async fn test_discount_above_course_fee_is_rejected() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;

    let err = ledger
        .fees
        .apply_discount(&ledger.actor, enrolled.fee.id, 30_001)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[tokio::test]
async fn test_recompute_heals_corrupted_balance() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;
    let _ = ledger.cash_from(enrolled.student.id, 10_000).await;

    let mut corrupt: fees::ActiveModel = ledger.fee(enrolled.fee.id).await.into();
    corrupt.balance_amount = Set(Some(1));
    corrupt.update(&ledger.db).await.unwrap();

    let committed = ledger
        .fees
        .recompute(&ledger.actor, enrolled.fee.id)
        .await
        .unwrap();
    assert_eq!(committed.value.fee.balance_amount, Some(20_000));
    ledger.assert_balance_invariant(enrolled.fee.id).await;
}

// ============================================================================
// Withdrawal
// ============================================================================

#[tokio::test]
async fn test_withdrawal_frees_seat_and_closes_fee() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;

    let committed = ledger
        .enrollment
        .withdraw(&ledger.actor, enrolled.student.id)
        .await
        .unwrap();
    assert_eq!(committed.value.student.current_batch_id, None);
    assert_eq!(committed.value.fee.unwrap().status, FeeStatus::Inactive);
    assert_eq!(
        ledger.directory.batch(enrolled.batch.id).await.unwrap().current_count,
        0
    );

    let err = ledger
        .cash
        .create(&ledger.actor, common::student_cash(enrolled.student.id, 100))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NoFeeRecord { .. }));
}

#[tokio::test]
async fn test_withdrawn_fee_rejects_journal_changes() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;
    let posted = ledger.cash_from(enrolled.student.id, 5_000).await;
    let entry = posted.value.entry;

    let _ = ledger
        .enrollment
        .withdraw(&ledger.actor, enrolled.student.id)
        .await
        .unwrap();
    let closed = ledger.fee(enrolled.fee.id).await;

    let err = ledger
        .cash
        .edit(
            &ledger.actor,
            entry.id,
            common::student_cash(enrolled.student.id, 6_000),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::TerminalFee { status: CoreFeeStatus::Inactive, .. }
    ));

    let err = ledger.cash.delete(&ledger.actor, entry.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::TerminalFee { .. }));

    assert_eq!(ledger.fee(enrolled.fee.id).await, closed);
    assert_eq!(closed.balance_amount, Some(25_000));
    assert_eq!(ledger.cash.find(entry.id).await.unwrap(), entry);
    assert_eq!(ledger.paid_payments(closed.id).await.len(), 1);
}

#[tokio::test]
async fn test_audit_events_are_recorded_through_trail() {
    use tuition_core::effects::{AuditTrail, LedgerEffect};
    use tuition_shared::types::PageRequest;

    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;
    let committed = ledger.cash_from(enrolled.student.id, 1_000).await;

    for effect in &committed.effects {
        if let LedgerEffect::Audit(event) = effect {
            ledger.logs.record(event).await.unwrap();
        }
    }

    let page = ledger
        .logs
        .list_for_student(enrolled.student.id, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].event_type, "CASH_ENTRY_ADDED");
}
