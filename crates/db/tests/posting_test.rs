//! Posting source integration tests: cash journal, director ledger and the
//! direct payment recorder.

mod common;

use common::{Ledger, bookings, student_cash, today};
use sea_orm::EntityTrait;
use tuition_core::LedgerError;
use tuition_core::posting::{
    BankCategory, CashTransactionType, DirectorTransactionType, PaymentMode,
};
use tuition_db::entities::sea_orm_active_enums::{
    DirectorTransactionType as DirectorType, FeeStatus, PaymentStatus,
};
use tuition_db::entities::{bank_transactions, director_ledger_entries, payments};
use tuition_db::repositories::{
    BatchSwitchRequest, CashEntryInput, CreateBankAccount, DirectorEntryInput, DueInput,
    DueSettlement, ManualBankTransaction, PaymentInput,
};
use tuition_shared::types::PageRequest;
use uuid::Uuid;

fn owner_taken(director_id: Uuid, amount: i64) -> CashEntryInput {
    CashEntryInput {
        transaction_date: today(),
        amount,
        transaction_type: CashTransactionType::OwnerTaken,
        description: Some("drawer withdrawal".to_string()),
        reference_id: None,
        student_id: None,
        director_id: Some(director_id),
    }
}

fn disbursement(director_id: Uuid, account_id: Uuid, amount: i64) -> DirectorEntryInput {
    DirectorEntryInput {
        director_id,
        transaction_date: today(),
        amount,
        transaction_type: DirectorTransactionType::InstitutionGaveBank,
        description: None,
        reference_id: None,
        student_id: None,
        bank_account_id: Some(account_id),
    }
}

fn direct(student_id: Uuid, amount: i64, bank_account_id: Option<Uuid>) -> PaymentInput {
    PaymentInput {
        student_id,
        amount,
        mode: PaymentMode::BankTransfer,
        bank_account_id,
        transaction_date: today(),
        transaction_ref: Some("NEFT-001".to_string()),
        note: None,
        is_advance: false,
    }
}

async fn open_account(ledger: &Ledger, opening_balance: i64) -> Uuid {
    ledger
        .bank
        .create_account(CreateBankAccount {
            name: "Current account".to_string(),
            bank_name: Some("State Bank".to_string()),
            account_number: None,
            opening_balance,
        })
        .await
        .unwrap()
        .value
        .id
}

async fn account_balance(ledger: &Ledger, account_id: Uuid) -> i64 {
    ledger
        .bank
        .list_accounts()
        .await
        .unwrap()
        .into_iter()
        .find(|a| a.id == account_id)
        .map(|a| a.balance)
        .unwrap()
}

async fn all_payments(ledger: &Ledger) -> Vec<payments::Model> {
    payments::Entity::find().all(&ledger.db).await.unwrap()
}

// ============================================================================
// Cash journal
// ============================================================================

#[tokio::test]
async fn test_cash_edit_same_student_adjusts_in_place() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;
    let posted = ledger.cash_from(enrolled.student.id, 5_000).await;
    let payment_id = posted.value.payment.unwrap().id;

    let edited = ledger
        .cash
        .edit(
            &ledger.actor,
            posted.value.entry.id,
            student_cash(enrolled.student.id, 8_000),
        )
        .await
        .unwrap();

    assert_eq!(edited.value.payment.unwrap().id, payment_id);
    assert_eq!(ledger.fee(enrolled.fee.id).await.balance_amount, Some(22_000));
    ledger.assert_balance_invariant(enrolled.fee.id).await;
}

#[tokio::test]
async fn test_cash_edit_to_other_student_moves_payment() {
    let ledger = Ledger::new().await;
    let x = ledger.enrolled("Xavier", 30_000).await;
    let y = ledger.enrolled("Yamini", 30_000).await;
    let posted = ledger.cash_from(x.student.id, 5_000).await;

    ledger
        .cash
        .edit(
            &ledger.actor,
            posted.value.entry.id,
            student_cash(y.student.id, 5_000),
        )
        .await
        .unwrap();

    assert_eq!(ledger.fee(x.fee.id).await.balance_amount, Some(30_000));
    assert_eq!(ledger.fee(y.fee.id).await.balance_amount, Some(25_000));
    assert!(ledger.paid_payments(x.fee.id).await.is_empty());

    let moved = ledger.paid_payments(y.fee.id).await;
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].student_id, y.student.id);
    assert_eq!(moved[0].cash_entry_id, Some(posted.value.entry.id));
    assert_eq!(all_payments(&ledger).await.len(), 1);
}

#[tokio::test]
async fn test_cash_edit_description_on_paid_fee_succeeds() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 4_000).await;
    let posted = ledger.cash_from(enrolled.student.id, 4_000).await;

    let mut input = student_cash(enrolled.student.id, 4_000);
    input.description = Some("receipt 42".to_string());
    let edited = ledger
        .cash
        .edit(&ledger.actor, posted.value.entry.id, input)
        .await
        .unwrap();

    assert_eq!(edited.value.entry.description.as_deref(), Some("receipt 42"));
    assert_eq!(ledger.fee(enrolled.fee.id).await.status, FeeStatus::Paid);
}

#[tokio::test]
async fn test_cash_entry_link_rules() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;

    let mut expense = student_cash(enrolled.student.id, 500);
    expense.transaction_type = CashTransactionType::OfficeExpense;
    let err = ledger.cash.create(&ledger.actor, expense).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = ledger
        .cash
        .create(&ledger.actor, student_cash(Uuid::now_v7(), 500))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[tokio::test]
async fn test_cash_list_totals() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;
    let _ = ledger.cash_from(enrolled.student.id, 5_000).await;

    let expense = CashEntryInput {
        transaction_type: CashTransactionType::OfficeExpense,
        student_id: None,
        ..student_cash(enrolled.student.id, 1_200)
    };
    let _ = ledger.cash.create(&ledger.actor, expense).await.unwrap();

    let page = ledger
        .cash
        .list(ledger.location_id(), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.page.data.len(), 2);
    assert_eq!(page.totals.total_credit, 5_000);
    assert_eq!(page.totals.total_debit, 1_200);
    assert_eq!(page.totals.net, 3_800);
}

// ============================================================================
// Cash entry mirrors in the director ledger
// ============================================================================

#[tokio::test]
async fn test_owner_taken_mirror_follows_cash_entry() {
    let ledger = Ledger::new().await;
    let director = ledger.directory.create_director("Meera", None).await.unwrap();

    let posted = ledger
        .cash
        .create(&ledger.actor, owner_taken(director.id, 2_000))
        .await
        .unwrap();
    let mirror = posted.value.mirror.unwrap();
    assert_eq!(mirror.source_cash_entry_id, Some(posted.value.entry.id));
    assert_eq!(mirror.transaction_type, DirectorType::OwnerTaken);
    assert_eq!(mirror.amount, 2_000);

    let edited = ledger
        .cash
        .edit(&ledger.actor, posted.value.entry.id, owner_taken(director.id, 2_500))
        .await
        .unwrap();
    let synced = edited.value.mirror.unwrap();
    assert_eq!(synced.id, mirror.id);
    assert_eq!(synced.amount, 2_500);

    let err = ledger
        .directors
        .delete(&ledger.actor, mirror.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));

    let _ = ledger
        .cash
        .delete(&ledger.actor, posted.value.entry.id)
        .await
        .unwrap();
    assert!(
        director_ledger_entries::Entity::find_by_id(mirror.id)
            .one(&ledger.db)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_retyped_cash_entry_drops_mirror() {
    let ledger = Ledger::new().await;
    let director = ledger.directory.create_director("Meera", None).await.unwrap();
    let posted = ledger
        .cash
        .create(&ledger.actor, owner_taken(director.id, 2_000))
        .await
        .unwrap();

    let retyped = CashEntryInput {
        transaction_type: CashTransactionType::OfficeExpense,
        director_id: None,
        ..owner_taken(director.id, 2_000)
    };
    let edited = ledger
        .cash
        .edit(&ledger.actor, posted.value.entry.id, retyped)
        .await
        .unwrap();
    assert!(edited.value.mirror.is_none());

    let ledger_page = ledger
        .directors
        .list(director.id, &PageRequest::default())
        .await
        .unwrap();
    assert!(ledger_page.page.data.is_empty());
}

// ============================================================================
// Director ledger
// ============================================================================

#[tokio::test]
async fn test_director_student_payment_posts_to_fee() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;
    let director = ledger.directory.create_director("Meera", None).await.unwrap();

    let posted = ledger
        .directors
        .create(
            &ledger.actor,
            DirectorEntryInput {
                director_id: director.id,
                transaction_date: today(),
                amount: 6_000,
                transaction_type: DirectorTransactionType::StudentPaid,
                description: None,
                reference_id: None,
                student_id: Some(enrolled.student.id),
                bank_account_id: None,
            },
        )
        .await
        .unwrap();

    let payment = posted.value.payment.unwrap();
    assert_eq!(payment.director_ledger_entry_id, Some(posted.value.entry.id));
    assert_eq!(payment.cash_entry_id, None);
    assert_eq!(ledger.fee(enrolled.fee.id).await.balance_amount, Some(24_000));

    let _ = ledger
        .directors
        .delete(&ledger.actor, posted.value.entry.id)
        .await
        .unwrap();
    assert_eq!(ledger.fee(enrolled.fee.id).await.balance_amount, Some(30_000));
}

#[tokio::test]
async fn test_director_change_completes_fee_once() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;
    let meera = ledger.directory.create_director("Meera", None).await.unwrap();
    let kiran = ledger.directory.create_director("Kiran", None).await.unwrap();
    let paid_via = |director_id, amount| DirectorEntryInput {
        director_id,
        transaction_date: today(),
        amount,
        transaction_type: DirectorTransactionType::StudentPaid,
        description: None,
        reference_id: None,
        student_id: Some(enrolled.student.id),
        bank_account_id: None,
    };

    let posted = ledger
        .directors
        .create(&ledger.actor, paid_via(meera.id, 10_000))
        .await
        .unwrap();
    let edited = ledger
        .directors
        .edit(&ledger.actor, posted.value.entry.id, paid_via(kiran.id, 30_000))
        .await
        .unwrap();

    assert_eq!(common::completions(&edited), 1);
    let fee = ledger.fee(enrolled.fee.id).await;
    assert_eq!(fee.status, FeeStatus::Paid);
    assert_eq!(fee.balance_amount, Some(0));
    assert_eq!(edited.value.entry.director_id, kiran.id);
}

#[tokio::test]
async fn test_disbursement_moves_bank_balance() {
    let ledger = Ledger::new().await;
    let director = ledger.directory.create_director("Meera", None).await.unwrap();
    let account = open_account(&ledger, 10_000).await;

    let posted = ledger
        .directors
        .create(&ledger.actor, disbursement(director.id, account, 4_000))
        .await
        .unwrap();
    assert!(posted.value.entry.bank_transaction_id.is_some());
    assert_eq!(account_balance(&ledger, account).await, 6_000);

    ledger
        .directors
        .edit(
            &ledger.actor,
            posted.value.entry.id,
            disbursement(director.id, account, 5_000),
        )
        .await
        .unwrap();
    assert_eq!(account_balance(&ledger, account).await, 5_000);

    let _ = ledger
        .directors
        .delete(&ledger.actor, posted.value.entry.id)
        .await
        .unwrap();
    assert_eq!(account_balance(&ledger, account).await, 10_000);
    assert!(bank_transactions::Entity::find().all(&ledger.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_uncovered_disbursement_writes_nothing() {
    let ledger = Ledger::new().await;
    let director = ledger.directory.create_director("Meera", None).await.unwrap();
    let account = open_account(&ledger, 3_000).await;

    let err = ledger
        .directors
        .create(&ledger.actor, disbursement(director.id, account, 7_000))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBankBalance { .. }));

    assert_eq!(account_balance(&ledger, account).await, 3_000);
    let page = ledger
        .directors
        .list(director.id, &PageRequest::default())
        .await
        .unwrap();
    assert!(page.page.data.is_empty());
}

// ============================================================================
// Direct payments and the bank matrix
// ============================================================================

#[tokio::test]
async fn test_payment_on_split_fee_keeps_bank_side() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;
    let account = open_account(&ledger, 0).await;
    let student_id = enrolled.student.id;
    let payment = ledger
        .payments
        .record(&ledger.actor, direct(student_id, 10_000, None))
        .await
        .unwrap()
        .value
        .payment;

    let b2 = ledger.batch(40_000, 10).await;
    let _ = ledger
        .switches
        .switch(
            &ledger.actor,
            BatchSwitchRequest {
                student_id,
                from_batch_id: enrolled.batch.id,
                to_batch_id: b2.id,
                policy: "SPLIT".to_string(),
                reason: None,
            },
        )
        .await
        .unwrap();

    // Same student and amount; only the bank routing would change.
    let err = ledger
        .payments
        .edit(&ledger.actor, payment.id, direct(student_id, 10_000, Some(account)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::FeeFrozen(id) if id == enrolled.fee.id));
    let err = ledger
        .payments
        .delete(&ledger.actor, payment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::FeeFrozen(_)));

    assert_eq!(account_balance(&ledger, account).await, 0);
    assert!(
        bank_transactions::Entity::find()
            .all(&ledger.db)
            .await
            .unwrap()
            .is_empty()
    );
    let unchanged = payments::Entity::find_by_id(payment.id)
        .one(&ledger.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged, payment);
}

#[tokio::test]
async fn test_payment_bank_matrix() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;
    let account = open_account(&ledger, 0).await;
    let student_id = enrolled.student.id;

    // none -> bank on record
    let recorded = ledger
        .payments
        .record(&ledger.actor, direct(student_id, 3_000, Some(account)))
        .await
        .unwrap();
    let payment_id = recorded.value.payment.id;
    let first_tx = recorded.value.payment.bank_transaction_id.unwrap();
    assert_eq!(account_balance(&ledger, account).await, 3_000);

    // bank -> bank keeps the transaction and moves by the delta
    let edited = ledger
        .payments
        .edit(&ledger.actor, payment_id, direct(student_id, 4_000, Some(account)))
        .await
        .unwrap();
    assert_eq!(edited.value.payment.bank_transaction_id, Some(first_tx));
    assert_eq!(account_balance(&ledger, account).await, 4_000);
    assert_eq!(ledger.fee(enrolled.fee.id).await.balance_amount, Some(26_000));

    // bank -> none
    let edited = ledger
        .payments
        .edit(&ledger.actor, payment_id, direct(student_id, 4_000, None))
        .await
        .unwrap();
    assert_eq!(edited.value.payment.bank_transaction_id, None);
    assert_eq!(account_balance(&ledger, account).await, 0);
    assert!(bank_transactions::Entity::find_by_id(first_tx).one(&ledger.db).await.unwrap().is_none());

    // none -> bank
    let edited = ledger
        .payments
        .edit(&ledger.actor, payment_id, direct(student_id, 4_000, Some(account)))
        .await
        .unwrap();
    assert!(edited.value.payment.bank_transaction_id.is_some());
    assert_eq!(account_balance(&ledger, account).await, 4_000);

    let _ = ledger.payments.delete(&ledger.actor, payment_id).await.unwrap();
    assert_eq!(account_balance(&ledger, account).await, 0);
    assert_eq!(ledger.fee(enrolled.fee.id).await.balance_amount, Some(30_000));
}

#[tokio::test]
async fn test_recorder_rejects_journal_payments() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;
    let posted = ledger.cash_from(enrolled.student.id, 1_000).await;
    let payment_id = posted.value.payment.unwrap().id;

    let err = ledger
        .payments
        .delete(&ledger.actor, payment_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));

    let err = ledger
        .payments
        .edit(
            &ledger.actor,
            payment_id,
            direct(enrolled.student.id, 2_000, None),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));
}

#[tokio::test]
async fn test_payment_moved_to_other_student() {
    let ledger = Ledger::new().await;
    let x = ledger.enrolled("Xavier", 30_000).await;
    let y = ledger.enrolled("Yamini", 20_000).await;
    let recorded = ledger
        .payments
        .record(&ledger.actor, direct(x.student.id, 5_000, None))
        .await
        .unwrap();

    let moved = ledger
        .payments
        .edit(
            &ledger.actor,
            recorded.value.payment.id,
            direct(y.student.id, 5_000, None),
        )
        .await
        .unwrap();

    assert_eq!(moved.value.payment.fee_id, y.fee.id);
    assert_eq!(ledger.fee(x.fee.id).await.balance_amount, Some(30_000));
    assert_eq!(ledger.fee(y.fee.id).await.balance_amount, Some(15_000));
}

#[tokio::test]
async fn test_first_advance_sends_booking_once() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;

    let mut advance = direct(enrolled.student.id, 2_000, None);
    advance.is_advance = true;
    let first = ledger.payments.record(&ledger.actor, advance.clone()).await.unwrap();
    assert_eq!(bookings(&first), 1);
    assert_eq!(first.value.fee.advance_amount, Some(2_000));

    let second = ledger.payments.record(&ledger.actor, advance).await.unwrap();
    assert_eq!(bookings(&second), 0);
    assert_eq!(second.value.fee.advance_amount, Some(4_000));
    assert_eq!(second.value.fee.balance_amount, Some(26_000));
}

// ============================================================================
// Scheduled dues
// ============================================================================

#[tokio::test]
async fn test_due_lifecycle() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 30_000).await;

    let due = ledger
        .payments
        .create_due(
            &ledger.actor,
            DueInput {
                student_id: enrolled.student.id,
                amount: 10_000,
                due_date: today(),
                note: Some("second installment".to_string()),
            },
        )
        .await
        .unwrap()
        .value;
    assert_eq!(due.status, PaymentStatus::Pending);
    assert_eq!(ledger.fee(enrolled.fee.id).await.balance_amount, Some(30_000));

    let reminders = ledger.payments.dues_on(today()).await.unwrap();
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].1.id, enrolled.student.id);

    let settled = ledger
        .payments
        .settle_due(
            &ledger.actor,
            due.id,
            DueSettlement {
                mode: PaymentMode::Upi,
                bank_account_id: None,
                transaction_date: today(),
                transaction_ref: Some("UPI-77".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(settled.value.payment.id, due.id);
    assert_eq!(settled.value.payment.status, PaymentStatus::Paid);
    assert!(settled.value.payment.paid_at.is_some());
    assert_eq!(settled.value.fee.balance_amount, Some(20_000));
    assert!(ledger.payments.dues_on(today()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dues_purged_when_fee_completes() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 10_000).await;
    let due = ledger
        .payments
        .create_due(
            &ledger.actor,
            DueInput {
                student_id: enrolled.student.id,
                amount: 5_000,
                due_date: today(),
                note: None,
            },
        )
        .await
        .unwrap()
        .value;

    let _ = ledger.cash_from(enrolled.student.id, 10_000).await;

    assert!(payments::Entity::find_by_id(due.id).one(&ledger.db).await.unwrap().is_none());
}

#[tokio::test]
async fn test_paid_payment_is_not_a_due() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 10_000).await;
    let recorded = ledger
        .payments
        .record(&ledger.actor, direct(enrolled.student.id, 1_000, None))
        .await
        .unwrap();

    let err = ledger
        .payments
        .delete_due(&ledger.actor, recorded.value.payment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));
}

// ============================================================================
// Manual bank transactions
// ============================================================================

#[tokio::test]
async fn test_manual_bank_transactions() {
    let ledger = Ledger::new().await;
    let account = open_account(&ledger, 1_000).await;

    let income = ledger
        .bank
        .create_manual(
            &ledger.actor,
            ManualBankTransaction {
                bank_account_id: account,
                amount: 500,
                category: BankCategory::OtherIncome,
                transaction_date: today(),
                description: Some("interest".to_string()),
                transaction_ref: None,
            },
        )
        .await
        .unwrap()
        .value;
    assert_eq!(account_balance(&ledger, account).await, 1_500);

    let edited = ledger
        .bank
        .edit_manual(
            &ledger.actor,
            income.id,
            ManualBankTransaction {
                bank_account_id: account,
                amount: 200,
                category: BankCategory::OtherExpense,
                transaction_date: today(),
                description: Some("charges".to_string()),
                transaction_ref: None,
            },
        )
        .await;
    assert!(edited.is_ok());
    assert_eq!(account_balance(&ledger, account).await, 800);

    let _ = ledger.bank.delete_manual(&ledger.actor, income.id).await.unwrap();
    assert_eq!(account_balance(&ledger, account).await, 1_000);

    let err = ledger
        .bank
        .create_manual(
            &ledger.actor,
            ManualBankTransaction {
                bank_account_id: account,
                amount: 100,
                category: BankCategory::StudentPayment,
                transaction_date: today(),
                description: None,
                transaction_ref: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

// ============================================================================
// Single origin across every posting source
// ============================================================================

#[tokio::test]
async fn test_every_payment_has_at_most_one_origin() {
    let ledger = Ledger::new().await;
    let enrolled = ledger.enrolled("Asha", 50_000).await;
    let director = ledger.directory.create_director("Meera", None).await.unwrap();
    let account = open_account(&ledger, 0).await;

    let _ = ledger.cash_from(enrolled.student.id, 1_000).await;
    let _ = ledger
        .payments
        .record(&ledger.actor, direct(enrolled.student.id, 2_000, Some(account)))
        .await
        .unwrap();
    let _ = ledger
        .payments
        .record(&ledger.actor, direct(enrolled.student.id, 3_000, None))
        .await
        .unwrap();
    let _ = ledger
        .directors
        .create(
            &ledger.actor,
            DirectorEntryInput {
                director_id: director.id,
                transaction_date: today(),
                amount: 4_000,
                transaction_type: DirectorTransactionType::StudentPaid,
                description: None,
                reference_id: None,
                student_id: Some(enrolled.student.id),
                bank_account_id: None,
            },
        )
        .await
        .unwrap();

    let payments = all_payments(&ledger).await;
    assert_eq!(payments.len(), 4);
    for payment in &payments {
        assert!(payment.origin().is_ok());
    }
    ledger.assert_balance_invariant(enrolled.fee.id).await;
    assert_eq!(ledger.fee(enrolled.fee.id).await.balance_amount, Some(40_000));
}
