//! Fee Ledger Store persistence.
//!
//! Every posting source funnels its fee-side writes through these helpers, all
//! of which run on the caller's open transaction:
//!
//! 1. lock the fee row,
//! 2. validate the movement with [`FeeLedger`],
//! 3. write the payment row,
//! 4. rebuild the balance from the PAID payments actually linked to the fee.
//!
//! Step 4 makes the stored balance equal `max(final_fee - paid, 0)` after every
//! write, whatever the arithmetic in step 2 predicted. A disagreement between the
//! two is logged as drift.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use tuition_core::cache::{CacheKey, fee_scopes};
use tuition_core::effects::{BookingNotice, EffectSet, FeeCompletionNotice};
use tuition_core::fee::{BalanceUpdate, FeeLedger};
use tuition_core::posting::{PaymentMode, PaymentOrigin};
use tuition_core::{EntityKind, LedgerError};
use uuid::Uuid;

use super::support::{db_err, find_by_id, lock_by_id, now};
use crate::entities::sea_orm_active_enums::{FeeStatus, PaymentStatus};
use crate::entities::{batches, courses, fees, payments, students};

/// Descriptive fields of a payment row.
#[derive(Debug, Clone, Default)]
pub(crate) struct PaymentMeta {
    pub mode: Option<PaymentMode>,
    pub transaction_ref: Option<String>,
    pub note: Option<String>,
    pub is_advance: bool,
    pub created_by: Uuid,
}

/// A fee after a balance change, with the transition that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct FeePosting {
    /// Fee row as written.
    pub fee: fees::Model,
    /// Balance transition.
    pub update: BalanceUpdate,
}

impl FeePosting {
    /// True if this change took the fee to PAID.
    #[must_use]
    pub const fn completed(&self) -> bool {
        self.update.completed
    }
}

/// Locks a fee row.
pub(crate) async fn lock_fee(txn: &DatabaseTransaction, fee_id: Uuid) -> Result<fees::Model, LedgerError> {
    lock_by_id::<fees::Entity, _>(txn, EntityKind::Fee, fee_id).await
}

/// Finds the fee a student currently owes against: the newest fee that is
/// neither terminal nor frozen.
pub(crate) async fn find_active_fee<C: ConnectionTrait>(
    conn: &C,
    student_id: Uuid,
    lock: bool,
) -> Result<Option<fees::Model>, LedgerError> {
    let mut query = fees::Entity::find()
        .filter(fees::Column::StudentId.eq(student_id))
        .filter(fees::Column::Status.is_in([FeeStatus::Pending, FeeStatus::Paid]))
        .filter(fees::Column::IsLocked.eq(false))
        .order_by_desc(fees::Column::CreatedAt);
    if lock {
        query = query.lock_exclusive();
    }
    query.one(conn).await.map_err(db_err)
}

/// Like [`find_active_fee`], restricted to the fee owed for one batch.
pub(crate) async fn find_active_fee_at(
    txn: &DatabaseTransaction,
    student_id: Uuid,
    batch_id: Uuid,
) -> Result<Option<fees::Model>, LedgerError> {
    fees::Entity::find()
        .filter(fees::Column::StudentId.eq(student_id))
        .filter(fees::Column::BatchId.eq(batch_id))
        .filter(fees::Column::Status.is_in([FeeStatus::Pending, FeeStatus::Paid]))
        .filter(fees::Column::IsLocked.eq(false))
        .order_by_desc(fees::Column::CreatedAt)
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_err)
}

/// Locks the active fee of a student, failing with `NoFeeRecord` if none.
pub(crate) async fn lock_active_fee(
    txn: &DatabaseTransaction,
    student_id: Uuid,
) -> Result<fees::Model, LedgerError> {
    find_active_fee(txn, student_id, true)
        .await?
        .ok_or(LedgerError::NoFeeRecord { student_id })
}

/// Sum of the PAID payments linked to a fee.
pub(crate) async fn paid_total<C: ConnectionTrait>(conn: &C, fee_id: Uuid) -> Result<i64, LedgerError> {
    let amounts: Vec<i64> = payments::Entity::find()
        .select_only()
        .column(payments::Column::Amount)
        .filter(payments::Column::FeeId.eq(fee_id))
        .filter(payments::Column::Status.eq(PaymentStatus::Paid))
        .into_tuple()
        .all(conn)
        .await
        .map_err(db_err)?;
    Ok(amounts.into_iter().sum())
}

/// Posts money to a fee: validates, writes a PAID payment carrying `origin`,
/// and rebuilds the balance.
pub(crate) async fn apply_money(
    txn: &DatabaseTransaction,
    fee: fees::Model,
    amount: i64,
    origin: PaymentOrigin,
    meta: &PaymentMeta,
) -> Result<(payments::Model, FeePosting), LedgerError> {
    let expected = FeeLedger::apply_money(&fee.snapshot(), amount)?;

    let links = origin.links();
    let timestamp = now();
    let payment = payments::ActiveModel {
        id: Set(Uuid::now_v7()),
        fee_id: Set(fee.id),
        student_id: Set(fee.student_id),
        amount: Set(amount),
        status: Set(PaymentStatus::Paid),
        mode: Set(meta.mode.map(Into::into)),
        due_date: Set(None),
        paid_at: Set(Some(timestamp)),
        transaction_ref: Set(meta.transaction_ref.clone()),
        note: Set(meta.note.clone()),
        is_advance: Set(meta.is_advance),
        cash_entry_id: Set(links.cash_entry_id),
        director_ledger_entry_id: Set(links.director_ledger_entry_id),
        bank_transaction_id: Set(links.bank_transaction_id),
        created_by: Set(meta.created_by),
        created_at: Set(timestamp),
        updated_at: Set(timestamp),
    }
    .insert(txn)
    .await
    .map_err(db_err)?;

    let posting = settle(txn, fee, Some(expected.new_balance)).await?;
    Ok((payment, posting))
}

/// Turns a scheduled due into PAID money in place: the row keeps its id and
/// due date, and the fee balance moves as for [`apply_money`].
pub(crate) async fn collect_due(
    txn: &DatabaseTransaction,
    fee: fees::Model,
    due: payments::Model,
    origin: PaymentOrigin,
    meta: &PaymentMeta,
) -> Result<(payments::Model, FeePosting), LedgerError> {
    let expected = FeeLedger::apply_money(&fee.snapshot(), due.amount)?;

    let links = origin.links();
    let mut active: payments::ActiveModel = due.into();
    active.status = Set(PaymentStatus::Paid);
    active.paid_at = Set(Some(now()));
    active.mode = Set(meta.mode.map(Into::into));
    active.transaction_ref = Set(meta.transaction_ref.clone());
    active.cash_entry_id = Set(links.cash_entry_id);
    active.director_ledger_entry_id = Set(links.director_ledger_entry_id);
    active.bank_transaction_id = Set(links.bank_transaction_id);
    active.updated_at = Set(now());
    let payment = active.update(txn).await.map_err(db_err)?;

    let posting = settle(txn, fee, Some(expected.new_balance)).await?;
    Ok((payment, posting))
}

/// Reverses a PAID payment: adds its amount back to the fee and deletes the row.
pub(crate) async fn reverse_money(
    txn: &DatabaseTransaction,
    payment: payments::Model,
) -> Result<FeePosting, LedgerError> {
    let fee = lock_fee(txn, payment.fee_id).await?;
    let expected = FeeLedger::reverse_money(&fee.snapshot(), payment.amount)?;

    payments::Entity::delete_by_id(payment.id)
        .exec(txn)
        .await
        .map_err(db_err)?;

    settle(txn, fee, Some(expected.new_balance)).await
}

/// Changes the amount of a PAID payment in place, applying the difference to
/// its fee as one adjustment.
pub(crate) async fn adjust_money(
    txn: &DatabaseTransaction,
    payment: payments::Model,
    new_amount: i64,
) -> Result<(payments::Model, FeePosting), LedgerError> {
    let fee = lock_fee(txn, payment.fee_id).await?;
    let expected = FeeLedger::adjust(&fee.snapshot(), payment.amount, new_amount)?;

    let mut active: payments::ActiveModel = payment.into();
    active.amount = Set(new_amount);
    active.updated_at = Set(now());
    let payment = active.update(txn).await.map_err(db_err)?;

    let posting = settle(txn, fee, Some(expected.new_balance)).await?;
    Ok((payment, posting))
}

/// Moves a PAID payment onto another fee, possibly with a new amount. The row
/// keeps its id and origin; the old fee is credited back and the new one
/// charged.
pub(crate) async fn move_money(
    txn: &DatabaseTransaction,
    payment: payments::Model,
    to_fee: fees::Model,
    new_amount: i64,
) -> Result<(payments::Model, FeePosting, FeePosting), LedgerError> {
    if to_fee.id == payment.fee_id {
        let (payment, posting) = adjust_money(txn, payment, new_amount).await?;
        return Ok((payment, posting.clone(), posting));
    }

    let from_fee = lock_fee(txn, payment.fee_id).await?;
    let reversed = FeeLedger::reverse_money(&from_fee.snapshot(), payment.amount)?;
    let applied = FeeLedger::apply_money(&to_fee.snapshot(), new_amount)?;

    let mut active: payments::ActiveModel = payment.into();
    active.fee_id = Set(to_fee.id);
    active.student_id = Set(to_fee.student_id);
    active.amount = Set(new_amount);
    active.updated_at = Set(now());
    let payment = active.update(txn).await.map_err(db_err)?;

    let from = settle(txn, from_fee, Some(reversed.new_balance)).await?;
    let to = settle(txn, to_fee, Some(applied.new_balance)).await?;
    Ok((payment, from, to))
}

/// Rebuilds a fee's balance and status from its PAID payments and writes them.
/// Purges the fee's scheduled dues once nothing is owed.
pub(crate) async fn settle(
    txn: &DatabaseTransaction,
    fee: fees::Model,
    expected_balance: Option<i64>,
) -> Result<FeePosting, LedgerError> {
    let paid = paid_total(txn, fee.id).await?;
    let update = FeeLedger::recompute(&fee.snapshot(), paid)?;

    if let Some(expected) = expected_balance
        && expected != update.new_balance
    {
        tracing::warn!(
            fee_id = %fee.id,
            expected,
            recomputed = update.new_balance,
            "fee balance drift healed by recompute"
        );
    }

    let mut active: fees::ActiveModel = fee.into();
    active.balance_amount = Set(Some(update.new_balance));
    active.status = Set(update.new_status.into());
    active.updated_at = Set(now());
    let fee = active.update(txn).await.map_err(db_err)?;

    if update.new_balance == 0 {
        purge_dues(txn, fee.id).await?;
    }

    Ok(FeePosting { fee, update })
}

/// Deletes the PENDING dues of a fee. Returns how many were removed.
pub(crate) async fn purge_dues(txn: &DatabaseTransaction, fee_id: Uuid) -> Result<u64, LedgerError> {
    let result = payments::Entity::delete_many()
        .filter(payments::Column::FeeId.eq(fee_id))
        .filter(payments::Column::Status.eq(PaymentStatus::Pending))
        .exec(txn)
        .await
        .map_err(db_err)?;
    if result.rows_affected > 0 {
        tracing::debug!(%fee_id, purged = result.rows_affected, "scheduled dues purged");
    }
    Ok(result.rows_affected)
}

/// Builds the completion notice for a fee, reading its student and course.
pub(crate) async fn completion_notice<C: ConnectionTrait>(
    conn: &C,
    fee: &fees::Model,
) -> Result<FeeCompletionNotice, LedgerError> {
    let student = find_by_id::<students::Entity, _>(conn, EntityKind::Student, fee.student_id).await?;
    let batch = find_by_id::<batches::Entity, _>(conn, EntityKind::Batch, fee.batch_id).await?;
    let course = find_by_id::<courses::Entity, _>(conn, EntityKind::Course, batch.course_id).await?;
    Ok(FeeCompletionNotice {
        fee_id: fee.id.into(),
        student_id: student.id.into(),
        student_name: student.name,
        student_email: student.email,
        course_name: course.name,
        final_fee: fee.final_fee,
    })
}

/// Cache scopes of a fee: its student, its batch and the batch's location.
pub(crate) async fn scopes_of<C: ConnectionTrait>(
    conn: &C,
    fee: &fees::Model,
) -> Result<Vec<CacheKey>, LedgerError> {
    let batch = find_by_id::<batches::Entity, _>(conn, EntityKind::Batch, fee.batch_id).await?;
    Ok(fee_scopes(
        fee.student_id.into(),
        fee.batch_id.into(),
        batch.location_id.into(),
    ))
}

/// Adds the effects a fee balance change owes: scope invalidation, plus the
/// completion notice when the change took the fee to PAID.
pub(crate) async fn note_posting<C: ConnectionTrait>(
    conn: &C,
    effects: &mut EffectSet,
    posting: &FeePosting,
) -> Result<(), LedgerError> {
    effects.invalidate(scopes_of(conn, &posting.fee).await?);
    if posting.completed() {
        effects.fee_completed(completion_notice(conn, &posting.fee).await?);
    }
    Ok(())
}

/// Moves a fee's recorded advance by `delta`. Returns the fee as written and
/// whether this took it from no advance to some advance.
pub(crate) async fn shift_advance(
    txn: &DatabaseTransaction,
    fee_id: Uuid,
    delta: i64,
) -> Result<(fees::Model, bool), LedgerError> {
    let fee = lock_fee(txn, fee_id).await?;
    let before = fee.advance_amount.unwrap_or(0);
    let after = (before + delta).max(0);
    let mut active: fees::ActiveModel = fee.into();
    active.advance_amount = Set((after > 0).then_some(after));
    active.updated_at = Set(now());
    let fee = active.update(txn).await.map_err(db_err)?;
    Ok((fee, before == 0 && after > 0))
}

/// Builds the booking confirmation for a fee's advance.
pub(crate) async fn booking_notice<C: ConnectionTrait>(
    conn: &C,
    fee: &fees::Model,
) -> Result<BookingNotice, LedgerError> {
    let student = find_by_id::<students::Entity, _>(conn, EntityKind::Student, fee.student_id).await?;
    let batch = find_by_id::<batches::Entity, _>(conn, EntityKind::Batch, fee.batch_id).await?;
    Ok(BookingNotice {
        fee_id: fee.id.into(),
        student_id: student.id.into(),
        student_name: student.name,
        student_email: student.email,
        batch_name: batch.name,
        advance_amount: fee.advance_amount.unwrap_or(0),
    })
}
