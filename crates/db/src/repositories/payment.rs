//! Direct Payment Recorder: money and scheduled dues entered straight against
//! a student's fee, optionally reconciled to a bank account.
//!
//! Payments originated by the cash journal or a director ledger row belong to
//! that journal and are rejected here.

use std::time::Duration;

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tuition_core::ActorContext;
use tuition_core::cache::bank_scopes;
use tuition_core::effects::{AuditEvent, AuditEventType, Committed, EffectSet};
use tuition_core::posting::{
    BankCategory, BankLink, DebitCredit, PaymentMode, PaymentOrigin, validate_amount,
};
use tuition_core::{EntityKind, LedgerError};
use tuition_shared::types::{PageRequest, PageResponse};
use uuid::Uuid;

use super::bank::{
    BankMeta, BankTransition, create_bank_transaction, existing_link,
    reattribute_bank_transaction, remove_bank_transaction,
};
use super::fee_store::{self, PaymentMeta};
use super::support::{bounded, db_err, fetch_page, find_by_id, lock_by_id, now};
use crate::entities::sea_orm_active_enums::PaymentStatus;
use crate::entities::{fees, payments, students};

/// A payment entered directly, used for record and edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInput {
    /// Student paying.
    pub student_id: Uuid,
    /// Positive amount.
    pub amount: i64,
    /// How the money arrived.
    pub mode: PaymentMode,
    /// Account the money was paid into, if bank-reconciled.
    pub bank_account_id: Option<Uuid>,
    /// Value date of the bank transaction.
    pub transaction_date: NaiveDate,
    /// External reference.
    pub transaction_ref: Option<String>,
    /// Free text.
    pub note: Option<String>,
    /// Booking deposit taken at admission.
    #[serde(default)]
    pub is_advance: bool,
}

/// A scheduled installment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueInput {
    /// Student owing.
    pub student_id: Uuid,
    /// Positive amount.
    pub amount: i64,
    /// Date the installment falls due.
    pub due_date: NaiveDate,
    /// Free text.
    pub note: Option<String>,
}

/// Changes to a scheduled installment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueUpdate {
    /// Positive amount.
    pub amount: i64,
    /// Date the installment falls due.
    pub due_date: NaiveDate,
    /// Free text.
    pub note: Option<String>,
}

/// How a due was paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueSettlement {
    /// How the money arrived.
    pub mode: PaymentMode,
    /// Account the money was paid into, if bank-reconciled.
    pub bank_account_id: Option<Uuid>,
    /// Value date of the bank transaction.
    pub transaction_date: NaiveDate,
    /// External reference.
    pub transaction_ref: Option<String>,
}

/// A payment with the fee it sits on.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedPayment {
    /// The payment row.
    pub payment: payments::Model,
    /// Its fee, as written.
    pub fee: fees::Model,
}

/// Direct payment repository.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    db: DatabaseConnection,
    tx_timeout: Duration,
}

impl PaymentRepository {
    /// Creates a new payment repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, tx_timeout: Duration) -> Self {
        Self { db, tx_timeout }
    }

    /// Records a payment against the student's active fee.
    ///
    /// With a bank account, a STUDENT_PAYMENT credit is written to it and
    /// linked as the payment's origin. An advance payment also adds to the
    /// fee's advance, and the first advance on a fee sends a booking
    /// confirmation.
    ///
    /// # Errors
    ///
    /// - `Validation` for a non-positive amount
    /// - `NotFound` for a missing student or bank account
    /// - `NoFeeRecord` if the student owes no active fee
    /// - `FeeAlreadyPaid`, `TerminalFee` or `FeeFrozen` if the fee takes no money
    pub async fn record(
        &self,
        actor: &ActorContext,
        input: PaymentInput,
    ) -> Result<Committed<RecordedPayment>, LedgerError> {
        validate_amount(input.amount)?;

        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            lock_by_id::<students::Entity, _>(&txn, EntityKind::Student, input.student_id).await?;
            let fee = fee_store::lock_active_fee(&txn, input.student_id).await?;
            fee.snapshot().ensure_mutable()?;

            let mut effects = EffectSet::new();
            let origin = match input.bank_account_id {
                Some(account_id) => {
                    let row = create_bank_transaction(
                        &txn,
                        BankLink {
                            account_id,
                            amount: input.amount,
                        },
                        &bank_meta(actor, &input, fee.id),
                    )
                    .await?;
                    effects.invalidate(bank_scopes());
                    PaymentOrigin::Bank(row.id)
                }
                None => PaymentOrigin::None,
            };

            let (payment, posting) = fee_store::apply_money(
                &txn,
                fee,
                input.amount,
                origin,
                &payment_meta(actor, &input),
            )
            .await?;
            fee_store::note_posting(&txn, &mut effects, &posting).await?;

            let fee = if payment.is_advance {
                let (fee, first) = fee_store::shift_advance(&txn, payment.fee_id, payment.amount).await?;
                if first {
                    effects.advance_booked(fee_store::booking_notice(&txn, &fee).await?);
                }
                fee
            } else {
                posting.fee
            };

            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::PaymentCreated,
                    "Payment",
                    format!(
                        "payment of {} recorded, balance {}",
                        payment.amount, posting.update.new_balance
                    ),
                )
                .with_student(Some(payment.student_id.into()))
                .with_batch(Some(fee.batch_id.into())),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(
                payment_id = %payment.id,
                fee_id = %payment.fee_id,
                amount = payment.amount,
                bank = origin.bank_transaction().is_some(),
                "payment recorded"
            );
            Ok(effects.commit(RecordedPayment { payment, fee }))
        })
        .await
    }

    /// Edits a directly recorded payment.
    ///
    /// A new student moves the payment to that student's active fee. The bank
    /// side follows the none/bank transition matrix in the CREDIT direction.
    ///
    /// # Errors
    ///
    /// - `InvalidState` for a scheduled due or a payment owned by a journal
    /// - `TerminalFee` or `FeeFrozen` if either fee can no longer change
    pub async fn edit(
        &self,
        actor: &ActorContext,
        payment_id: Uuid,
        input: PaymentInput,
    ) -> Result<Committed<RecordedPayment>, LedgerError> {
        validate_amount(input.amount)?;

        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let payment = lock_recorded(&txn, payment_id).await?;
            let origin = payment.origin()?;

            let to_fee = if input.student_id == payment.student_id {
                fee_store::lock_fee(&txn, payment.fee_id).await?
            } else {
                lock_by_id::<students::Entity, _>(&txn, EntityKind::Student, input.student_id)
                    .await?;
                fee_store::lock_active_fee(&txn, input.student_id).await?
            };

            // Even a bank-only change rewrites the payment's origin.
            if to_fee.id != payment.fee_id {
                fee_store::lock_fee(&txn, payment.fee_id)
                    .await?
                    .snapshot()
                    .ensure_mutable()?;
            }
            to_fee.snapshot().ensure_mutable()?;

            let mut effects = EffectSet::new();
            let transition = BankTransition::plan(
                existing_link(&txn, origin.bank_transaction()).await?,
                input.bank_account_id.map(|account_id| BankLink {
                    account_id,
                    amount: input.amount,
                }),
            );
            let bank_link = transition
                .apply_leading(&txn, &bank_meta(actor, &input, to_fee.id))
                .await?;
            if let Some(kept) = bank_link {
                reattribute_bank_transaction(&txn, kept, to_fee.id, to_fee.student_id).await?;
            }
            if origin.bank_transaction().is_some() || bank_link.is_some() {
                effects.invalidate(bank_scopes());
            }

            let previous_amount = payment.amount;
            let from_fee_id = payment.fee_id;
            let to_fee_id = to_fee.id;
            let payment = if to_fee_id == from_fee_id && previous_amount == input.amount {
                payment
            } else {
                let (payment, from, to) =
                    fee_store::move_money(&txn, payment, to_fee, input.amount).await?;
                fee_store::note_posting(&txn, &mut effects, &from).await?;
                if to_fee_id != from_fee_id {
                    fee_store::note_posting(&txn, &mut effects, &to).await?;
                }
                payment
            };

            let new_origin = bank_link.map_or(PaymentOrigin::None, PaymentOrigin::Bank);
            let links = new_origin.links();
            let mut active: payments::ActiveModel = payment.into();
            active.mode = Set(Some(input.mode.into()));
            active.transaction_ref = Set(input.transaction_ref.clone());
            active.note = Set(input.note.clone());
            active.bank_transaction_id = Set(links.bank_transaction_id);
            active.updated_at = Set(now());
            let payment = active.update(&txn).await.map_err(db_err)?;

            transition.apply_trailing(&txn, DebitCredit::Credit).await?;

            if payment.is_advance {
                fee_store::shift_advance(&txn, from_fee_id, -previous_amount).await?;
                let (fee, first) = fee_store::shift_advance(&txn, to_fee_id, payment.amount).await?;
                if first && to_fee_id != from_fee_id {
                    effects.advance_booked(fee_store::booking_notice(&txn, &fee).await?);
                }
            }
            let fee = fee_store::lock_fee(&txn, to_fee_id).await?;

            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::PaymentUpdated,
                    "Payment",
                    format!("payment changed from {previous_amount} to {}", payment.amount),
                )
                .with_student(Some(payment.student_id.into()))
                .with_batch(Some(fee.batch_id.into())),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(payment_id = %payment.id, amount = payment.amount, "payment updated");
            Ok(effects.commit(RecordedPayment { payment, fee }))
        })
        .await
    }

    /// Deletes a directly recorded payment, reversing it on its fee and
    /// removing its bank transaction.
    pub async fn delete(
        &self,
        actor: &ActorContext,
        payment_id: Uuid,
    ) -> Result<Committed<()>, LedgerError> {
        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let payment = lock_recorded(&txn, payment_id).await?;
            let origin = payment.origin()?;
            let (amount, student_id, is_advance) =
                (payment.amount, payment.student_id, payment.is_advance);

            let mut effects = EffectSet::new();
            let posting = fee_store::reverse_money(&txn, payment).await?;
            fee_store::note_posting(&txn, &mut effects, &posting).await?;
            if is_advance {
                fee_store::shift_advance(&txn, posting.fee.id, -amount).await?;
            }
            if let Some(bank_transaction_id) = origin.bank_transaction() {
                remove_bank_transaction(&txn, bank_transaction_id).await?;
                effects.invalidate(bank_scopes());
            }

            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::PaymentDeleted,
                    "Payment",
                    format!(
                        "payment of {amount} deleted, balance {}",
                        posting.update.new_balance
                    ),
                )
                .with_student(Some(student_id.into()))
                .with_batch(Some(posting.fee.batch_id.into())),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(%payment_id, amount, "payment deleted");
            Ok(effects.commit(()))
        })
        .await
    }

    /// Schedules an installment on the student's active fee. Dues carry no
    /// balance effect.
    pub async fn create_due(
        &self,
        actor: &ActorContext,
        input: DueInput,
    ) -> Result<Committed<payments::Model>, LedgerError> {
        validate_amount(input.amount)?;

        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            lock_by_id::<students::Entity, _>(&txn, EntityKind::Student, input.student_id).await?;
            let fee = fee_store::lock_active_fee(&txn, input.student_id).await?;
            let snapshot = fee.snapshot();
            snapshot.ensure_mutable()?;
            if snapshot.outstanding() == 0 {
                return Err(LedgerError::FeeAlreadyPaid(fee.id));
            }

            let timestamp = now();
            let due = payments::ActiveModel {
                id: Set(Uuid::now_v7()),
                fee_id: Set(fee.id),
                student_id: Set(fee.student_id),
                amount: Set(input.amount),
                status: Set(PaymentStatus::Pending),
                mode: Set(None),
                due_date: Set(Some(input.due_date)),
                paid_at: Set(None),
                transaction_ref: Set(None),
                note: Set(input.note.clone()),
                is_advance: Set(false),
                cash_entry_id: Set(None),
                director_ledger_entry_id: Set(None),
                bank_transaction_id: Set(None),
                created_by: Set(actor.user_id.into_inner()),
                created_at: Set(timestamp),
                updated_at: Set(timestamp),
            }
            .insert(&txn)
            .await
            .map_err(db_err)?;

            let mut effects = EffectSet::new();
            effects.invalidate(fee_store::scopes_of(&txn, &fee).await?);
            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::PaymentDueCreated,
                    "Payment due",
                    format!("due of {} scheduled for {}", due.amount, input.due_date),
                )
                .with_student(Some(due.student_id.into()))
                .with_batch(Some(fee.batch_id.into())),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(payment_id = %due.id, fee_id = %due.fee_id, due_date = %input.due_date, "due scheduled");
            Ok(effects.commit(due))
        })
        .await
    }

    /// Reschedules or resizes a due.
    pub async fn edit_due(
        &self,
        actor: &ActorContext,
        payment_id: Uuid,
        input: DueUpdate,
    ) -> Result<Committed<payments::Model>, LedgerError> {
        validate_amount(input.amount)?;

        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let due = lock_due(&txn, payment_id).await?;
            let fee = find_by_id::<fees::Entity, _>(&txn, EntityKind::Fee, due.fee_id).await?;

            let mut active: payments::ActiveModel = due.into();
            active.amount = Set(input.amount);
            active.due_date = Set(Some(input.due_date));
            active.note = Set(input.note.clone());
            active.updated_at = Set(now());
            let due = active.update(&txn).await.map_err(db_err)?;

            let mut effects = EffectSet::new();
            effects.invalidate(fee_store::scopes_of(&txn, &fee).await?);
            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::PaymentDueUpdated,
                    "Payment due",
                    format!("due changed to {} on {}", due.amount, input.due_date),
                )
                .with_student(Some(due.student_id.into())),
            );
            txn.commit().await.map_err(db_err)?;

            Ok(effects.commit(due))
        })
        .await
    }

    /// Cancels a due.
    pub async fn delete_due(
        &self,
        actor: &ActorContext,
        payment_id: Uuid,
    ) -> Result<Committed<()>, LedgerError> {
        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let due = lock_due(&txn, payment_id).await?;
            let fee = find_by_id::<fees::Entity, _>(&txn, EntityKind::Fee, due.fee_id).await?;

            payments::Entity::delete_by_id(due.id)
                .exec(&txn)
                .await
                .map_err(db_err)?;

            let mut effects = EffectSet::new();
            effects.invalidate(fee_store::scopes_of(&txn, &fee).await?);
            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::PaymentDueDeleted,
                    "Payment due",
                    format!("due of {} cancelled", due.amount),
                )
                .with_student(Some(due.student_id.into())),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(%payment_id, "due cancelled");
            Ok(effects.commit(()))
        })
        .await
    }

    /// Marks a due as paid: the row becomes a PAID payment and its amount is
    /// applied to the fee.
    pub async fn settle_due(
        &self,
        actor: &ActorContext,
        payment_id: Uuid,
        input: DueSettlement,
    ) -> Result<Committed<RecordedPayment>, LedgerError> {
        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let due = lock_due(&txn, payment_id).await?;
            let fee = fee_store::lock_fee(&txn, due.fee_id).await?;
            fee.snapshot().ensure_mutable()?;

            let mut effects = EffectSet::new();
            let origin = match input.bank_account_id {
                Some(account_id) => {
                    let row = create_bank_transaction(
                        &txn,
                        BankLink {
                            account_id,
                            amount: due.amount,
                        },
                        &BankMeta {
                            category: BankCategory::StudentPayment,
                            mode: Some(input.mode),
                            transaction_ref: input.transaction_ref.clone(),
                            description: due.note.clone(),
                            transaction_date: input.transaction_date,
                            fee_id: Some(fee.id),
                            student_id: Some(fee.student_id),
                            location_id: Some(actor.location_id.into_inner()),
                            created_by: actor.user_id.into_inner(),
                        },
                    )
                    .await?;
                    effects.invalidate(bank_scopes());
                    PaymentOrigin::Bank(row.id)
                }
                None => PaymentOrigin::None,
            };

            let meta = PaymentMeta {
                mode: Some(input.mode),
                transaction_ref: input.transaction_ref.clone(),
                note: due.note.clone(),
                is_advance: false,
                created_by: actor.user_id.into_inner(),
            };
            let (payment, posting) = fee_store::collect_due(&txn, fee, due, origin, &meta).await?;
            fee_store::note_posting(&txn, &mut effects, &posting).await?;

            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::PaymentDueSettled,
                    "Payment due",
                    format!(
                        "due of {} paid, balance {}",
                        payment.amount, posting.update.new_balance
                    ),
                )
                .with_student(Some(payment.student_id.into()))
                .with_batch(Some(posting.fee.batch_id.into())),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(%payment_id, amount = payment.amount, "due settled");
            Ok(effects.commit(RecordedPayment {
                payment,
                fee: posting.fee,
            }))
        })
        .await
    }

    /// Finds a payment or due by id.
    pub async fn find(&self, payment_id: Uuid) -> Result<payments::Model, LedgerError> {
        find_by_id::<payments::Entity, _>(&self.db, EntityKind::Payment, payment_id).await
    }

    /// Lists a student's payments and dues, newest first.
    pub async fn list(
        &self,
        student_id: Uuid,
        page: &PageRequest,
    ) -> Result<PageResponse<payments::Model>, LedgerError> {
        let query = payments::Entity::find()
            .filter(payments::Column::StudentId.eq(student_id))
            .order_by_desc(payments::Column::CreatedAt);
        fetch_page(&self.db, query, page).await
    }

    /// PENDING dues falling due on `date`, with their students.
    pub async fn dues_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<(payments::Model, students::Model)>, LedgerError> {
        let rows = payments::Entity::find()
            .filter(payments::Column::Status.eq(PaymentStatus::Pending))
            .filter(payments::Column::DueDate.eq(date))
            .find_also_related(students::Entity)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .filter_map(|(due, student)| student.map(|s| (due, s)))
            .collect())
    }
}

/// Locks a PAID payment the recorder owns.
async fn lock_recorded(
    txn: &DatabaseTransaction,
    payment_id: Uuid,
) -> Result<payments::Model, LedgerError> {
    let payment = lock_by_id::<payments::Entity, _>(txn, EntityKind::Payment, payment_id).await?;
    if payment.is_due() {
        return Err(LedgerError::InvalidState(format!(
            "payment {payment_id} is a scheduled due"
        )));
    }
    if payment.origin()?.is_journal_owned() {
        return Err(LedgerError::InvalidState(format!(
            "payment {payment_id} was posted by a journal entry; change the entry instead"
        )));
    }
    Ok(payment)
}

async fn lock_due(
    txn: &DatabaseTransaction,
    payment_id: Uuid,
) -> Result<payments::Model, LedgerError> {
    let due = lock_by_id::<payments::Entity, _>(txn, EntityKind::Payment, payment_id).await?;
    if !due.is_due() {
        return Err(LedgerError::InvalidState(format!(
            "payment {payment_id} is already paid"
        )));
    }
    Ok(due)
}

fn payment_meta(actor: &ActorContext, input: &PaymentInput) -> PaymentMeta {
    PaymentMeta {
        mode: Some(input.mode),
        transaction_ref: input.transaction_ref.clone(),
        note: input.note.clone(),
        is_advance: input.is_advance,
        created_by: actor.user_id.into_inner(),
    }
}

fn bank_meta(actor: &ActorContext, input: &PaymentInput, fee_id: Uuid) -> BankMeta {
    BankMeta {
        category: BankCategory::StudentPayment,
        mode: Some(input.mode),
        transaction_ref: input.transaction_ref.clone(),
        description: input.note.clone(),
        transaction_date: input.transaction_date,
        fee_id: Some(fee_id),
        student_id: Some(input.student_id),
        location_id: Some(actor.location_id.into_inner()),
        created_by: actor.user_id.into_inner(),
    }
}
