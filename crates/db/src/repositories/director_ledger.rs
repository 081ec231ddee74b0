//! Director Ledger posting source.
//!
//! Money attributed to an individual director. A STUDENT_PAID row posts to the
//! student's fee like a cash entry does; an INSTITUTION_GAVE_BANK row pays the
//! director out of a bank account and must be covered by its balance.
//!
//! Rows mirrored from OWNER_TAKEN cash entries are written only by the cash
//! journal and rejected here.

use std::time::Duration;

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tuition_core::ActorContext;
use tuition_core::cache::{bank_scopes, director_scopes};
use tuition_core::effects::{AuditEvent, AuditEventType, Committed, EffectSet};
use tuition_core::posting::{
    BankCategory, BankLink, DebitCredit as CoreDebitCredit, DirectorTransactionType, EditPlan,
    PaymentMode, PaymentOrigin, PostingLink, validate_director_entry,
};
use tuition_core::{EntityKind, LedgerError};
use tuition_shared::types::PageRequest;
use uuid::Uuid;

use super::bank::{BankMeta, BankTransition, existing_link, remove_bank_transaction};
use super::fee_store::{self, PaymentMeta};
use super::support::{
    JournalPage, JournalTotals, bounded, db_err, fetch_page, find_by_id, lock_by_id, now,
};
use crate::entities::sea_orm_active_enums::{
    CashTransactionType as StoredCashType, DebitCredit,
    DirectorTransactionType as StoredDirectorType,
};
use crate::entities::{cash_entries, director_ledger_entries, directors, fees, payments, students};

/// Director ledger entry request, used for create and edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorEntryInput {
    /// Director the money is attributed to.
    pub director_id: Uuid,
    /// Value date.
    pub transaction_date: NaiveDate,
    /// Positive amount.
    pub amount: i64,
    /// Kind of movement.
    pub transaction_type: DirectorTransactionType,
    /// Free text.
    pub description: Option<String>,
    /// External reference.
    pub reference_id: Option<String>,
    /// Student whose fee this pays (STUDENT_PAID only).
    pub student_id: Option<Uuid>,
    /// Account paying the director (INSTITUTION_GAVE_BANK only).
    pub bank_account_id: Option<Uuid>,
}

/// A director ledger row with what it posted.
#[derive(Debug, Clone, Serialize)]
pub struct DirectorPosting {
    /// The ledger row.
    pub entry: director_ledger_entries::Model,
    /// The payment it originated, if it pays a fee.
    pub payment: Option<payments::Model>,
    /// The fee it paid, as written.
    pub fee: Option<fees::Model>,
}

/// Director ledger repository.
#[derive(Debug, Clone)]
pub struct DirectorLedgerRepository {
    db: DatabaseConnection,
    tx_timeout: Duration,
}

impl DirectorLedgerRepository {
    /// Creates a new director ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, tx_timeout: Duration) -> Self {
        Self { db, tx_timeout }
    }

    /// Records a director ledger entry.
    ///
    /// # Errors
    ///
    /// - `Validation` for a non-positive amount or a field the type does not take
    /// - `NotFound` for a missing director, student or bank account
    /// - `NoFeeRecord` if the student owes no active fee
    /// - `InsufficientBankBalance` if the account cannot cover a disbursement
    pub async fn create(
        &self,
        actor: &ActorContext,
        input: DirectorEntryInput,
    ) -> Result<Committed<DirectorPosting>, LedgerError> {
        validate_director_entry(
            input.transaction_type,
            input.amount,
            input.student_id,
            input.bank_account_id,
        )?;

        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let director =
                find_by_id::<directors::Entity, _>(&txn, EntityKind::Director, input.director_id)
                    .await?;
            let fee = match input.student_id {
                Some(student_id) => {
                    lock_by_id::<students::Entity, _>(&txn, EntityKind::Student, student_id).await?;
                    Some(fee_store::lock_active_fee(&txn, student_id).await?)
                }
                None => None,
            };

            let bank_transaction_id = match input.bank_account_id {
                Some(account_id) => {
                    let row = super::bank::create_bank_transaction(
                        &txn,
                        BankLink {
                            account_id,
                            amount: input.amount,
                        },
                        &disbursement_meta(actor, &input),
                    )
                    .await?;
                    Some(row.id)
                }
                None => None,
            };

            let timestamp = now();
            let entry = director_ledger_entries::ActiveModel {
                id: Set(Uuid::now_v7()),
                director_id: Set(director.id),
                location_id: Set(actor.location_id.into_inner()),
                transaction_date: Set(input.transaction_date),
                amount: Set(input.amount),
                transaction_type: Set(input.transaction_type.into()),
                debit_credit: Set(input.transaction_type.debit_credit().into()),
                description: Set(input.description.clone()),
                reference_id: Set(input.reference_id.clone()),
                student_id: Set(input.student_id),
                bank_transaction_id: Set(bank_transaction_id),
                source_cash_entry_id: Set(None),
                created_by: Set(actor.user_id.into_inner()),
                created_at: Set(timestamp),
                updated_at: Set(timestamp),
            }
            .insert(&txn)
            .await
            .map_err(db_err)?;

            let mut effects = EffectSet::new();
            effects.invalidate(director_scopes(director.id.into()));
            if bank_transaction_id.is_some() {
                effects.invalidate(bank_scopes());
            }

            let (payment, fee) = match fee {
                Some(fee) => {
                    let (payment, posting) = fee_store::apply_money(
                        &txn,
                        fee,
                        entry.amount,
                        PaymentOrigin::Director(entry.id),
                        &payment_meta(actor, &entry),
                    )
                    .await?;
                    fee_store::note_posting(&txn, &mut effects, &posting).await?;
                    (Some(payment), Some(posting.fee))
                }
                None => (None, None),
            };

            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::DirectorLedgerEntryAdded,
                    "Director ledger entry",
                    format!(
                        "{} of {} recorded for {}",
                        input.transaction_type, entry.amount, director.name
                    ),
                )
                .with_director(Some(director.id.into()))
                .with_student(entry.student_id.map(Into::into)),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(
                entry_id = %entry.id,
                director_id = %entry.director_id,
                amount = entry.amount,
                transaction_type = %input.transaction_type,
                "director ledger entry recorded"
            );
            Ok(effects.commit(DirectorPosting {
                entry,
                payment,
                fee,
            }))
        })
        .await
    }

    /// Edits a director ledger entry.
    ///
    /// A changed student or director moves the originated payment to the new
    /// student's fee; otherwise the amount difference is applied to the fee as
    /// one adjustment. The bank side follows the none/bank transition matrix.
    pub async fn edit(
        &self,
        actor: &ActorContext,
        entry_id: Uuid,
        input: DirectorEntryInput,
    ) -> Result<Committed<DirectorPosting>, LedgerError> {
        validate_director_entry(
            input.transaction_type,
            input.amount,
            input.student_id,
            input.bank_account_id,
        )?;

        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let entry = lock_owned_entry(&txn, entry_id).await?;
            let director =
                find_by_id::<directors::Entity, _>(&txn, EntityKind::Director, input.director_id)
                    .await?;
            let payment = originated_payment(&txn, entry.id).await?;

            let plan = EditPlan::decide(
                PostingLink {
                    student_id: entry.student_id,
                    director_id: Some(entry.director_id),
                },
                PostingLink {
                    student_id: input.student_id,
                    director_id: Some(input.director_id),
                },
                payment.is_some(),
            );

            let transition = BankTransition::plan(
                existing_link(&txn, entry.bank_transaction_id).await?,
                input.bank_account_id.map(|account_id| BankLink {
                    account_id,
                    amount: input.amount,
                }),
            );
            let bank_link = transition
                .apply_leading(&txn, &disbursement_meta(actor, &input))
                .await?;
            let bank_touched = entry.bank_transaction_id.is_some() || bank_link.is_some();

            let mut effects = EffectSet::new();
            effects.invalidate(director_scopes(entry.director_id.into()));
            effects.invalidate(director_scopes(director.id.into()));
            if bank_touched {
                effects.invalidate(bank_scopes());
            }

            let previous_amount = entry.amount;
            let mut active: director_ledger_entries::ActiveModel = entry.into();
            active.director_id = Set(director.id);
            active.transaction_date = Set(input.transaction_date);
            active.amount = Set(input.amount);
            active.transaction_type = Set(input.transaction_type.into());
            active.debit_credit = Set(input.transaction_type.debit_credit().into());
            active.description = Set(input.description.clone());
            active.reference_id = Set(input.reference_id.clone());
            active.student_id = Set(input.student_id);
            active.bank_transaction_id = Set(bank_link);
            active.updated_at = Set(now());
            let entry = active.update(&txn).await.map_err(db_err)?;

            let (payment, fee) = repost(
                &txn,
                &mut effects,
                plan,
                payment,
                input.amount,
                PaymentOrigin::Director(entry.id),
                &payment_meta(actor, &entry),
            )
            .await?;

            transition.apply_trailing(&txn, CoreDebitCredit::Debit).await?;

            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::DirectorLedgerEntryUpdated,
                    "Director ledger entry",
                    format!(
                        "{} changed from {previous_amount} to {} for {}",
                        input.transaction_type, entry.amount, director.name
                    ),
                )
                .with_director(Some(director.id.into()))
                .with_student(entry.student_id.map(Into::into)),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(entry_id = %entry.id, amount = entry.amount, "director ledger entry updated");
            Ok(effects.commit(DirectorPosting {
                entry,
                payment,
                fee,
            }))
        })
        .await
    }

    /// Deletes a director ledger entry, reversing its fee payment and bank
    /// transaction.
    pub async fn delete(
        &self,
        actor: &ActorContext,
        entry_id: Uuid,
    ) -> Result<Committed<()>, LedgerError> {
        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let entry = lock_owned_entry(&txn, entry_id).await?;

            let mut effects = EffectSet::new();
            effects.invalidate(director_scopes(entry.director_id.into()));

            if let Some(payment) = originated_payment(&txn, entry.id).await? {
                let posting = fee_store::reverse_money(&txn, payment).await?;
                fee_store::note_posting(&txn, &mut effects, &posting).await?;
            }

            director_ledger_entries::Entity::delete_by_id(entry.id)
                .exec(&txn)
                .await
                .map_err(db_err)?;

            if let Some(bank_transaction_id) = entry.bank_transaction_id {
                remove_bank_transaction(&txn, bank_transaction_id).await?;
                effects.invalidate(bank_scopes());
            }

            let transaction_type: DirectorTransactionType = entry.transaction_type.into();
            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::DirectorLedgerEntryDeleted,
                    "Director ledger entry",
                    format!("{transaction_type} of {} deleted", entry.amount),
                )
                .with_director(Some(entry.director_id.into()))
                .with_student(entry.student_id.map(Into::into)),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(%entry_id, "director ledger entry deleted");
            Ok(effects.commit(()))
        })
        .await
    }

    /// Finds an entry by id.
    pub async fn find(&self, entry_id: Uuid) -> Result<director_ledger_entries::Model, LedgerError> {
        find_by_id::<director_ledger_entries::Entity, _>(
            &self.db,
            EntityKind::DirectorLedgerEntry,
            entry_id,
        )
        .await
    }

    /// Lists a director's ledger, newest first, with totals over all rows.
    pub async fn list(
        &self,
        director_id: Uuid,
        page: &PageRequest,
    ) -> Result<JournalPage<director_ledger_entries::Model>, LedgerError> {
        let rows: Vec<(DebitCredit, i64)> = director_ledger_entries::Entity::find()
            .select_only()
            .column(director_ledger_entries::Column::DebitCredit)
            .column(director_ledger_entries::Column::Amount)
            .filter(director_ledger_entries::Column::DirectorId.eq(director_id))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let totals = JournalTotals::from_rows(rows.into_iter().map(|(d, a)| (d.into(), a)));

        let query = director_ledger_entries::Entity::find()
            .filter(director_ledger_entries::Column::DirectorId.eq(director_id))
            .order_by_desc(director_ledger_entries::Column::TransactionDate)
            .order_by_desc(director_ledger_entries::Column::CreatedAt);
        let page = fetch_page(&self.db, query, page).await?;
        Ok(JournalPage { page, totals })
    }
}

/// Applies an edit plan to the payment a journal row originated.
///
/// Returns the payment and the fee it now sits on, if any.
pub(crate) async fn repost(
    txn: &DatabaseTransaction,
    effects: &mut EffectSet,
    plan: EditPlan,
    payment: Option<payments::Model>,
    new_amount: i64,
    origin: PaymentOrigin,
    meta: &PaymentMeta,
) -> Result<(Option<payments::Model>, Option<fees::Model>), LedgerError> {
    match (plan, payment) {
        (EditPlan::NoFeeEffect, payment) => Ok((payment, None)),
        (EditPlan::Adjust { .. }, Some(payment)) => {
            if payment.amount == new_amount {
                fee_store::lock_fee(txn, payment.fee_id)
                    .await?
                    .snapshot()
                    .ensure_mutable()?;
                return Ok((Some(payment), None));
            }
            let (payment, posting) = fee_store::adjust_money(txn, payment, new_amount).await?;
            fee_store::note_posting(txn, effects, &posting).await?;
            Ok((Some(payment), Some(posting.fee)))
        }
        (EditPlan::Reattribute { to, .. }, payment) => match (payment, to) {
            (Some(payment), Some(student_id)) => {
                lock_by_id::<students::Entity, _>(txn, EntityKind::Student, student_id).await?;
                let to_fee = fee_store::lock_active_fee(txn, student_id).await?;
                let (payment, from, to) =
                    fee_store::move_money(txn, payment, to_fee, new_amount).await?;
                fee_store::note_posting(txn, effects, &from).await?;
                if to.fee.id != from.fee.id {
                    fee_store::note_posting(txn, effects, &to).await?;
                }
                Ok((Some(payment), Some(to.fee)))
            }
            (Some(payment), None) => {
                let posting = fee_store::reverse_money(txn, payment).await?;
                fee_store::note_posting(txn, effects, &posting).await?;
                Ok((None, None))
            }
            (None, Some(student_id)) => {
                lock_by_id::<students::Entity, _>(txn, EntityKind::Student, student_id).await?;
                let fee = fee_store::lock_active_fee(txn, student_id).await?;
                let (payment, posting) =
                    fee_store::apply_money(txn, fee, new_amount, origin, meta).await?;
                fee_store::note_posting(txn, effects, &posting).await?;
                Ok((Some(payment), Some(posting.fee)))
            }
            (None, None) => Ok((None, None)),
        },
        (EditPlan::Adjust { student_id }, None) => Err(LedgerError::ConsistencyViolation(
            format!("adjustment planned for student {student_id} without a payment"),
        )),
    }
}

/// Payment originated by a director ledger row.
async fn originated_payment(
    txn: &DatabaseTransaction,
    entry_id: Uuid,
) -> Result<Option<payments::Model>, LedgerError> {
    payments::Entity::find()
        .filter(payments::Column::DirectorLedgerEntryId.eq(entry_id))
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_err)
}

/// Locks an entry that this ledger owns, rejecting cash-entry mirrors.
async fn lock_owned_entry(
    txn: &DatabaseTransaction,
    entry_id: Uuid,
) -> Result<director_ledger_entries::Model, LedgerError> {
    let entry = lock_by_id::<director_ledger_entries::Entity, _>(
        txn,
        EntityKind::DirectorLedgerEntry,
        entry_id,
    )
    .await?;
    if let Some(cash_entry_id) = entry.source_cash_entry_id {
        return Err(LedgerError::InvalidState(format!(
            "director ledger entry {entry_id} mirrors cash entry {cash_entry_id}; change the cash entry instead"
        )));
    }
    Ok(entry)
}

fn payment_meta(actor: &ActorContext, entry: &director_ledger_entries::Model) -> PaymentMeta {
    PaymentMeta {
        mode: Some(PaymentMode::Director),
        transaction_ref: entry.reference_id.clone(),
        note: entry.description.clone(),
        is_advance: false,
        created_by: actor.user_id.into_inner(),
    }
}

fn disbursement_meta(actor: &ActorContext, input: &DirectorEntryInput) -> BankMeta {
    BankMeta {
        category: BankCategory::DirectorDisbursement,
        mode: Some(PaymentMode::BankTransfer),
        transaction_ref: input.reference_id.clone(),
        description: input.description.clone(),
        transaction_date: input.transaction_date,
        fee_id: None,
        student_id: None,
        location_id: Some(actor.location_id.into_inner()),
        created_by: actor.user_id.into_inner(),
    }
}

/// Finds the director ledger row mirroring a cash entry.
pub(crate) async fn find_mirror(
    txn: &DatabaseTransaction,
    cash_entry_id: Uuid,
) -> Result<Option<director_ledger_entries::Model>, LedgerError> {
    director_ledger_entries::Entity::find()
        .filter(director_ledger_entries::Column::SourceCashEntryId.eq(cash_entry_id))
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_err)
}

/// Brings the mirror of a cash entry in line with it: an OWNER_TAKEN entry
/// naming a director has exactly one mirror, any other entry has none.
pub(crate) async fn sync_mirror(
    txn: &DatabaseTransaction,
    cash: &cash_entries::Model,
    existing: Option<director_ledger_entries::Model>,
) -> Result<Option<director_ledger_entries::Model>, LedgerError> {
    let director_id = cash
        .director_id
        .filter(|_| cash.transaction_type == StoredCashType::OwnerTaken);
    let kind = DirectorTransactionType::OwnerTaken;

    match (existing, director_id) {
        (None, None) => Ok(None),
        (Some(mirror), None) => {
            director_ledger_entries::Entity::delete_by_id(mirror.id)
                .exec(txn)
                .await
                .map_err(db_err)?;
            Ok(None)
        }
        (None, Some(director_id)) => {
            let timestamp = now();
            let mirror = director_ledger_entries::ActiveModel {
                id: Set(Uuid::now_v7()),
                director_id: Set(director_id),
                location_id: Set(cash.location_id),
                transaction_date: Set(cash.transaction_date),
                amount: Set(cash.amount),
                transaction_type: Set(StoredDirectorType::from(kind)),
                debit_credit: Set(kind.debit_credit().into()),
                description: Set(cash.description.clone()),
                reference_id: Set(cash.reference_id.clone()),
                student_id: Set(None),
                bank_transaction_id: Set(None),
                source_cash_entry_id: Set(Some(cash.id)),
                created_by: Set(cash.created_by),
                created_at: Set(timestamp),
                updated_at: Set(timestamp),
            }
            .insert(txn)
            .await
            .map_err(db_err)?;
            Ok(Some(mirror))
        }
        (Some(mirror), Some(director_id)) => {
            let mut active: director_ledger_entries::ActiveModel = mirror.into();
            active.director_id = Set(director_id);
            active.transaction_date = Set(cash.transaction_date);
            active.amount = Set(cash.amount);
            active.description = Set(cash.description.clone());
            active.reference_id = Set(cash.reference_id.clone());
            active.updated_at = Set(now());
            Ok(Some(active.update(txn).await.map_err(db_err)?))
        }
    }
}
