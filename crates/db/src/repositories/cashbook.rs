//! Cash Entry Journal: the per-location cash drawer.
//!
//! A STUDENT_PAID entry posts its amount to the student's active fee. An
//! OWNER_TAKEN entry naming a director keeps a mirrored row in that director's
//! ledger. The entry, its payment and its mirror always change together.

use std::time::Duration;

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tuition_core::ActorContext;
use tuition_core::cache::{cashbook_scopes, director_scopes};
use tuition_core::effects::{AuditEvent, AuditEventType, Committed, EffectSet};
use tuition_core::posting::{
    CashTransactionType, EditPlan, PaymentMode, PaymentOrigin, PostingLink, validate_cash_entry,
};
use tuition_core::{EntityKind, LedgerError};
use tuition_shared::types::PageRequest;
use uuid::Uuid;

use super::director_ledger::{find_mirror, repost, sync_mirror};
use super::fee_store::{self, PaymentMeta};
use super::support::{
    JournalPage, JournalTotals, bounded, db_err, fetch_page, find_by_id, lock_by_id, now,
};
use crate::entities::sea_orm_active_enums::DebitCredit;
use crate::entities::{cash_entries, director_ledger_entries, directors, fees, payments, students};

/// Cash entry request, used for create and edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashEntryInput {
    /// Value date.
    pub transaction_date: NaiveDate,
    /// Positive amount.
    pub amount: i64,
    /// Kind of movement.
    pub transaction_type: CashTransactionType,
    /// Free text.
    pub description: Option<String>,
    /// Receipt or voucher number.
    pub reference_id: Option<String>,
    /// Student whose fee this pays (STUDENT_PAID only).
    pub student_id: Option<Uuid>,
    /// Director taking the cash (OWNER_TAKEN only).
    pub director_id: Option<Uuid>,
}

/// A cash entry with everything it posted.
#[derive(Debug, Clone, Serialize)]
pub struct CashPosting {
    /// The journal row.
    pub entry: cash_entries::Model,
    /// The payment it originated, if it pays a fee.
    pub payment: Option<payments::Model>,
    /// The fee it paid, as written.
    pub fee: Option<fees::Model>,
    /// The director ledger mirror, for owner withdrawals.
    pub mirror: Option<director_ledger_entries::Model>,
}

/// Cash journal repository.
#[derive(Debug, Clone)]
pub struct CashbookRepository {
    db: DatabaseConnection,
    tx_timeout: Duration,
}

impl CashbookRepository {
    /// Creates a new cash journal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, tx_timeout: Duration) -> Self {
        Self { db, tx_timeout }
    }

    /// Records a cash entry at the actor's location.
    ///
    /// # Errors
    ///
    /// - `Validation` for a non-positive amount or a link the type does not take
    /// - `NotFound` for a missing student or director
    /// - `NoFeeRecord` if the student owes no active fee
    /// - `FeeAlreadyPaid`, `TerminalFee` or `FeeFrozen` if the fee takes no money
    pub async fn create(
        &self,
        actor: &ActorContext,
        input: CashEntryInput,
    ) -> Result<Committed<CashPosting>, LedgerError> {
        validate_cash_entry(
            input.transaction_type,
            input.amount,
            input.student_id,
            input.director_id,
        )?;

        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            check_links(&txn, &input).await?;
            let fee = match input.student_id {
                Some(student_id) => Some(fee_store::lock_active_fee(&txn, student_id).await?),
                None => None,
            };

            let timestamp = now();
            let entry = cash_entries::ActiveModel {
                id: Set(Uuid::now_v7()),
                location_id: Set(actor.location_id.into_inner()),
                transaction_date: Set(input.transaction_date),
                amount: Set(input.amount),
                transaction_type: Set(input.transaction_type.into()),
                debit_credit: Set(input.transaction_type.debit_credit().into()),
                description: Set(input.description.clone()),
                reference_id: Set(input.reference_id.clone()),
                student_id: Set(input.student_id),
                director_id: Set(input.director_id),
                created_by: Set(actor.user_id.into_inner()),
                created_at: Set(timestamp),
                updated_at: Set(timestamp),
            }
            .insert(&txn)
            .await
            .map_err(db_err)?;

            let mut effects = EffectSet::new();
            effects.invalidate(cashbook_scopes(entry.location_id.into()));

            let (payment, fee) = match fee {
                Some(fee) => {
                    let (payment, posting) = fee_store::apply_money(
                        &txn,
                        fee,
                        entry.amount,
                        PaymentOrigin::Cash(entry.id),
                        &payment_meta(actor, &entry),
                    )
                    .await?;
                    fee_store::note_posting(&txn, &mut effects, &posting).await?;
                    (Some(payment), Some(posting.fee))
                }
                None => (None, None),
            };

            let mirror = sync_mirror(&txn, &entry, None).await?;
            if let Some(director_id) = entry.director_id {
                effects.invalidate(director_scopes(director_id.into()));
            }

            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::CashEntryAdded,
                    "Cash entry",
                    format!("{} of {} recorded", input.transaction_type, entry.amount),
                )
                .with_student(entry.student_id.map(Into::into))
                .with_director(entry.director_id.map(Into::into)),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(
                entry_id = %entry.id,
                location_id = %entry.location_id,
                amount = entry.amount,
                transaction_type = %input.transaction_type,
                "cash entry recorded"
            );
            Ok(effects.commit(CashPosting {
                entry,
                payment,
                fee,
                mirror,
            }))
        })
        .await
    }

    /// Edits a cash entry.
    ///
    /// The same student before and after applies the amount difference as one
    /// adjustment; a changed student moves the payment to the new student's fee.
    /// The director mirror follows the entry.
    pub async fn edit(
        &self,
        actor: &ActorContext,
        entry_id: Uuid,
        input: CashEntryInput,
    ) -> Result<Committed<CashPosting>, LedgerError> {
        validate_cash_entry(
            input.transaction_type,
            input.amount,
            input.student_id,
            input.director_id,
        )?;

        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let entry =
                lock_by_id::<cash_entries::Entity, _>(&txn, EntityKind::CashEntry, entry_id).await?;
            check_links(&txn, &input).await?;
            let payment = originated_payment(&txn, entry.id).await?;
            let mirror = find_mirror(&txn, entry.id).await?;

            let plan = EditPlan::decide(
                PostingLink {
                    student_id: entry.student_id,
                    director_id: None,
                },
                PostingLink {
                    student_id: input.student_id,
                    director_id: None,
                },
                payment.is_some(),
            );

            let mut effects = EffectSet::new();
            effects.invalidate(cashbook_scopes(entry.location_id.into()));
            for director_id in [entry.director_id, input.director_id].into_iter().flatten() {
                effects.invalidate(director_scopes(director_id.into()));
            }

            let previous_amount = entry.amount;
            let mut active: cash_entries::ActiveModel = entry.into();
            active.transaction_date = Set(input.transaction_date);
            active.amount = Set(input.amount);
            active.transaction_type = Set(input.transaction_type.into());
            active.debit_credit = Set(input.transaction_type.debit_credit().into());
            active.description = Set(input.description.clone());
            active.reference_id = Set(input.reference_id.clone());
            active.student_id = Set(input.student_id);
            active.director_id = Set(input.director_id);
            active.updated_at = Set(now());
            let entry = active.update(&txn).await.map_err(db_err)?;

            let (payment, fee) = repost(
                &txn,
                &mut effects,
                plan,
                payment,
                input.amount,
                PaymentOrigin::Cash(entry.id),
                &payment_meta(actor, &entry),
            )
            .await?;
            let mirror = sync_mirror(&txn, &entry, mirror).await?;

            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::CashEntryUpdated,
                    "Cash entry",
                    format!(
                        "{} changed from {previous_amount} to {}",
                        input.transaction_type, entry.amount
                    ),
                )
                .with_student(entry.student_id.map(Into::into))
                .with_director(entry.director_id.map(Into::into)),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(entry_id = %entry.id, amount = entry.amount, "cash entry updated");
            Ok(effects.commit(CashPosting {
                entry,
                payment,
                fee,
                mirror,
            }))
        })
        .await
    }

    /// Deletes a cash entry, reversing its payment and removing its mirror.
    pub async fn delete(
        &self,
        actor: &ActorContext,
        entry_id: Uuid,
    ) -> Result<Committed<()>, LedgerError> {
        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let entry =
                lock_by_id::<cash_entries::Entity, _>(&txn, EntityKind::CashEntry, entry_id).await?;

            let mut effects = EffectSet::new();
            effects.invalidate(cashbook_scopes(entry.location_id.into()));

            if let Some(payment) = originated_payment(&txn, entry.id).await? {
                let posting = fee_store::reverse_money(&txn, payment).await?;
                fee_store::note_posting(&txn, &mut effects, &posting).await?;
            }
            if let Some(mirror) = find_mirror(&txn, entry.id).await? {
                effects.invalidate(director_scopes(mirror.director_id.into()));
                director_ledger_entries::Entity::delete_by_id(mirror.id)
                    .exec(&txn)
                    .await
                    .map_err(db_err)?;
            }
            cash_entries::Entity::delete_by_id(entry.id)
                .exec(&txn)
                .await
                .map_err(db_err)?;

            let transaction_type: CashTransactionType = entry.transaction_type.into();
            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::CashEntryDeleted,
                    "Cash entry",
                    format!("{transaction_type} of {} deleted", entry.amount),
                )
                .with_student(entry.student_id.map(Into::into))
                .with_director(entry.director_id.map(Into::into)),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(%entry_id, "cash entry deleted");
            Ok(effects.commit(()))
        })
        .await
    }

    /// Finds an entry by id.
    pub async fn find(&self, entry_id: Uuid) -> Result<cash_entries::Model, LedgerError> {
        find_by_id::<cash_entries::Entity, _>(&self.db, EntityKind::CashEntry, entry_id).await
    }

    /// Lists a location's cash journal, newest first, with drawer totals over
    /// all rows.
    pub async fn list(
        &self,
        location_id: Uuid,
        page: &PageRequest,
    ) -> Result<JournalPage<cash_entries::Model>, LedgerError> {
        let rows: Vec<(DebitCredit, i64)> = cash_entries::Entity::find()
            .select_only()
            .column(cash_entries::Column::DebitCredit)
            .column(cash_entries::Column::Amount)
            .filter(cash_entries::Column::LocationId.eq(location_id))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let totals = JournalTotals::from_rows(rows.into_iter().map(|(d, a)| (d.into(), a)));

        let query = cash_entries::Entity::find()
            .filter(cash_entries::Column::LocationId.eq(location_id))
            .order_by_desc(cash_entries::Column::TransactionDate)
            .order_by_desc(cash_entries::Column::CreatedAt);
        let page = fetch_page(&self.db, query, page).await?;
        Ok(JournalPage { page, totals })
    }
}

/// Checks that the student and director an entry names exist.
async fn check_links(txn: &DatabaseTransaction, input: &CashEntryInput) -> Result<(), LedgerError> {
    if let Some(student_id) = input.student_id {
        lock_by_id::<students::Entity, _>(txn, EntityKind::Student, student_id).await?;
    }
    if let Some(director_id) = input.director_id {
        find_by_id::<directors::Entity, _>(txn, EntityKind::Director, director_id).await?;
    }
    Ok(())
}

async fn originated_payment(
    txn: &DatabaseTransaction,
    entry_id: Uuid,
) -> Result<Option<payments::Model>, LedgerError> {
    payments::Entity::find()
        .filter(payments::Column::CashEntryId.eq(entry_id))
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_err)
}

fn payment_meta(actor: &ActorContext, entry: &cash_entries::Model) -> PaymentMeta {
    PaymentMeta {
        mode: Some(PaymentMode::Cash),
        transaction_ref: entry.reference_id.clone(),
        note: entry.description.clone(),
        is_advance: false,
        created_by: actor.user_id.into_inner(),
    }
}
