//! Fee Ledger Store: fee reads and the fee-level operations that are not tied
//! to a posting source.

use std::time::Duration;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tuition_core::ActorContext;
use tuition_core::effects::{AuditEvent, AuditEventType, Committed, EffectSet};
use tuition_core::fee::FeeLedger;
use tuition_core::{EntityKind, LedgerError};
use uuid::Uuid;

use super::fee_store::{self, FeePosting};
use super::support::{bounded, db_err, find_by_id, now};
use crate::entities::{fees, payments};

/// Fee Ledger Store repository.
#[derive(Debug, Clone)]
pub struct FeeLedgerRepository {
    db: DatabaseConnection,
    tx_timeout: Duration,
}

impl FeeLedgerRepository {
    /// Creates a new fee ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, tx_timeout: Duration) -> Self {
        Self { db, tx_timeout }
    }

    /// Finds a fee by id.
    pub async fn find_fee(&self, fee_id: Uuid) -> Result<fees::Model, LedgerError> {
        find_by_id::<fees::Entity, _>(&self.db, EntityKind::Fee, fee_id).await
    }

    /// The fee a student currently owes against, if any.
    pub async fn active_fee(&self, student_id: Uuid) -> Result<Option<fees::Model>, LedgerError> {
        fee_store::find_active_fee(&self.db, student_id, false).await
    }

    /// All fees of a student, newest first, terminal ones included.
    pub async fn list_student_fees(&self, student_id: Uuid) -> Result<Vec<fees::Model>, LedgerError> {
        fees::Entity::find()
            .filter(fees::Column::StudentId.eq(student_id))
            .order_by_desc(fees::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Payments and dues of a student, newest first.
    pub async fn list_student_payments(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<payments::Model>, LedgerError> {
        payments::Entity::find()
            .filter(payments::Column::StudentId.eq(student_id))
            .order_by_desc(payments::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Sum of the PAID payments linked to a fee.
    pub async fn paid_total(&self, fee_id: Uuid) -> Result<i64, LedgerError> {
        fee_store::paid_total(&self.db, fee_id).await
    }

    /// Sets the discount of a fee and rebuilds its final fee and balance.
    ///
    /// Scheduled dues are dropped, since they were planned against the old
    /// amount. A discount that clears the balance completes the fee.
    pub async fn apply_discount(
        &self,
        actor: &ActorContext,
        fee_id: Uuid,
        discount_amount: i64,
    ) -> Result<Committed<FeePosting>, LedgerError> {
        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let fee = fee_store::lock_fee(&txn, fee_id).await?;
            let paid = fee_store::paid_total(&txn, fee_id).await?;
            let (final_fee, _) = FeeLedger::with_discount(&fee.snapshot(), discount_amount, paid)?;

            let previous_discount = fee.discount_amount;
            let mut active: fees::ActiveModel = fee.into();
            active.discount_amount = Set(discount_amount);
            active.final_fee = Set(final_fee);
            active.updated_at = Set(now());
            let fee = active.update(&txn).await.map_err(db_err)?;

            fee_store::purge_dues(&txn, fee_id).await?;
            let posting = fee_store::settle(&txn, fee, None).await?;

            let mut effects = EffectSet::new();
            fee_store::note_posting(&txn, &mut effects, &posting).await?;
            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::FeeUpdated,
                    "Fee discount",
                    format!(
                        "discount changed from {previous_discount} to {discount_amount}, final fee {final_fee}"
                    ),
                )
                .with_student(Some(posting.fee.student_id.into()))
                .with_batch(Some(posting.fee.batch_id.into())),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(
                %fee_id,
                discount_amount,
                balance = posting.update.new_balance,
                "fee discount applied"
            );
            Ok(effects.commit(posting))
        })
        .await
    }

    /// Rebuilds a fee's balance from its PAID payments.
    pub async fn recompute(
        &self,
        actor: &ActorContext,
        fee_id: Uuid,
    ) -> Result<Committed<FeePosting>, LedgerError> {
        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let fee = fee_store::lock_fee(&txn, fee_id).await?;
            let before = fee.balance_amount;
            let posting = fee_store::settle(&txn, fee, None).await?;

            let mut effects = EffectSet::new();
            fee_store::note_posting(&txn, &mut effects, &posting).await?;
            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::FeeRecomputed,
                    "Fee recomputed",
                    format!(
                        "balance {} recomputed to {}",
                        before.map_or_else(|| "unset".to_string(), |b| b.to_string()),
                        posting.update.new_balance
                    ),
                )
                .with_student(Some(posting.fee.student_id.into())),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(%fee_id, balance = posting.update.new_balance, "fee recomputed");
            Ok(effects.commit(posting))
        })
        .await
    }
}
