//! Batch Switch Coordinator persistence.
//!
//! A switch moves the student's seat, batch pointer and fee in one
//! transaction under the policy the caller names. The policy string is parsed
//! before anything is read, so an unknown policy changes nothing.

use std::time::Duration;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use tuition_core::ActorContext;
use tuition_core::cache::{fee_scopes, switch_scopes};
use tuition_core::effects::{AuditEvent, AuditEventType, Committed, EffectSet};
use tuition_core::fee::FeeStatus as CoreFeeStatus;
use tuition_core::switch::{OldFeeDisposition, SwitchContext, SwitchPlan, SwitchPlanner, SwitchPolicy};
use tuition_core::{EntityKind, LedgerError};
use tuition_shared::types::TransferId;
use uuid::Uuid;

use super::enrollment::{insert_fee, point_at_batch};
use super::fee_store;
use super::occupancy::{release_seat, reserve_seat};
use super::support::{bounded, db_err, find_by_id, lock_by_id, now};
use crate::entities::sea_orm_active_enums::{FeeStatus, PaymentStatus};
use crate::entities::{bank_transactions, batch_histories, batches, courses, fees, payments, students};

/// Batch switch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSwitchRequest {
    /// Student being moved.
    pub student_id: Uuid,
    /// Batch the caller believes the student is in.
    pub from_batch_id: Uuid,
    /// Destination batch.
    pub to_batch_id: Uuid,
    /// `TRANSFER`, `NEW_FEE` or `SPLIT`.
    pub policy: String,
    /// Why the student is moving.
    pub reason: Option<String>,
}

/// Result of a committed switch.
#[derive(Debug, Clone, Serialize)]
pub struct SwitchOutcome {
    /// History row of the switch.
    pub history: batch_histories::Model,
    /// Student as updated.
    pub student: students::Model,
    /// The fee the student owed before the switch, as written after it.
    pub old_fee: fees::Model,
    /// The fee opened at the destination, if the policy opens one.
    pub new_fee: Option<fees::Model>,
}

/// Batch switch repository.
#[derive(Debug, Clone)]
pub struct BatchSwitchRepository {
    db: DatabaseConnection,
    tx_timeout: Duration,
}

impl BatchSwitchRepository {
    /// Creates a new batch switch repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, tx_timeout: Duration) -> Self {
        Self { db, tx_timeout }
    }

    /// Moves a student to another batch.
    ///
    /// # Errors
    ///
    /// - `UnknownPolicy` for anything other than the three policy names
    /// - `NotFound` if the student does not exist
    /// - `BatchMismatch` if the student is not in `from_batch_id`
    /// - `TargetNotFound` or `BatchFull` for the destination
    /// - `NoActiveFeeAtSource` if the student owes no active fee for the source batch
    pub async fn switch(
        &self,
        actor: &ActorContext,
        request: BatchSwitchRequest,
    ) -> Result<Committed<SwitchOutcome>, LedgerError> {
        let policy: SwitchPolicy = request.policy.parse()?;

        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let student =
                lock_by_id::<students::Entity, _>(&txn, EntityKind::Student, request.student_id)
                    .await?;
            let target = batches::Entity::find_by_id(request.to_batch_id)
                .one(&txn)
                .await
                .map_err(db_err)?;
            SwitchPlanner::check_preconditions(
                student.id,
                student.current_batch_id,
                request.from_batch_id,
                request.to_batch_id,
                target.as_ref().map(batches::Model::seats),
            )?;
            let target = target.ok_or(LedgerError::TargetNotFound(request.to_batch_id))?;
            let source =
                find_by_id::<batches::Entity, _>(&txn, EntityKind::Batch, request.from_batch_id)
                    .await?;

            let old_fee = fee_store::find_active_fee_at(&txn, student.id, source.id)
                .await?
                .ok_or(LedgerError::NoActiveFeeAtSource {
                    student_id: student.id,
                    batch_id: request.from_batch_id,
                })?;
            let paid_on_old = fee_store::paid_total(&txn, old_fee.id).await?;
            let course =
                find_by_id::<courses::Entity, _>(&txn, EntityKind::Course, target.course_id).await?;

            let plan = SwitchPlanner::plan(
                &SwitchContext {
                    policy,
                    old_fee: old_fee.snapshot(),
                    paid_on_old,
                    destination_base_fee: course.base_fee,
                },
                TransferId::new(),
            )?;
            let transfer_id = plan.transfer_id.into_inner();

            release_seat(&txn, source.id).await?;
            reserve_seat(&txn, target.id).await?;

            let mut effects = EffectSet::new();
            let new_fee = match plan.new_fee {
                Some(terms) => {
                    let fee = insert_fee(
                        &txn,
                        student.id,
                        target.id,
                        &terms,
                        Some(transfer_id),
                        request.reason.clone(),
                    )
                    .await?;
                    let fee = carry_over(&txn, &plan, &old_fee, fee).await?;
                    let posting = fee_store::settle(&txn, fee, Some(terms.balance_amount)).await?;
                    if posting.fee.status == FeeStatus::Paid {
                        effects.fee_completed(fee_store::completion_notice(&txn, &posting.fee).await?);
                    }
                    Some(posting.fee)
                }
                None => None,
            };

            if plan.purge_old_dues {
                fee_store::purge_dues(&txn, old_fee.id).await?;
            }
            let old_fee = close_old_fee(&txn, &plan, old_fee).await?;
            let student = point_at_batch(&txn, student, Some(target.id)).await?;

            let history = batch_histories::ActiveModel {
                id: Set(Uuid::now_v7()),
                student_id: Set(student.id),
                from_batch_id: Set(source.id),
                to_batch_id: Set(target.id),
                transfer_id: Set(transfer_id),
                fee_id_from: Set(old_fee.id),
                fee_id_to: Set(plan.fee_id_to(old_fee.id, new_fee.as_ref().map(|f| f.id))),
                policy: Set(policy.into()),
                reason: Set(request.reason.clone()),
                change_date: Set(now()),
                created_by: Set(actor.user_id.into_inner()),
            }
            .insert(&txn)
            .await
            .map_err(db_err)?;

            effects.invalidate(switch_scopes(
                student.id.into(),
                source.id.into(),
                target.id.into(),
                source.location_id.into(),
            ));
            if target.location_id != source.location_id {
                effects.invalidate(fee_scopes(
                    student.id.into(),
                    target.id.into(),
                    target.location_id.into(),
                ));
            }
            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::BatchSwitched,
                    "Batch switch",
                    format!(
                        "{} moved from {} to {} under {policy}",
                        student.name, source.name, target.name
                    ),
                )
                .with_student(Some(student.id.into()))
                .with_batch(Some(target.id.into())),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(
                student_id = %student.id,
                from_batch_id = %source.id,
                to_batch_id = %target.id,
                %policy,
                %transfer_id,
                fee_id_from = %history.fee_id_from,
                fee_id_to = %history.fee_id_to,
                "batch switched"
            );
            Ok(effects.commit(SwitchOutcome {
                history,
                student,
                old_fee,
                new_fee,
            }))
        })
        .await
    }

    /// A student's batch moves, newest first.
    pub async fn history(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<batch_histories::Model>, LedgerError> {
        batch_histories::Entity::find()
            .filter(batch_histories::Column::StudentId.eq(student_id))
            .order_by_desc(batch_histories::Column::ChangeDate)
            .all(&self.db)
            .await
            .map_err(db_err)
    }
}

/// Moves what the plan carries from the old fee onto the new one: PAID
/// payments (and their bank rows) and the recorded advance.
async fn carry_over(
    txn: &DatabaseTransaction,
    plan: &SwitchPlan,
    old_fee: &fees::Model,
    new_fee: fees::Model,
) -> Result<fees::Model, LedgerError> {
    if plan.relink_paid_payments {
        let moved = payments::Entity::update_many()
            .col_expr(payments::Column::FeeId, Expr::value(new_fee.id))
            .col_expr(payments::Column::UpdatedAt, Expr::value(now()))
            .filter(payments::Column::FeeId.eq(old_fee.id))
            .filter(payments::Column::Status.eq(PaymentStatus::Paid))
            .exec(txn)
            .await
            .map_err(db_err)?;
        bank_transactions::Entity::update_many()
            .col_expr(bank_transactions::Column::FeeId, Expr::value(new_fee.id))
            .filter(bank_transactions::Column::FeeId.eq(old_fee.id))
            .exec(txn)
            .await
            .map_err(db_err)?;
        tracing::debug!(
            from_fee_id = %old_fee.id,
            to_fee_id = %new_fee.id,
            moved = moved.rows_affected,
            "paid payments relinked"
        );
    }

    if plan.carry_advance && old_fee.advance_amount.is_some() {
        let mut active: fees::ActiveModel = new_fee.into();
        active.advance_amount = Set(old_fee.advance_amount);
        return active.update(txn).await.map_err(db_err);
    }
    Ok(new_fee)
}

/// Applies the plan's disposition to the old fee.
async fn close_old_fee(
    txn: &DatabaseTransaction,
    plan: &SwitchPlan,
    old_fee: fees::Model,
) -> Result<fees::Model, LedgerError> {
    let (status, frozen) = match plan.old_fee {
        OldFeeDisposition::Keep => return Ok(old_fee),
        OldFeeDisposition::Cancel => (CoreFeeStatus::Cancelled, false),
        OldFeeDisposition::Freeze(status) => (status, true),
    };
    let mut active: fees::ActiveModel = old_fee.into();
    active.status = Set(status.into());
    active.is_locked = Set(frozen);
    active.transfer_id = Set(Some(plan.transfer_id.into_inner()));
    active.updated_at = Set(now());
    active.update(txn).await.map_err(db_err)
}
