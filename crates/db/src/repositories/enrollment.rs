//! Admission and withdrawal: the seat, the student's batch pointer and the fee
//! always change together.

use std::time::Duration;

use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DatabaseTransaction, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tuition_core::ActorContext;
use tuition_core::cache::fee_scopes;
use tuition_core::effects::{AuditEvent, AuditEventType, Committed, EffectSet};
use tuition_core::fee::{FeeStatus as CoreFeeStatus, FeeTerms};
use tuition_core::{EntityKind, LedgerError};
use uuid::Uuid;

use super::fee_store;
use super::occupancy::{release_seat, reserve_seat};
use super::support::{bounded, db_err, find_by_id, lock_by_id, now};
use crate::entities::sea_orm_active_enums::FeeStatus;
use crate::entities::{batches, courses, fees, students};

/// Admission request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admission {
    /// Student being admitted.
    pub student_id: Uuid,
    /// Batch taking the student.
    pub batch_id: Uuid,
    /// Discount off the course base fee.
    #[serde(default)]
    pub discount_amount: i64,
    /// Note stored on the fee.
    pub note: Option<String>,
}

/// Result of an admission.
#[derive(Debug, Clone, Serialize)]
pub struct Admitted {
    /// Student as updated.
    pub student: students::Model,
    /// Fee created for the batch.
    pub fee: fees::Model,
}

/// Result of a withdrawal.
#[derive(Debug, Clone, Serialize)]
pub struct Withdrawn {
    /// Student as updated.
    pub student: students::Model,
    /// Fee closed by the withdrawal, if the student had one.
    pub fee: Option<fees::Model>,
}

/// Enrollment repository.
#[derive(Debug, Clone)]
pub struct EnrollmentRepository {
    db: DatabaseConnection,
    tx_timeout: Duration,
}

impl EnrollmentRepository {
    /// Creates a new enrollment repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, tx_timeout: Duration) -> Self {
        Self { db, tx_timeout }
    }

    /// Admits a student to a batch: takes a seat, points the student at the
    /// batch, and creates the fee from the course base fee.
    ///
    /// # Errors
    ///
    /// - `NotFound` for a missing student, batch or course
    /// - `InvalidState` if the student is already in a batch or still owes an active fee
    /// - `BatchFull` if the batch has no free seat
    pub async fn admit(
        &self,
        actor: &ActorContext,
        input: Admission,
    ) -> Result<Committed<Admitted>, LedgerError> {
        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let student =
                lock_by_id::<students::Entity, _>(&txn, EntityKind::Student, input.student_id)
                    .await?;
            if let Some(current) = student.current_batch_id {
                return Err(LedgerError::InvalidState(format!(
                    "student {} is already enrolled in batch {current}",
                    student.id
                )));
            }
            if let Some(existing) = fee_store::find_active_fee(&txn, student.id, true).await? {
                return Err(LedgerError::InvalidState(format!(
                    "student {} still has active fee {}",
                    student.id, existing.id
                )));
            }

            let batch =
                find_by_id::<batches::Entity, _>(&txn, EntityKind::Batch, input.batch_id).await?;
            let course =
                find_by_id::<courses::Entity, _>(&txn, EntityKind::Course, batch.course_id).await?;
            let terms = FeeTerms::admission(course.base_fee, input.discount_amount)?;

            reserve_seat(&txn, batch.id).await?;
            let fee = insert_fee(&txn, student.id, batch.id, &terms, None, input.note.clone()).await?;
            let student = point_at_batch(&txn, student, Some(batch.id)).await?;

            let mut effects = EffectSet::new();
            effects.invalidate(fee_scopes(
                student.id.into(),
                batch.id.into(),
                batch.location_id.into(),
            ));
            if terms.status == CoreFeeStatus::Paid {
                effects.fee_completed(fee_store::completion_notice(&txn, &fee).await?);
            }
            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::StudentAdmitted,
                    "Admission",
                    format!(
                        "{} admitted to {} with final fee {}",
                        student.name, batch.name, fee.final_fee
                    ),
                )
                .with_student(Some(student.id.into()))
                .with_batch(Some(batch.id.into())),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(
                student_id = %student.id,
                batch_id = %batch.id,
                fee_id = %fee.id,
                final_fee = fee.final_fee,
                "student admitted"
            );
            Ok(effects.commit(Admitted { student, fee }))
        })
        .await
    }

    /// Withdraws a student from their batch: frees the seat, clears the batch
    /// pointer and closes the active fee as INACTIVE.
    pub async fn withdraw(
        &self,
        actor: &ActorContext,
        student_id: Uuid,
    ) -> Result<Committed<Withdrawn>, LedgerError> {
        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let student =
                lock_by_id::<students::Entity, _>(&txn, EntityKind::Student, student_id).await?;
            let batch_id = student.current_batch_id.ok_or_else(|| {
                LedgerError::InvalidState(format!("student {student_id} is not in any batch"))
            })?;
            let batch = find_by_id::<batches::Entity, _>(&txn, EntityKind::Batch, batch_id).await?;

            release_seat(&txn, batch_id).await?;
            let student = point_at_batch(&txn, student, None).await?;

            let fee = match fee_store::find_active_fee(&txn, student_id, true).await? {
                Some(fee) => {
                    fee_store::purge_dues(&txn, fee.id).await?;
                    let mut active: fees::ActiveModel = fee.into();
                    active.status = Set(FeeStatus::Inactive);
                    active.updated_at = Set(now());
                    Some(active.update(&txn).await.map_err(db_err)?)
                }
                None => None,
            };

            let mut effects = EffectSet::new();
            effects.invalidate(fee_scopes(
                student_id.into(),
                batch_id.into(),
                batch.location_id.into(),
            ));
            effects.audit(
                AuditEvent::new(
                    actor,
                    AuditEventType::StudentWithdrawn,
                    "Withdrawal",
                    format!("{} withdrawn from {}", student.name, batch.name),
                )
                .with_student(Some(student_id.into()))
                .with_batch(Some(batch_id.into())),
            );
            txn.commit().await.map_err(db_err)?;

            tracing::info!(%student_id, %batch_id, "student withdrawn");
            Ok(effects.commit(Withdrawn { student, fee }))
        })
        .await
    }
}

/// Inserts a fee row from creation terms.
pub(crate) async fn insert_fee(
    txn: &DatabaseTransaction,
    student_id: Uuid,
    batch_id: Uuid,
    terms: &FeeTerms,
    transfer_id: Option<Uuid>,
    note: Option<String>,
) -> Result<fees::Model, LedgerError> {
    let timestamp = now();
    fees::ActiveModel {
        id: Set(Uuid::now_v7()),
        student_id: Set(student_id),
        batch_id: Set(batch_id),
        total_course_fee: Set(terms.total_course_fee),
        discount_amount: Set(terms.discount_amount),
        carry_over_amount: Set(terms.carry_over_amount),
        final_fee: Set(terms.final_fee),
        balance_amount: Set(Some(terms.balance_amount)),
        advance_amount: Set(None),
        status: Set(terms.status.into()),
        is_locked: Set(false),
        transfer_id: Set(transfer_id),
        note: Set(note),
        created_at: Set(timestamp),
        updated_at: Set(timestamp),
    }
    .insert(txn)
    .await
    .map_err(db_err)
}

/// Updates a student's current batch.
pub(crate) async fn point_at_batch(
    txn: &DatabaseTransaction,
    student: students::Model,
    batch_id: Option<Uuid>,
) -> Result<students::Model, LedgerError> {
    let mut active: students::ActiveModel = student.into();
    active.current_batch_id = Set(batch_id);
    active.updated_at = Set(now());
    active.update(txn).await.map_err(db_err)
}
