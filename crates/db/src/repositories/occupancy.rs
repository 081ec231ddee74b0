//! Batch occupancy repository.
//!
//! Seat changes are single conditional updates, so the capacity check and the
//! increment are one atomic step in the store. Two admissions racing for the
//! last seat cannot both succeed.

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tuition_core::occupancy::SeatCount;
use tuition_core::{EntityKind, LedgerError};
use uuid::Uuid;

use super::support::{db_err, find_by_id, now};
use crate::entities::batches;

/// Takes one seat in a batch.
///
/// # Errors
///
/// `NotFound` if the batch does not exist, `BatchFull` if no seat is free.
pub(crate) async fn reserve_seat<C: ConnectionTrait>(
    conn: &C,
    batch_id: Uuid,
) -> Result<(), LedgerError> {
    let result = batches::Entity::update_many()
        .col_expr(
            batches::Column::CurrentCount,
            Expr::col(batches::Column::CurrentCount).add(1),
        )
        .col_expr(batches::Column::UpdatedAt, Expr::value(now()))
        .filter(batches::Column::Id.eq(batch_id))
        .filter(Expr::col(batches::Column::CurrentCount).lt(Expr::col(batches::Column::SlotLimit)))
        .exec(conn)
        .await
        .map_err(db_err)?;

    if result.rows_affected == 0 {
        let batch = find_by_id::<batches::Entity, _>(conn, EntityKind::Batch, batch_id).await?;
        return Err(LedgerError::BatchFull {
            batch_id,
            slot_limit: batch.slot_limit,
        });
    }
    tracing::debug!(%batch_id, "seat reserved");
    Ok(())
}

/// Frees one seat in a batch.
///
/// # Errors
///
/// `NotFound` if the batch does not exist, `ConsistencyViolation` if its count
/// is already zero.
pub(crate) async fn release_seat<C: ConnectionTrait>(
    conn: &C,
    batch_id: Uuid,
) -> Result<(), LedgerError> {
    let result = batches::Entity::update_many()
        .col_expr(
            batches::Column::CurrentCount,
            Expr::col(batches::Column::CurrentCount).sub(1),
        )
        .col_expr(batches::Column::UpdatedAt, Expr::value(now()))
        .filter(batches::Column::Id.eq(batch_id))
        .filter(batches::Column::CurrentCount.gt(0))
        .exec(conn)
        .await
        .map_err(db_err)?;

    if result.rows_affected == 0 {
        let batch = find_by_id::<batches::Entity, _>(conn, EntityKind::Batch, batch_id).await?;
        // Surfaces the same error the domain model raises for an empty batch.
        batch.seats().release()?;
    }
    tracing::debug!(%batch_id, "seat released");
    Ok(())
}

/// Batch Occupancy Tracker.
///
/// Read-only: seats only move inside admission, withdrawal and switch
/// transactions, together with the student's batch pointer.
#[derive(Debug, Clone)]
pub struct OccupancyRepository {
    db: DatabaseConnection,
}

impl OccupancyRepository {
    /// Creates a new occupancy repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Current seat figures of a batch.
    pub async fn seats(&self, batch_id: Uuid) -> Result<SeatCount, LedgerError> {
        let batch = find_by_id::<batches::Entity, _>(&self.db, EntityKind::Batch, batch_id).await?;
        Ok(batch.seats())
    }
}
