//! Plumbing shared by the ledger repositories.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QuerySelect, Select};
use serde::Serialize;
use tuition_core::posting::DebitCredit;
use tuition_core::{EntityKind, LedgerError};
use tuition_shared::types::{PageRequest, PageResponse};
use uuid::Uuid;

/// Maps a storage error into the ledger taxonomy.
pub(crate) fn db_err(err: DbErr) -> LedgerError {
    LedgerError::Database(err.to_string())
}

/// Current time as stored in timestamp columns.
pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().fixed_offset()
}

/// Runs one transactional unit of work under a deadline.
///
/// On expiry the work future is dropped together with its open transaction,
/// which rolls it back, and `Timeout` is returned.
pub(crate) async fn bounded<T, F>(limit: Duration, work: F) -> Result<T, LedgerError>
where
    F: Future<Output = Result<T, LedgerError>>,
{
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = limit.as_millis(), "ledger transaction timed out");
            Err(LedgerError::Timeout(limit.as_millis()))
        }
    }
}

/// Loads a row by id with an exclusive row lock.
pub(crate) async fn lock_by_id<E, C>(
    conn: &C,
    entity: EntityKind,
    id: Uuid,
) -> Result<E::Model, LedgerError>
where
    E: EntityTrait,
    E::PrimaryKey: sea_orm::PrimaryKeyTrait<ValueType = Uuid>,
    C: ConnectionTrait,
{
    E::find_by_id(id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::not_found(entity, id))
}

/// Loads a row by id without locking.
pub(crate) async fn find_by_id<E, C>(
    conn: &C,
    entity: EntityKind,
    id: Uuid,
) -> Result<E::Model, LedgerError>
where
    E: EntityTrait,
    E::PrimaryKey: sea_orm::PrimaryKeyTrait<ValueType = Uuid>,
    C: ConnectionTrait,
{
    E::find_by_id(id)
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::not_found(entity, id))
}

/// Runs a select one page at a time.
pub(crate) async fn fetch_page<E, C>(
    conn: &C,
    query: Select<E>,
    page: &PageRequest,
) -> Result<PageResponse<E::Model>, LedgerError>
where
    E: EntityTrait,
    E::Model: Send + Sync + 'static,
    C: ConnectionTrait,
{
    let page = page.normalized();
    let total = query.clone().count(conn).await.map_err(db_err)?;
    let rows = query
        .offset(page.offset())
        .limit(page.limit())
        .all(conn)
        .await
        .map_err(db_err)?;
    Ok(PageResponse::new(rows, page.page, page.per_page, total))
}

/// Credit and debit totals of a journal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JournalTotals {
    /// Sum of credit rows.
    pub total_credit: i64,
    /// Sum of debit rows.
    pub total_debit: i64,
    /// Credit minus debit.
    pub net: i64,
}

impl JournalTotals {
    /// Folds `(direction, amount)` rows into totals.
    pub fn from_rows(rows: impl IntoIterator<Item = (DebitCredit, i64)>) -> Self {
        rows.into_iter()
            .fold(Self::default(), |mut totals, (direction, amount)| {
                match direction {
                    DebitCredit::Credit => totals.total_credit += amount,
                    DebitCredit::Debit => totals.total_debit += amount,
                }
                totals.net += direction.signed(amount);
                totals
            })
    }
}

/// A page of journal rows plus totals over the whole journal.
#[derive(Debug, Clone, Serialize)]
pub struct JournalPage<T> {
    /// The requested page.
    #[serde(flatten)]
    pub page: PageResponse<T>,
    /// Totals over every row, not just this page.
    pub totals: JournalTotals,
}
