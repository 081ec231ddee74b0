//! Director ledgers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tuition_core::cache::CacheKey;
use tuition_db::repositories::DirectorEntryInput;
use uuid::Uuid;

use super::ListQuery;
use crate::{ApiError, AppState, middleware::Actor};

/// Creates the director ledger routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/directors/{director_id}/ledger", get(list_ledger))
        .route("/director-ledger", post(create_entry))
        .route(
            "/director-ledger/{entry_id}",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
}

/// GET `/directors/{director_id}/ledger` - One director's entries with totals.
async fn list_ledger(
    State(state): State<AppState>,
    _actor: Actor,
    Path(director_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page_request();
    let ledger = state.director_ledger();
    let view = state
        .cached(
            CacheKey::DirectorLedger(director_id.into()),
            page.cache_variant(),
            query.fresh,
            ledger.list(director_id, &page),
        )
        .await?;
    Ok(Json(view))
}

/// POST `/director-ledger`
async fn create_entry(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<DirectorEntryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state.director_ledger().create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(state.finish(committed).await)))
}

/// GET `/director-ledger/{entry_id}`
async fn get_entry(
    State(state): State<AppState>,
    _actor: Actor,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.director_ledger().find(entry_id).await?))
}

/// PUT `/director-ledger/{entry_id}`
///
/// Rows mirrored from a cash entry are rejected; edit the cash entry instead.
async fn update_entry(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(entry_id): Path<Uuid>,
    Json(payload): Json<DirectorEntryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state
        .director_ledger()
        .edit(&actor, entry_id, payload)
        .await?;
    Ok(Json(state.finish(committed).await))
}

/// DELETE `/director-ledger/{entry_id}`
async fn delete_entry(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state.director_ledger().delete(&actor, entry_id).await?;
    state.finish(committed).await;
    Ok(StatusCode::NO_CONTENT)
}
