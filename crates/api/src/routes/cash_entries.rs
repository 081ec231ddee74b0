//! Location cash journal.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tuition_core::cache::CacheKey;
use tuition_db::repositories::CashEntryInput;
use uuid::Uuid;

use super::ListQuery;
use crate::{ApiError, AppState, middleware::Actor};

/// Creates the cash journal routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cash-entries", get(list_entries).post(create_entry))
        .route(
            "/cash-entries/{entry_id}",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
}

/// GET `/cash-entries` - The actor's location journal with totals.
async fn list_entries(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page_request();
    let location_id = actor.location_id.into_inner();
    let cashbook = state.cashbook();
    let view = state
        .cached(
            CacheKey::LocationCashbook(actor.location_id),
            page.cache_variant(),
            query.fresh,
            cashbook.list(location_id, &page),
        )
        .await?;
    Ok(Json(view))
}

/// POST `/cash-entries`
async fn create_entry(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<CashEntryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state.cashbook().create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(state.finish(committed).await)))
}

/// GET `/cash-entries/{entry_id}`
async fn get_entry(
    State(state): State<AppState>,
    _actor: Actor,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.cashbook().find(entry_id).await?))
}

/// PUT `/cash-entries/{entry_id}`
async fn update_entry(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(entry_id): Path<Uuid>,
    Json(payload): Json<CashEntryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state.cashbook().edit(&actor, entry_id, payload).await?;
    Ok(Json(state.finish(committed).await))
}

/// DELETE `/cash-entries/{entry_id}`
async fn delete_entry(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state.cashbook().delete(&actor, entry_id).await?;
    state.finish(committed).await;
    Ok(StatusCode::NO_CONTENT)
}
