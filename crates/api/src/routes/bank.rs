//! Bank accounts and manual bank transactions.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use tuition_core::cache::CacheKey;
use tuition_db::repositories::{CreateBankAccount, ManualBankTransaction};
use uuid::Uuid;

use super::ListQuery;
use crate::{ApiError, AppState, middleware::Actor};

/// Creates the bank routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bank-accounts", get(list_accounts).post(create_account))
        .route(
            "/bank-accounts/{account_id}/transactions",
            get(list_transactions),
        )
        .route("/bank-transactions", post(create_manual))
        .route(
            "/bank-transactions/{transaction_id}",
            put(update_manual).delete(delete_manual),
        )
}

/// GET `/bank-accounts`
async fn list_accounts(
    State(state): State<AppState>,
    _actor: Actor,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let bank = state.bank();
    let view = state
        .cached(
            CacheKey::BankAccounts,
            "accounts".to_string(),
            query.fresh,
            bank.list_accounts(),
        )
        .await?;
    Ok(Json(view))
}

/// POST `/bank-accounts`
async fn create_account(
    State(state): State<AppState>,
    _actor: Actor,
    Json(payload): Json<CreateBankAccount>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state.bank().create_account(payload).await?;
    Ok((StatusCode::CREATED, Json(state.finish(committed).await)))
}

/// GET `/bank-accounts/{account_id}/transactions`
async fn list_transactions(
    State(state): State<AppState>,
    _actor: Actor,
    Path(account_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page_request();
    let bank = state.bank();
    let view = state
        .cached(
            CacheKey::BankAccounts,
            format!("{account_id}:{}", page.cache_variant()),
            query.fresh,
            bank.list_transactions(account_id, &page),
        )
        .await?;
    Ok(Json(view))
}

/// POST `/bank-transactions` - Manual income or expense.
async fn create_manual(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<ManualBankTransaction>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state.bank().create_manual(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(state.finish(committed).await)))
}

/// PUT `/bank-transactions/{transaction_id}`
async fn update_manual(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<ManualBankTransaction>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state
        .bank()
        .edit_manual(&actor, transaction_id, payload)
        .await?;
    Ok(Json(state.finish(committed).await))
}

/// DELETE `/bank-transactions/{transaction_id}`
async fn delete_manual(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state
        .bank()
        .delete_manual(&actor, transaction_id)
        .await?;
    state.finish(committed).await;
    Ok(StatusCode::NO_CONTENT)
}
