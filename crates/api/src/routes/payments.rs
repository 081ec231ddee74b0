//! Direct payments and scheduled dues.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use tuition_db::repositories::{DueInput, DueSettlement, DueUpdate, PaymentInput};
use uuid::Uuid;

use crate::{ApiError, AppState, middleware::Actor};

/// Creates the payment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments", post(record_payment))
        .route(
            "/payments/{payment_id}",
            get(get_payment).put(update_payment).delete(delete_payment),
        )
        .route("/dues", post(create_due))
        .route("/dues/{payment_id}", put(update_due).delete(delete_due))
        .route("/dues/{payment_id}/settle", post(settle_due))
}

/// POST `/payments`
async fn record_payment(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<PaymentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state.payments().record(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(state.finish(committed).await)))
}

/// GET `/payments/{payment_id}`
async fn get_payment(
    State(state): State<AppState>,
    _actor: Actor,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.payments().find(payment_id).await?))
}

/// PUT `/payments/{payment_id}`
///
/// Payments posted by the cash journal or a director ledger are rejected.
async fn update_payment(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(payment_id): Path<Uuid>,
    Json(payload): Json<PaymentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state.payments().edit(&actor, payment_id, payload).await?;
    Ok(Json(state.finish(committed).await))
}

/// DELETE `/payments/{payment_id}`
async fn delete_payment(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state.payments().delete(&actor, payment_id).await?;
    state.finish(committed).await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/dues`
async fn create_due(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<DueInput>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state.payments().create_due(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(state.finish(committed).await)))
}

/// PUT `/dues/{payment_id}`
async fn update_due(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(payment_id): Path<Uuid>,
    Json(payload): Json<DueUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state
        .payments()
        .edit_due(&actor, payment_id, payload)
        .await?;
    Ok(Json(state.finish(committed).await))
}

/// DELETE `/dues/{payment_id}`
async fn delete_due(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state.payments().delete_due(&actor, payment_id).await?;
    state.finish(committed).await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/dues/{payment_id}/settle`
async fn settle_due(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(payment_id): Path<Uuid>,
    Json(payload): Json<DueSettlement>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state
        .payments()
        .settle_due(&actor, payment_id, payload)
        .await?;
    Ok(Json(state.finish(committed).await))
}
