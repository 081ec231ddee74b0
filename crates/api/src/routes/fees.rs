//! Fee reads and corrections.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{ApiError, AppState, middleware::Actor};

/// Creates the fee routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/fees/{fee_id}", get(get_fee))
        .route("/fees/{fee_id}/discount", put(apply_discount))
        .route("/fees/{fee_id}/recompute", post(recompute))
}

/// Request body for changing a fee's discount.
#[derive(Debug, Deserialize, Validate)]
pub struct DiscountRequest {
    /// New discount off the course total.
    #[validate(range(min = 0))]
    pub discount_amount: i64,
}

/// A fee with its paid total.
#[derive(Debug, Serialize)]
pub struct FeeResponse {
    /// The fee row.
    #[serde(flatten)]
    pub fee: tuition_db::entities::fees::Model,
    /// Sum of PAID payments linked to it.
    pub paid_total: i64,
}

/// GET `/fees/{fee_id}`
async fn get_fee(
    State(state): State<AppState>,
    _actor: Actor,
    Path(fee_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let fees = state.fees();
    let fee = fees.find_fee(fee_id).await?;
    let paid_total = fees.paid_total(fee_id).await?;
    Ok(Json(FeeResponse { fee, paid_total }))
}

/// PUT `/fees/{fee_id}/discount`
async fn apply_discount(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(fee_id): Path<Uuid>,
    Json(payload): Json<DiscountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let committed = state
        .fees()
        .apply_discount(&actor, fee_id, payload.discount_amount)
        .await?;
    Ok(Json(state.finish(committed).await))
}

/// POST `/fees/{fee_id}/recompute`
///
/// Rebuilds the balance from the fee's PAID payments.
async fn recompute(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(fee_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state.fees().recompute(&actor, fee_id).await?;
    Ok(Json(state.finish(committed).await))
}
