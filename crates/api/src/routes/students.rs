//! Admission, withdrawal, batch switches and per-student views.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tuition_core::cache::CacheKey;
use tuition_db::repositories::{Admission, BatchSwitchRequest};
use uuid::Uuid;
use validator::Validate;

use super::ListQuery;
use crate::{ApiError, AppState, middleware::Actor};

/// Creates the student routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/students/{student_id}/admission", post(admit))
        .route("/students/{student_id}/withdrawal", post(withdraw))
        .route("/students/{student_id}/switch", post(switch_batch))
        .route("/students/{student_id}/fees", get(list_fees))
        .route("/students/{student_id}/payments", get(list_payments))
        .route("/students/{student_id}/history", get(list_history))
        .route("/students/{student_id}/logs", get(list_logs))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for admitting a student.
#[derive(Debug, Deserialize, Validate)]
pub struct AdmissionRequest {
    /// Batch to join.
    pub batch_id: Uuid,
    /// Discount off the course base fee.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub discount_amount: i64,
    /// Free text stored on the fee.
    pub note: Option<String>,
}

/// Request body for switching batches.
#[derive(Debug, Deserialize, Validate)]
pub struct SwitchRequest {
    /// Batch the student is in now.
    pub from_batch_id: Uuid,
    /// Destination batch.
    pub to_batch_id: Uuid,
    /// `TRANSFER`, `NEW_FEE` or `SPLIT`.
    #[validate(length(min = 1))]
    pub policy: String,
    /// Why the student is moving.
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/students/{student_id}/admission`
async fn admit(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(student_id): Path<Uuid>,
    Json(payload): Json<AdmissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let committed = state
        .enrollment()
        .admit(
            &actor,
            Admission {
                student_id,
                batch_id: payload.batch_id,
                discount_amount: payload.discount_amount,
                note: payload.note,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(state.finish(committed).await)))
}

/// POST `/students/{student_id}/withdrawal`
async fn withdraw(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(student_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let committed = state.enrollment().withdraw(&actor, student_id).await?;
    Ok(Json(state.finish(committed).await))
}

/// POST `/students/{student_id}/switch`
async fn switch_batch(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(student_id): Path<Uuid>,
    Json(payload): Json<SwitchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let committed = state
        .switches()
        .switch(
            &actor,
            BatchSwitchRequest {
                student_id,
                from_batch_id: payload.from_batch_id,
                to_batch_id: payload.to_batch_id,
                policy: payload.policy,
                reason: payload.reason,
            },
        )
        .await?;
    Ok(Json(state.finish(committed).await))
}

/// GET `/students/{student_id}/fees`
async fn list_fees(
    State(state): State<AppState>,
    _actor: Actor,
    Path(student_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let fees = state.fees();
    let view = state
        .cached(
            CacheKey::StudentFees(student_id.into()),
            "all".to_string(),
            query.fresh,
            fees.list_student_fees(student_id),
        )
        .await?;
    Ok(Json(view))
}

/// GET `/students/{student_id}/payments`
///
/// Paid payments and scheduled dues, newest first.
async fn list_payments(
    State(state): State<AppState>,
    _actor: Actor,
    Path(student_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page_request();
    let payments = state.payments();
    let view = state
        .cached(
            CacheKey::StudentPayments(student_id.into()),
            page.cache_variant(),
            query.fresh,
            payments.list(student_id, &page),
        )
        .await?;
    Ok(Json(view))
}

/// GET `/students/{student_id}/history`
async fn list_history(
    State(state): State<AppState>,
    _actor: Actor,
    Path(student_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let switches = state.switches();
    let view = state
        .cached(
            CacheKey::StudentHistory(student_id.into()),
            "all".to_string(),
            query.fresh,
            switches.history(student_id),
        )
        .await?;
    Ok(Json(view))
}

/// GET `/students/{student_id}/logs`
async fn list_logs(
    State(state): State<AppState>,
    _actor: Actor,
    Path(student_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page_request();
    Ok(Json(state.logs().list_for_student(student_id, &page).await?))
}
