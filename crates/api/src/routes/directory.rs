//! Locations, courses, batches, students and directors.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tuition_core::cache::CacheKey;
use tuition_db::repositories::{NewBatch, NewCourse, NewStudent};
use uuid::Uuid;
use validator::Validate;

use super::ListQuery;
use crate::{ApiError, AppState, middleware::Actor};

/// Creates the directory routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/locations", post(create_location))
        .route("/courses", post(create_course))
        .route("/batches", post(create_batch))
        .route("/batches/{batch_id}", get(get_batch))
        .route("/batches/{batch_id}/seats", get(get_seats))
        .route("/batches/{batch_id}/roster", get(get_roster))
        .route("/students", post(create_student))
        .route("/students/{student_id}", get(get_student))
        .route("/directors", post(create_director))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for creating a location.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLocationRequest {
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

/// Request body for creating a course.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Fee before discounts.
    #[validate(range(min = 0))]
    pub base_fee: i64,
}

/// Request body for creating a batch.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBatchRequest {
    /// Course taught.
    pub course_id: Uuid,
    /// Location it runs at; defaults to the actor's location.
    pub location_id: Option<Uuid>,
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Seats available.
    #[validate(range(min = 1))]
    pub slot_limit: i32,
}

/// Request body for creating a student.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    /// Full name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Contact email.
    #[validate(email)]
    pub email: Option<String>,
    /// Contact phone.
    #[validate(length(min = 6, max = 20))]
    pub phone: Option<String>,
    /// Home location; defaults to the actor's location.
    pub location_id: Option<Uuid>,
}

/// Request body for creating a director.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDirectorRequest {
    /// Full name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Contact email.
    #[validate(email)]
    pub email: Option<String>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/locations`
async fn create_location(
    State(state): State<AppState>,
    _actor: Actor,
    Json(payload): Json<CreateLocationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let location = state.directory().create_location(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// POST `/courses`
async fn create_course(
    State(state): State<AppState>,
    _actor: Actor,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let course = state
        .directory()
        .create_course(NewCourse {
            name: payload.name,
            base_fee: payload.base_fee,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// POST `/batches`
async fn create_batch(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<CreateBatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let batch = state
        .directory()
        .create_batch(NewBatch {
            course_id: payload.course_id,
            location_id: payload
                .location_id
                .unwrap_or_else(|| actor.location_id.into_inner()),
            name: payload.name,
            slot_limit: payload.slot_limit,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// GET `/batches/{batch_id}`
async fn get_batch(
    State(state): State<AppState>,
    _actor: Actor,
    Path(batch_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.directory().batch(batch_id).await?))
}

/// GET `/batches/{batch_id}/seats`
async fn get_seats(
    State(state): State<AppState>,
    _actor: Actor,
    Path(batch_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.occupancy().seats(batch_id).await?))
}

/// GET `/batches/{batch_id}/roster`
async fn get_roster(
    State(state): State<AppState>,
    _actor: Actor,
    Path(batch_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let directory = state.directory();
    let view = state
        .cached(
            CacheKey::BatchRoster(batch_id.into()),
            "all".to_string(),
            query.fresh,
            directory.roster(batch_id),
        )
        .await?;
    Ok(Json(view))
}

/// POST `/students`
async fn create_student(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let student = state
        .directory()
        .create_student(NewStudent {
            location_id: payload
                .location_id
                .unwrap_or_else(|| actor.location_id.into_inner()),
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// GET `/students/{student_id}`
async fn get_student(
    State(state): State<AppState>,
    _actor: Actor,
    Path(student_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.directory().student(student_id).await?))
}

/// POST `/directors`
async fn create_director(
    State(state): State<AppState>,
    _actor: Actor,
    Json(payload): Json<CreateDirectorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()?;
    let director = state
        .directory()
        .create_director(&payload.name, payload.email)
        .await?;
    Ok((StatusCode::CREATED, Json(director)))
}
