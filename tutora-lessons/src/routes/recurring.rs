use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use tutora_shared::errors::{AppError, AppResult, ErrorCode};
use tutora_shared::middleware::AdminUser;
use tutora_shared::types::api::ApiResponse;
use tutora_shared::types::auth::AuthUser;

use crate::events::publisher;
use crate::models::{Booking, Frequency, RecurringPattern};
use crate::services::recurrence::{self, CreateSeriesInput};
use crate::AppState;

const DEFAULT_DURATION_MINUTES: i32 = 60;

// --- Request / Response types ---

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSeriesRequest {
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    #[validate(length(min = 1, max = 150))]
    pub class_title: String,
    #[validate(length(max = 150))]
    pub topic: Option<String>,
    pub start_time: DateTime<Utc>,
    pub frequency: String,
    pub occurrences: Option<u32>,
    pub end_date: Option<DateTime<Utc>>,
    pub days_of_week: Option<Vec<i32>>,
    #[validate(range(min = 15, max = 480))]
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct CreateSeriesResponse {
    pub recurring_pattern: RecurringPattern,
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Deserialize)]
pub struct CancelSeriesRequest {
    #[serde(default = "default_cancel_future")]
    pub cancel_future: bool,
    pub reason: Option<String>,
}

fn default_cancel_future() -> bool { true }

#[derive(Debug, Serialize)]
pub struct CancelSeriesResponse {
    pub pattern: RecurringPattern,
    pub cancelled_bookings: usize,
}

#[derive(Debug, Serialize)]
pub struct SeriesDetailResponse {
    pub pattern: RecurringPattern,
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Serialize)]
pub struct DeleteSeriesResponse {
    pub deleted_bookings: usize,
}

// --- Create recurring series ---

pub async fn create_series(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateSeriesRequest>,
) -> AppResult<Json<ApiResponse<CreateSeriesResponse>>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let frequency: Frequency = body
        .frequency
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e))?;

    let occurrences = match (body.occurrences, body.end_date) {
        (Some(n), _) => n as usize,
        (None, Some(end)) => recurrence::occurrences_until(
            body.start_time,
            frequency,
            end,
            body.days_of_week.as_deref(),
        ),
        (None, None) => {
            return Err(AppError::new(
                ErrorCode::ValidationError,
                "either 'occurrences' or 'end_date' is required",
            ));
        }
    };

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let (pattern, bookings) = conn
        .transaction::<(RecurringPattern, Vec<Booking>), AppError, _>(|conn| {
            recurrence::create_series(
                conn,
                CreateSeriesInput {
                    teacher_id: body.teacher_id,
                    student_id: body.student_id,
                    class_title: body.class_title.clone(),
                    topic: body.topic.clone(),
                    start_time: body.start_time,
                    frequency,
                    occurrences,
                    days_of_week: body.days_of_week.clone(),
                    duration_minutes: body.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
                },
                &user,
            )
        })?;

    publisher::publish_series_created(
        &state.rabbitmq,
        pattern.id,
        pattern.teacher_id,
        pattern.student_id,
        bookings.len(),
        user.id,
    )
    .await;

    Ok(Json(ApiResponse::ok(CreateSeriesResponse {
        recurring_pattern: pattern,
        bookings,
    })))
}

// --- Get series detail ---

pub async fn get_series(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(pattern_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SeriesDetailResponse>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let pattern = recurrence::load_pattern(&mut conn, pattern_id)?;
    let bookings = recurrence::series_bookings(&mut conn, pattern_id)?;

    Ok(Json(ApiResponse::ok(SeriesDetailResponse { pattern, bookings })))
}

// --- Cancel series ---

pub async fn cancel_series(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(pattern_id): Path<Uuid>,
    Json(body): Json<CancelSeriesRequest>,
) -> AppResult<Json<ApiResponse<CancelSeriesResponse>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let (pattern, cancelled_bookings) = conn
        .transaction::<(RecurringPattern, usize), AppError, _>(|conn| {
            recurrence::cancel_series(conn, pattern_id, body.cancel_future)
        })?;

    if let Some(reason) = body.reason.as_deref() {
        tracing::info!(pattern_id = %pattern.id, reason = %reason, "series cancellation reason");
    }

    publisher::publish_series_cancelled(&state.rabbitmq, pattern.id, cancelled_bookings).await;

    Ok(Json(ApiResponse::ok(CancelSeriesResponse {
        pattern,
        cancelled_bookings,
    })))
}

// --- Delete series (administrative, removes linked bookings) ---

pub async fn delete_series(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(pattern_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DeleteSeriesResponse>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let deleted_bookings = conn.transaction::<usize, AppError, _>(|conn| {
        recurrence::delete_series(conn, pattern_id)
    })?;

    Ok(Json(ApiResponse::ok(DeleteSeriesResponse { deleted_bookings })))
}
