use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use tutora_shared::errors::{AppError, AppResult};
use tutora_shared::middleware::AdminUser;
use tutora_shared::types::api::ApiResponse;
use tutora_shared::types::auth::{AuthUser, UserRole};
use tutora_shared::types::pagination::{Paginated, PaginationParams};

use crate::events::publisher;
use crate::models::{Booking, BookingStatus, NewBooking};
use crate::schema::bookings;
use crate::services::lifecycle;
use crate::AppState;

// --- Request types ---

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    #[validate(length(min = 1, max = 150))]
    pub class_title: String,
    #[validate(length(max = 150))]
    pub topic: Option<String>,
    pub scheduled_time: DateTime<Utc>,
    #[validate(range(min = 15, max = 480))]
    pub duration_minutes: i32,
}

#[derive(Debug, Deserialize)]
pub struct BookingFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<String>,
    pub teacher_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl BookingFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

// --- Create booking ---
//
// No payment or credit side effects at creation time; those happen only
// when the lesson is completed.

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateBookingRequest>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let teacher = lifecycle::load_teacher(&mut conn, body.teacher_id)?;
    let student = lifecycle::load_student(&mut conn, body.student_id)?;

    // A slot confirmed by the teacher or an admin starts accepted; a
    // student request waits for the teacher.
    let initial_status = match user.role {
        UserRole::Admin | UserRole::Teacher => BookingStatus::Accepted,
        UserRole::Student => BookingStatus::Pending,
    };

    let booking: Booking = diesel::insert_into(bookings::table)
        .values(&NewBooking {
            teacher_id: teacher.id,
            student_id: student.id,
            class_title: body.class_title,
            topic: body.topic,
            scheduled_time: body.scheduled_time,
            duration_minutes: body.duration_minutes,
            status: initial_status.as_str().to_string(),
            created_by_role: user.role.to_string(),
            created_by: user.id,
            recurring_pattern_id: None,
        })
        .get_result(&mut conn)?;

    publisher::publish_booking_created(
        &state.rabbitmq,
        booking.id,
        booking.teacher_id,
        booking.student_id,
        booking.scheduled_time,
        user.id,
    )
    .await;

    Ok(Json(ApiResponse::ok(booking)))
}

// --- Get booking ---

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let booking = lifecycle::load_booking(&mut conn, booking_id)?;
    Ok(Json(ApiResponse::ok(booking)))
}

// --- Accept / reject a requested booking ---

pub async fn accept_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    respond(state, user, booking_id, true).await
}

pub async fn reject_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    respond(state, user, booking_id, false).await
}

async fn respond(
    state: Arc<AppState>,
    user: AuthUser,
    booking_id: Uuid,
    accept: bool,
) -> AppResult<Json<ApiResponse<Booking>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let booking = lifecycle::load_booking(&mut conn, booking_id)?;

    // Only the booked teacher or an admin may answer the request.
    match user.role {
        UserRole::Admin => {}
        UserRole::Teacher if user.id == booking.teacher_id => {}
        _ => {
            return Err(AppError::forbidden(
                "only the booked teacher or an admin can answer this request",
            ));
        }
    }

    let updated = lifecycle::respond_to_booking(&mut conn, booking_id, accept)?;
    Ok(Json(ApiResponse::ok(updated)))
}

// --- List bookings (paginated, optional filters) ---

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<BookingFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<Booking>>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let pagination = params.pagination();
    let offset = pagination.offset() as i64;
    let limit = pagination.limit() as i64;

    let mut query = bookings::table.into_boxed();
    let mut count_query = bookings::table.count().into_boxed();

    if let Some(ref status) = params.status {
        query = query.filter(bookings::status.eq(status.clone()));
        count_query = count_query.filter(bookings::status.eq(status.clone()));
    }
    if let Some(teacher_id) = params.teacher_id {
        query = query.filter(bookings::teacher_id.eq(teacher_id));
        count_query = count_query.filter(bookings::teacher_id.eq(teacher_id));
    }
    if let Some(student_id) = params.student_id {
        query = query.filter(bookings::student_id.eq(student_id));
        count_query = count_query.filter(bookings::student_id.eq(student_id));
    }

    let items = query
        .order(bookings::scheduled_time.desc())
        .offset(offset)
        .limit(limit)
        .load::<Booking>(&mut conn)?;

    let total: i64 = count_query.get_result(&mut conn)?;

    let paginated = Paginated::new(items, total as u64, &pagination);
    Ok(Json(ApiResponse::ok(paginated)))
}
