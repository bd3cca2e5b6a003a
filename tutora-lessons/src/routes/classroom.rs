use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use tutora_shared::errors::{AppError, AppResult, ErrorCode};
use tutora_shared::middleware::AdminUser;
use tutora_shared::types::api::ApiResponse;
use tutora_shared::types::auth::AuthUser;

use crate::events::publisher;
use crate::models::{
    ClassComplaint, ClassroomSession, ComplaintResolution, ComplaintStatus, ParticipantRole,
};
use crate::services::attendance::{self, AttendanceAction, CompletionCheck, EndEarlyInput};
use crate::services::disputes;
use crate::services::lifecycle;
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct AttendanceEventRequest {
    pub booking_id: Uuid,
    pub user_role: String, // "teacher" or "student"
    pub action: String,    // "join", "leave" or "heartbeat"
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub active_time: i32, // cumulative seconds, as reported by the client
}

#[derive(Debug, Serialize)]
pub struct AttendanceEventResponse {
    pub session: ClassroomSession,
}

#[derive(Debug, Deserialize)]
pub struct EndClassEarlyRequest {
    pub booking_id: Uuid,
    pub reason: String,
    pub reported_by: String,
    pub description: Option<String>,
    pub teacher_active_time: i32,
    pub student_active_time: i32,
    pub both_active_time: i32,
    pub required_time: i32,
    pub ended_at: DateTime<Utc>,
    pub ended_by: String,
}

#[derive(Debug, Serialize)]
pub struct EndClassEarlyResponse {
    pub complaint: ClassComplaint,
}

#[derive(Debug, Deserialize)]
pub struct ReviewComplaintRequest {
    pub status: String,
    pub resolution: Option<String>,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewComplaintResponse {
    pub complaint: ClassComplaint,
}

// --- Attendance event (join / leave / heartbeat) ---

pub async fn record_attendance(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(body): Json<AttendanceEventRequest>,
) -> AppResult<Json<ApiResponse<AttendanceEventResponse>>> {
    let role: ParticipantRole = body
        .user_role
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e))?;
    let action: AttendanceAction = body
        .action
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::UnknownAttendanceAction, e))?;

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let booking = lifecycle::load_booking(&mut conn, body.booking_id)?;

    let (session, started) = attendance::record_event(
        &mut conn,
        &booking,
        role,
        action,
        body.timestamp,
        body.active_time,
    )?;

    if started {
        publisher::publish_session_started(&state.rabbitmq, session.id, booking.id).await;
    }

    Ok(Json(ApiResponse::ok(AttendanceEventResponse { session })))
}

// --- End class early ---

pub async fn end_class_early(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(body): Json<EndClassEarlyRequest>,
) -> AppResult<Json<ApiResponse<EndClassEarlyResponse>>> {
    let reported_by: ParticipantRole = body
        .reported_by
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e))?;
    let ended_by: ParticipantRole = body
        .ended_by
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e))?;

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let booking = lifecycle::load_booking(&mut conn, body.booking_id)?;

    let (complaint, _session) = conn.transaction::<(ClassComplaint, ClassroomSession), AppError, _>(
        |conn| {
            attendance::end_early(
                conn,
                &booking,
                EndEarlyInput {
                    reason: body.reason.clone(),
                    reported_by,
                    description: body.description.clone(),
                    teacher_active_seconds: body.teacher_active_time,
                    student_active_seconds: body.student_active_time,
                    both_active_seconds: body.both_active_time,
                    required_seconds: body.required_time,
                    ended_at: body.ended_at,
                    ended_by,
                },
            )
        },
    )?;

    publisher::publish_complaint_raised(
        &state.rabbitmq,
        complaint.id,
        complaint.booking_id,
        &complaint.reason,
    )
    .await;

    Ok(Json(ApiResponse::ok(EndClassEarlyResponse { complaint })))
}

// --- Check completion eligibility (advisory) ---

pub async fn check_completion(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CompletionCheck>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let check = attendance::completion_check(&mut conn, booking_id)?;
    Ok(Json(ApiResponse::ok(check)))
}

// --- Review complaint ---

pub async fn review_complaint(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(complaint_id): Path<Uuid>,
    Json(body): Json<ReviewComplaintRequest>,
) -> AppResult<Json<ApiResponse<ReviewComplaintResponse>>> {
    let new_status: ComplaintStatus = body
        .status
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e))?;
    let resolution: ComplaintResolution = match body.resolution.as_deref() {
        Some(r) => r
            .parse()
            .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e))?,
        None => ComplaintResolution::NoAction,
    };

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let (complaint, outcome) = conn.transaction::<(ClassComplaint, Option<lifecycle::LifecycleOutcome>), AppError, _>(
        |conn| {
            disputes::review_complaint(
                conn,
                complaint_id,
                new_status,
                resolution,
                admin.0.id,
                body.admin_notes.as_deref(),
            )
        },
    )?;

    publisher::publish_complaint_reviewed(
        &state.rabbitmq,
        complaint.id,
        complaint.booking_id,
        &complaint.status,
        complaint.resolution.as_deref().unwrap_or("none"),
        admin.0.id,
    )
    .await;

    if let Some(outcome) = &outcome {
        match outcome.booking.status.as_str() {
            "completed" => {
                publisher::publish_booking_completed(
                    &state.rabbitmq,
                    outcome.booking.id,
                    outcome.teacher.id,
                    outcome.student.id,
                    outcome.teacher.rate_per_class,
                )
                .await;
            }
            "cancelled" => {
                publisher::publish_booking_cancelled(
                    &state.rabbitmq,
                    outcome.booking.id,
                    outcome.teacher.id,
                    outcome.student.id,
                )
                .await;
            }
            _ => {}
        }
    }

    Ok(Json(ApiResponse::ok(ReviewComplaintResponse { complaint })))
}
