use axum::extract::State;
use axum::Json;
use diesel::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use tutora_shared::errors::{AppError, AppResult};
use tutora_shared::middleware::AdminUser;
use tutora_shared::types::api::ApiResponse;

use crate::events::publisher;
use crate::models::Booking;
use crate::services::lifecycle::{self, LifecycleOutcome};
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct MarkLessonRequest {
    pub booking_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UnmarkLessonRequest {
    pub booking_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct TeacherMarkSummary {
    pub id: Uuid,
    pub lessons_completed: i32,
    pub earned: f64,
    pub rate_added: f64,
}

#[derive(Debug, Serialize)]
pub struct StudentMarkSummary {
    pub id: Uuid,
    pub no_of_classes: i32,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkLessonResponse {
    pub booking: Booking,
    pub teacher: TeacherMarkSummary,
    pub student: StudentMarkSummary,
}

#[derive(Debug, Serialize)]
pub struct TeacherUnmarkSummary {
    pub id: Uuid,
    pub lessons_completed: i32,
    pub earned: f64,
    pub rate_deducted: f64,
}

#[derive(Debug, Serialize)]
pub struct StudentUnmarkSummary {
    pub id: Uuid,
    pub no_of_classes: i32,
    pub active: bool,
    pub class_restored: bool,
}

#[derive(Debug, Serialize)]
pub struct UnmarkLessonResponse {
    pub booking: Booking,
    pub teacher: TeacherUnmarkSummary,
    pub student: StudentUnmarkSummary,
}

// --- Mark lesson complete ---

pub async fn mark_lesson(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(body): Json<MarkLessonRequest>,
) -> AppResult<Json<ApiResponse<MarkLessonResponse>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let outcome = conn.transaction::<LifecycleOutcome, AppError, _>(|conn| {
        lifecycle::mark_complete(conn, body.booking_id)
    })?;

    publisher::publish_booking_completed(
        &state.rabbitmq,
        outcome.booking.id,
        outcome.teacher.id,
        outcome.student.id,
        outcome.teacher.rate_per_class,
    )
    .await;

    notify_completion(&state, &outcome).await;

    let rate_added = outcome.teacher.rate_per_class;
    Ok(Json(ApiResponse::ok(MarkLessonResponse {
        teacher: TeacherMarkSummary {
            id: outcome.teacher.id,
            lessons_completed: outcome.teacher.lessons_completed,
            earned: outcome.teacher.earned,
            rate_added,
        },
        student: StudentMarkSummary {
            id: outcome.student.id,
            no_of_classes: outcome.student.no_of_classes,
            active: outcome.student.active,
        },
        booking: outcome.booking,
    })))
}

// --- Unmark lesson (administrative reversal) ---

pub async fn unmark_lesson(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<UnmarkLessonRequest>,
) -> AppResult<Json<ApiResponse<UnmarkLessonResponse>>> {
    if body.reason.trim().is_empty() {
        return Err(AppError::Validation("a reversal reason is required".to_string()));
    }

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let outcome = conn.transaction::<LifecycleOutcome, AppError, _>(|conn| {
        lifecycle::unmark(conn, body.booking_id, admin.0.id, &body.reason)
    })?;

    publisher::publish_booking_reversed(
        &state.rabbitmq,
        outcome.booking.id,
        outcome.teacher.id,
        outcome.student.id,
        &body.reason,
    )
    .await;

    notify_reversal(&state, &outcome, &body.reason).await;

    let rate_deducted = outcome.teacher.rate_per_class;
    Ok(Json(ApiResponse::ok(UnmarkLessonResponse {
        teacher: TeacherUnmarkSummary {
            id: outcome.teacher.id,
            lessons_completed: outcome.teacher.lessons_completed,
            earned: outcome.teacher.earned,
            rate_deducted,
        },
        student: StudentUnmarkSummary {
            id: outcome.student.id,
            no_of_classes: outcome.student.no_of_classes,
            active: outcome.student.active,
            class_restored: true,
        },
        booking: outcome.booking,
    })))
}

// Notification failures never fail the business operation.

async fn notify_completion(state: &AppState, outcome: &LifecycleOutcome) {
    for recipient in [&outcome.teacher.email, &outcome.student.email] {
        if let Err(e) = state
            .email
            .send_lesson_completed(recipient, &outcome.booking.class_title)
            .await
        {
            tracing::warn!(error = %e, to = %recipient, "completion notification failed");
        }
    }
}

async fn notify_reversal(state: &AppState, outcome: &LifecycleOutcome, reason: &str) {
    for recipient in [&outcome.teacher.email, &outcome.student.email] {
        if let Err(e) = state
            .email
            .send_lesson_reversed(recipient, &outcome.booking.class_title, reason)
            .await
        {
            tracing::warn!(error = %e, to = %recipient, "reversal notification failed");
        }
    }
}
