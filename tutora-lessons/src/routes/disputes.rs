use axum::extract::{Path, State};
use axum::Json;
use diesel::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use tutora_shared::errors::{AppError, AppResult, ErrorCode};
use tutora_shared::middleware::AdminUser;
use tutora_shared::types::api::ApiResponse;

use crate::events::publisher;
use crate::models::{Booking, DisputeResolution};
use crate::services::disputes;
use crate::services::lifecycle::LifecycleOutcome;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ResolveDisputeRequest {
    pub resolution: String, // "approve_teacher" or "approve_student"
    pub admin_notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveDisputeResponse {
    pub booking: Booking,
}

/// Booking-level dispute resolution. The financially sensitive path: all
/// four writes (booking, student, teacher, ledger) commit or roll back
/// together.
pub async fn resolve_dispute(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<ResolveDisputeRequest>,
) -> AppResult<Json<ApiResponse<ResolveDisputeResponse>>> {
    let resolution = DisputeResolution::from_request(&body.resolution)
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e))?;

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let outcome = conn.transaction::<LifecycleOutcome, AppError, _>(|conn| {
        disputes::resolve_dispute(
            conn,
            booking_id,
            resolution,
            admin.0.id,
            body.admin_notes.as_deref(),
        )
    })?;

    publisher::publish_dispute_resolved(
        &state.rabbitmq,
        outcome.booking.id,
        resolution.as_str(),
        admin.0.id,
    )
    .await;

    match resolution {
        DisputeResolution::ApprovedTeacher => {
            publisher::publish_booking_completed(
                &state.rabbitmq,
                outcome.booking.id,
                outcome.teacher.id,
                outcome.student.id,
                outcome.teacher.rate_per_class,
            )
            .await;
        }
        DisputeResolution::ApprovedStudent => {
            publisher::publish_booking_cancelled(
                &state.rabbitmq,
                outcome.booking.id,
                outcome.teacher.id,
                outcome.student.id,
            )
            .await;
        }
    }

    let outcome_text = match resolution {
        DisputeResolution::ApprovedTeacher => "resolved in the teacher's favour",
        DisputeResolution::ApprovedStudent => "resolved in the student's favour",
    };
    for recipient in [&outcome.teacher.email, &outcome.student.email] {
        if let Err(e) = state
            .email
            .send_dispute_resolved(recipient, &outcome.booking.class_title, outcome_text)
            .await
        {
            tracing::warn!(error = %e, to = %recipient, "dispute notification failed");
        }
    }

    Ok(Json(ApiResponse::ok(ResolveDisputeResponse {
        booking: outcome.booking,
    })))
}
