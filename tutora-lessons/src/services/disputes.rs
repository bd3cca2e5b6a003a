use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use tutora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{
    BookingStatus, ClassComplaint, ComplaintResolution, ComplaintStatus, DisputeResolution,
    SessionStatus,
};
use crate::schema::{bookings, class_complaints, classroom_sessions};
use crate::services::lifecycle::{
    self, apply_cancellation, apply_completion, CreditPolicy, DisputeStamp, LifecycleOutcome,
};

pub fn load_complaint(conn: &mut PgConnection, complaint_id: Uuid) -> AppResult<ClassComplaint> {
    class_complaints::table
        .find(complaint_id)
        .first::<ClassComplaint>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ComplaintNotFound, "complaint not found"))
}

/// Booking-level dispute resolution. Precondition: the booking is
/// `disputed`. Both branches mutate booking, student, teacher, and ledger
/// together; the caller wraps this in a single transaction.
pub fn resolve_dispute(
    conn: &mut PgConnection,
    booking_id: Uuid,
    resolution: DisputeResolution,
    admin_id: Uuid,
    admin_notes: Option<&str>,
) -> AppResult<LifecycleOutcome> {
    let booking = lifecycle::load_booking(conn, booking_id)?;
    let current = lifecycle::booking_status(&booking)?;
    if current != BookingStatus::Disputed {
        return Err(AppError::state_conflict(
            ErrorCode::BookingStatusConflict,
            format!("only disputed bookings can be resolved (current status: '{current}')"),
            current.as_str(),
        ));
    }

    let stamp = DisputeStamp {
        resolution,
        resolved_by: admin_id,
    };

    let (outcome, complaint_resolution) = match resolution {
        DisputeResolution::ApprovedTeacher => (
            apply_completion(conn, &booking, CreditPolicy::AllowNegative, Some(&stamp))?,
            ComplaintResolution::MarkComplete,
        ),
        DisputeResolution::ApprovedStudent => (
            apply_cancellation(conn, &booking, true, Some(&stamp))?,
            ComplaintResolution::RefundStudent,
        ),
    };

    // Close any open complaint for this booking alongside the resolution.
    let closed = diesel::update(
        class_complaints::table
            .filter(class_complaints::booking_id.eq(booking.id))
            .filter(class_complaints::status.eq_any(vec![
                ComplaintStatus::Pending.as_str(),
                ComplaintStatus::UnderReview.as_str(),
            ])),
    )
    .set((
        class_complaints::status.eq(ComplaintStatus::Approved.as_str()),
        class_complaints::resolution.eq(complaint_resolution.as_str()),
        class_complaints::reviewed_by.eq(admin_id),
        class_complaints::reviewed_at.eq(Utc::now()),
        class_complaints::admin_notes.eq(admin_notes),
    ))
    .execute(conn)?;

    tracing::info!(
        booking_id = %booking.id,
        resolution = resolution.as_str(),
        closed_complaints = closed,
        "dispute resolved"
    );

    Ok(outcome)
}

/// Complaint-level review. `under_review` escalates the booking into a
/// booking-level dispute; `approved` applies the requested resolution
/// through the same completion/cancellation capability the dispute
/// resolver uses; `rejected` dismisses the complaint without touching the
/// booking. The caller wraps this in a single transaction.
pub fn review_complaint(
    conn: &mut PgConnection,
    complaint_id: Uuid,
    new_status: ComplaintStatus,
    resolution: ComplaintResolution,
    admin_id: Uuid,
    admin_notes: Option<&str>,
) -> AppResult<(ClassComplaint, Option<LifecycleOutcome>)> {
    let complaint = load_complaint(conn, complaint_id)?;
    let current: ComplaintStatus = complaint.status.parse().map_err(AppError::internal)?;
    if current.is_terminal() {
        return Err(AppError::state_conflict(
            ErrorCode::ComplaintAlreadyReviewed,
            "this complaint has already been reviewed",
            current.as_str(),
        ));
    }

    let now = Utc::now();

    match new_status {
        ComplaintStatus::Pending => Err(AppError::new(
            ErrorCode::ValidationError,
            "status must be 'approved', 'rejected' or 'under_review'",
        )),

        ComplaintStatus::UnderReview => {
            escalate_booking(conn, complaint.booking_id)?;

            let updated: ClassComplaint = diesel::update(class_complaints::table.find(complaint.id))
                .set((
                    class_complaints::status.eq(ComplaintStatus::UnderReview.as_str()),
                    class_complaints::admin_notes.eq(admin_notes),
                ))
                .get_result(conn)?;

            Ok((updated, None))
        }

        ComplaintStatus::Approved => {
            let booking = lifecycle::load_booking(conn, complaint.booking_id)?;

            let outcome = match resolution {
                ComplaintResolution::MarkComplete => Some(apply_completion(
                    conn,
                    &booking,
                    CreditPolicy::ClampAtZero,
                    None,
                )?),
                ComplaintResolution::MarkIncomplete => {
                    Some(apply_cancellation(conn, &booking, false, None)?)
                }
                ComplaintResolution::RefundStudent => {
                    Some(apply_cancellation(conn, &booking, true, None)?)
                }
                ComplaintResolution::NoAction => None,
            };

            settle_session(conn, complaint.booking_id, resolution)?;

            let updated: ClassComplaint = diesel::update(class_complaints::table.find(complaint.id))
                .set((
                    class_complaints::status.eq(ComplaintStatus::Approved.as_str()),
                    class_complaints::resolution.eq(resolution.as_str()),
                    class_complaints::reviewed_by.eq(admin_id),
                    class_complaints::reviewed_at.eq(now),
                    class_complaints::admin_notes.eq(admin_notes),
                ))
                .get_result(conn)?;

            Ok((updated, outcome))
        }

        ComplaintStatus::Rejected => {
            let updated: ClassComplaint = diesel::update(class_complaints::table.find(complaint.id))
                .set((
                    class_complaints::status.eq(ComplaintStatus::Rejected.as_str()),
                    class_complaints::resolution.eq(ComplaintResolution::NoAction.as_str()),
                    class_complaints::reviewed_by.eq(admin_id),
                    class_complaints::reviewed_at.eq(now),
                    class_complaints::admin_notes.eq(admin_notes),
                ))
                .get_result(conn)?;

            Ok((updated, None))
        }
    }
}

/// Flags the complaint's booking as `disputed` so the booking-level
/// resolver takes over. A booking already under dispute is left as is.
fn escalate_booking(conn: &mut PgConnection, booking_id: Uuid) -> AppResult<()> {
    let booking = lifecycle::load_booking(conn, booking_id)?;
    let current = lifecycle::booking_status(&booking)?;

    if current == BookingStatus::Disputed {
        return Ok(());
    }
    if !current.can_transition(BookingStatus::Disputed) {
        return Err(AppError::state_conflict(
            ErrorCode::BookingStatusConflict,
            format!("booking cannot be disputed from status '{current}'"),
            current.as_str(),
        ));
    }

    diesel::update(bookings::table.find(booking_id))
        .set(bookings::status.eq(BookingStatus::Disputed.as_str()))
        .execute(conn)?;

    Ok(())
}

/// Reflects a terminal complaint resolution onto the attendance session,
/// when one exists.
fn settle_session(
    conn: &mut PgConnection,
    booking_id: Uuid,
    resolution: ComplaintResolution,
) -> AppResult<()> {
    let session_status = match resolution {
        ComplaintResolution::MarkComplete => SessionStatus::Completed,
        ComplaintResolution::MarkIncomplete | ComplaintResolution::RefundStudent => {
            SessionStatus::Incomplete
        }
        ComplaintResolution::NoAction => return Ok(()),
    };

    diesel::update(
        classroom_sessions::table.filter(classroom_sessions::booking_id.eq(booking_id)),
    )
    .set((
        classroom_sessions::status.eq(session_status.as_str()),
        classroom_sessions::updated_at.eq(Utc::now()),
    ))
    .execute(conn)?;

    Ok(())
}
