use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use tutora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{
    Booking, BookingStatus, DisputeResolution, NewPaymentTransaction, Student, Teacher,
    TransactionStatus, TransactionType,
};
use crate::schema::{bookings, payment_transactions, students, teachers};

/// How student credit is handled when a completion is applied. Admin
/// marking clamps the balance at zero and deactivates exhausted students;
/// the dispute-approval path lets the balance go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditPolicy {
    ClampAtZero,
    AllowNegative,
}

/// Marks a completion/cancellation as the outcome of a booking-level
/// dispute, so the booking records who resolved it and in whose favour.
pub struct DisputeStamp {
    pub resolution: DisputeResolution,
    pub resolved_by: Uuid,
}

/// The three documents every completion/cancellation touches, as written.
pub struct LifecycleOutcome {
    pub booking: Booking,
    pub teacher: Teacher,
    pub student: Student,
}

pub fn load_booking(conn: &mut PgConnection, booking_id: Uuid) -> AppResult<Booking> {
    bookings::table
        .find(booking_id)
        .first::<Booking>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::BookingNotFound, "booking not found"))
}

pub fn load_teacher(conn: &mut PgConnection, teacher_id: Uuid) -> AppResult<Teacher> {
    teachers::table
        .find(teacher_id)
        .first::<Teacher>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::TeacherNotFound, "teacher not found"))
}

pub fn load_student(conn: &mut PgConnection, student_id: Uuid) -> AppResult<Student> {
    students::table
        .find(student_id)
        .first::<Student>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::StudentNotFound, "student not found"))
}

pub fn booking_status(booking: &Booking) -> AppResult<BookingStatus> {
    booking.status.parse().map_err(AppError::internal)
}

fn debit_credit(credit: i32, policy: CreditPolicy) -> i32 {
    match policy {
        CreditPolicy::ClampAtZero => (credit - 1).max(0),
        CreditPolicy::AllowNegative => credit - 1,
    }
}

fn reversal_counters(lessons_completed: i32, earned: f64, rate: f64) -> (i32, f64) {
    ((lessons_completed - 1).max(0), (earned - rate).max(0.0))
}

/// Applies the full completion side-effect set: booking to `completed`,
/// student credit debited, teacher counters credited, and one `pending`
/// `class_completion` ledger entry appended. The single capability shared
/// by admin marking, booking-level dispute resolution, and complaint
/// review. Callers run it inside a transaction.
pub fn apply_completion(
    conn: &mut PgConnection,
    booking: &Booking,
    policy: CreditPolicy,
    dispute: Option<&DisputeStamp>,
) -> AppResult<LifecycleOutcome> {
    let current = booking_status(booking)?;
    if !current.can_transition(BookingStatus::Completed) {
        return Err(AppError::state_conflict(
            ErrorCode::BookingStatusConflict,
            format!("booking cannot be completed from status '{current}'"),
            current.as_str(),
        ));
    }

    let now = Utc::now();

    let updated_booking: Booking = match dispute {
        Some(stamp) => diesel::update(bookings::table.find(booking.id))
            .set((
                bookings::status.eq(BookingStatus::Completed.as_str()),
                bookings::completed_at.eq(now),
                bookings::dispute_resolution.eq(stamp.resolution.as_str()),
                bookings::dispute_resolved_by.eq(stamp.resolved_by),
                bookings::dispute_resolved_at.eq(now),
            ))
            .get_result(conn)?,
        None => diesel::update(bookings::table.find(booking.id))
            .set((
                bookings::status.eq(BookingStatus::Completed.as_str()),
                bookings::completed_at.eq(now),
            ))
            .get_result(conn)?,
    };

    let student = load_student(conn, booking.student_id)?;
    let new_credit = debit_credit(student.no_of_classes, policy);
    let deactivate = policy == CreditPolicy::ClampAtZero && new_credit == 0;
    let updated_student: Student = diesel::update(students::table.find(student.id))
        .set((
            students::no_of_classes.eq(new_credit),
            students::active.eq(student.active && !deactivate),
        ))
        .get_result(conn)?;

    let teacher = load_teacher(conn, booking.teacher_id)?;
    let updated_teacher: Teacher = diesel::update(teachers::table.find(teacher.id))
        .set((
            teachers::lessons_completed.eq(teacher.lessons_completed + 1),
            teachers::earned.eq(teacher.earned + teacher.rate_per_class),
        ))
        .get_result(conn)?;

    diesel::insert_into(payment_transactions::table)
        .values(&NewPaymentTransaction {
            teacher_id: teacher.id,
            booking_id: Some(booking.id),
            amount: teacher.rate_per_class,
            transaction_type: TransactionType::ClassCompletion.as_str().to_string(),
            status: TransactionStatus::Pending.as_str().to_string(),
            completed_at: Some(now),
            notes: None,
        })
        .execute(conn)?;

    tracing::info!(
        booking_id = %booking.id,
        teacher_id = %teacher.id,
        student_id = %student.id,
        rate = teacher.rate_per_class,
        "booking completed"
    );

    Ok(LifecycleOutcome {
        booking: updated_booking,
        teacher: updated_teacher,
        student: updated_student,
    })
}

/// Cancellation counterpart of [`apply_completion`]: booking to
/// `cancelled`, optional credit refund, no teacher earning and no ledger
/// entry. Callers run it inside a transaction.
pub fn apply_cancellation(
    conn: &mut PgConnection,
    booking: &Booking,
    refund_student: bool,
    dispute: Option<&DisputeStamp>,
) -> AppResult<LifecycleOutcome> {
    let current = booking_status(booking)?;
    if !current.can_transition(BookingStatus::Cancelled) {
        return Err(AppError::state_conflict(
            ErrorCode::BookingStatusConflict,
            format!("booking cannot be cancelled from status '{current}'"),
            current.as_str(),
        ));
    }

    let now = Utc::now();

    let updated_booking: Booking = match dispute {
        Some(stamp) => diesel::update(bookings::table.find(booking.id))
            .set((
                bookings::status.eq(BookingStatus::Cancelled.as_str()),
                bookings::cancelled_at.eq(now),
                bookings::dispute_resolution.eq(stamp.resolution.as_str()),
                bookings::dispute_resolved_by.eq(stamp.resolved_by),
                bookings::dispute_resolved_at.eq(now),
            ))
            .get_result(conn)?,
        None => diesel::update(bookings::table.find(booking.id))
            .set((
                bookings::status.eq(BookingStatus::Cancelled.as_str()),
                bookings::cancelled_at.eq(now),
            ))
            .get_result(conn)?,
    };

    let student = load_student(conn, booking.student_id)?;
    let updated_student = if refund_student {
        diesel::update(students::table.find(student.id))
            .set(students::no_of_classes.eq(student.no_of_classes + 1))
            .get_result(conn)?
    } else {
        student
    };

    let teacher = load_teacher(conn, booking.teacher_id)?;

    tracing::info!(
        booking_id = %booking.id,
        refund = refund_student,
        "booking cancelled"
    );

    Ok(LifecycleOutcome {
        booking: updated_booking,
        teacher,
        student: updated_student,
    })
}

/// Teacher (or admin) response to a requested booking. Precondition: the
/// booking is `pending`; rejection is terminal.
pub fn respond_to_booking(
    conn: &mut PgConnection,
    booking_id: Uuid,
    accept: bool,
) -> AppResult<Booking> {
    let booking = load_booking(conn, booking_id)?;
    let current = booking_status(&booking)?;
    if current != BookingStatus::Pending {
        return Err(AppError::state_conflict(
            ErrorCode::BookingStatusConflict,
            format!("only pending bookings can be accepted or rejected (current status: '{current}')"),
            current.as_str(),
        ));
    }

    let next = if accept {
        BookingStatus::Accepted
    } else {
        BookingStatus::Rejected
    };

    let updated: Booking = diesel::update(bookings::table.find(booking.id))
        .set(bookings::status.eq(next.as_str()))
        .get_result(conn)?;

    tracing::info!(booking_id = %booking.id, status = next.as_str(), "booking request answered");

    Ok(updated)
}

/// Admin mark-complete. Precondition: the booking is `accepted`.
pub fn mark_complete(conn: &mut PgConnection, booking_id: Uuid) -> AppResult<LifecycleOutcome> {
    let booking = load_booking(conn, booking_id)?;
    let current = booking_status(&booking)?;
    if current != BookingStatus::Accepted {
        return Err(AppError::state_conflict(
            ErrorCode::BookingStatusConflict,
            format!("only accepted bookings can be marked complete (current status: '{current}')"),
            current.as_str(),
        ));
    }

    apply_completion(conn, &booking, CreditPolicy::ClampAtZero, None)
}

/// Admin reversal of a completed booking: the exact inverse of
/// [`mark_complete`]. The matching pending ledger entry is cancelled, not
/// deleted, so the audit trail survives.
pub fn unmark(
    conn: &mut PgConnection,
    booking_id: Uuid,
    admin_id: Uuid,
    reason: &str,
) -> AppResult<LifecycleOutcome> {
    let booking = load_booking(conn, booking_id)?;
    let current = booking_status(&booking)?;
    if current != BookingStatus::Completed {
        return Err(AppError::state_conflict(
            ErrorCode::BookingStatusConflict,
            format!("only completed bookings can be unmarked (current status: '{current}')"),
            current.as_str(),
        ));
    }
    if booking.admin_rejected {
        return Err(AppError::state_conflict(
            ErrorCode::CompletionAlreadyReversed,
            "this completion has already been reversed",
            current.as_str(),
        ));
    }

    let now = Utc::now();

    let updated_booking: Booking = diesel::update(bookings::table.find(booking.id))
        .set((
            bookings::status.eq(BookingStatus::Accepted.as_str()),
            bookings::completed_at.eq(None::<chrono::DateTime<Utc>>),
            bookings::admin_rejected.eq(true),
            bookings::admin_rejected_reason.eq(reason),
            bookings::admin_rejected_by.eq(admin_id),
            bookings::admin_rejected_at.eq(now),
        ))
        .get_result(conn)?;

    let student = load_student(conn, booking.student_id)?;
    let updated_student: Student = diesel::update(students::table.find(student.id))
        .set((
            students::no_of_classes.eq(student.no_of_classes + 1),
            students::active.eq(true),
        ))
        .get_result(conn)?;

    let teacher = load_teacher(conn, booking.teacher_id)?;
    let (lessons, earned) =
        reversal_counters(teacher.lessons_completed, teacher.earned, teacher.rate_per_class);
    let updated_teacher: Teacher = diesel::update(teachers::table.find(teacher.id))
        .set((
            teachers::lessons_completed.eq(lessons),
            teachers::earned.eq(earned),
        ))
        .get_result(conn)?;

    let cancelled = diesel::update(
        payment_transactions::table
            .filter(payment_transactions::booking_id.eq(booking.id))
            .filter(payment_transactions::transaction_type.eq(TransactionType::ClassCompletion.as_str()))
            .filter(payment_transactions::status.eq(TransactionStatus::Pending.as_str())),
    )
    .set((
        payment_transactions::status.eq(TransactionStatus::Cancelled.as_str()),
        payment_transactions::notes.eq(format!("completion reversed by admin: {reason}")),
    ))
    .execute(conn)?;

    tracing::info!(
        booking_id = %booking.id,
        admin_id = %admin_id,
        cancelled_transactions = cancelled,
        "booking completion reversed"
    );

    Ok(LifecycleOutcome {
        booking: updated_booking,
        teacher: updated_teacher,
        student: updated_student,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_debit_clamps_only_when_asked() {
        assert_eq!(debit_credit(3, CreditPolicy::ClampAtZero), 2);
        assert_eq!(debit_credit(0, CreditPolicy::ClampAtZero), 0);
        assert_eq!(debit_credit(1, CreditPolicy::ClampAtZero), 0);
        // Dispute approval deliberately lets the balance go negative.
        assert_eq!(debit_credit(0, CreditPolicy::AllowNegative), -1);
        assert_eq!(debit_credit(-2, CreditPolicy::AllowNegative), -3);
    }

    #[test]
    fn reversal_counters_clamp_at_zero() {
        assert_eq!(reversal_counters(5, 100.0, 20.0), (4, 80.0));
        assert_eq!(reversal_counters(0, 0.0, 20.0), (0, 0.0));
        assert_eq!(reversal_counters(1, 10.0, 20.0), (0, 0.0));
    }

    #[test]
    fn mark_then_unmark_restores_counters() {
        // Completion followed by reversal is a compensating pair: the
        // student regains the debited credit and the teacher's counters
        // return to their pre-mark values.
        let (credit, lessons, earned, rate) = (4, 7, 140.0, 20.0);

        let after_mark_credit = debit_credit(credit, CreditPolicy::ClampAtZero);
        let (after_lessons, after_earned) = (lessons + 1, earned + rate);

        let restored_credit = after_mark_credit + 1;
        let (restored_lessons, restored_earned) =
            reversal_counters(after_lessons, after_earned, rate);

        assert_eq!(restored_credit, credit);
        assert_eq!(restored_lessons, lessons);
        assert_eq!(restored_earned, earned);
    }
}
