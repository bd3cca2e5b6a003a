use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use tutora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{
    Booking, BookingStatus, ClassComplaint, ClassroomSession, ComplaintStatus, NewClassComplaint,
    NewClassroomSession, NewSessionHeartbeat, ParticipantRole, SessionStatus,
};
use crate::schema::{bookings, class_complaints, classroom_sessions, session_heartbeats};
use crate::services::lifecycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceAction {
    Join,
    Leave,
    Heartbeat,
}

impl std::str::FromStr for AttendanceAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "join" => Ok(Self::Join),
            "leave" => Ok(Self::Leave),
            "heartbeat" => Ok(Self::Heartbeat),
            _ => Err(format!("unknown attendance action: {s}")),
        }
    }
}

/// Minimum joint presence for a class to count, as a share of its
/// scheduled seconds. Integer math so the fraction cannot lose a second
/// to float rounding (60 min -> floor(3600 * 0.83) = 2988).
pub fn required_seconds(duration_minutes: i32) -> i32 {
    duration_minutes * 60 * 83 / 100
}

/// Joint presence is approximated as the minimum of the two independently
/// reported cumulative counters once both are positive. Not a true
/// interval intersection.
pub fn joint_active_seconds(teacher: i32, student: i32) -> i32 {
    if teacher > 0 && student > 0 {
        teacher.min(student)
    } else {
        0
    }
}

pub fn can_complete(both_active_seconds: i32, required: i32) -> bool {
    both_active_seconds >= required
}

pub fn find_session(conn: &mut PgConnection, booking_id: Uuid) -> AppResult<ClassroomSession> {
    classroom_sessions::table
        .filter(classroom_sessions::booking_id.eq(booking_id))
        .first::<ClassroomSession>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound, "no session for this booking"))
}

/// One session per booking, created lazily on the first attendance event.
fn find_or_create_session(conn: &mut PgConnection, booking: &Booking) -> AppResult<ClassroomSession> {
    if let Some(session) = classroom_sessions::table
        .filter(classroom_sessions::booking_id.eq(booking.id))
        .first::<ClassroomSession>(conn)
        .optional()?
    {
        return Ok(session);
    }

    let session: ClassroomSession = diesel::insert_into(classroom_sessions::table)
        .values(&NewClassroomSession {
            booking_id: booking.id,
            required_seconds: required_seconds(booking.duration_minutes),
            status: SessionStatus::Waiting.as_str().to_string(),
        })
        .get_result(conn)?;

    tracing::debug!(
        session_id = %session.id,
        booking_id = %booking.id,
        required_seconds = session.required_seconds,
        "classroom session created"
    );

    Ok(session)
}

/// Applies one join/leave/heartbeat event. Returns the updated session and
/// whether this event started the class (both participants now present).
pub fn record_event(
    conn: &mut PgConnection,
    booking: &Booking,
    role: ParticipantRole,
    action: AttendanceAction,
    timestamp: DateTime<Utc>,
    active_seconds: i32,
) -> AppResult<(ClassroomSession, bool)> {
    let session = find_or_create_session(conn, booking)?;
    let now = Utc::now();

    match action {
        AttendanceAction::Join => {
            let joined: ClassroomSession = match role {
                ParticipantRole::Teacher => {
                    diesel::update(classroom_sessions::table.find(session.id))
                        .set((
                            classroom_sessions::teacher_joined_at.eq(timestamp),
                            classroom_sessions::updated_at.eq(now),
                        ))
                        .get_result(conn)?
                }
                ParticipantRole::Student => {
                    diesel::update(classroom_sessions::table.find(session.id))
                        .set((
                            classroom_sessions::student_joined_at.eq(timestamp),
                            classroom_sessions::updated_at.eq(now),
                        ))
                        .get_result(conn)?
                }
            };

            if joined.teacher_joined_at.is_some()
                && joined.student_joined_at.is_some()
                && joined.class_started_at.is_none()
            {
                let started: ClassroomSession =
                    diesel::update(classroom_sessions::table.find(session.id))
                        .set((
                            classroom_sessions::class_started_at.eq(timestamp),
                            classroom_sessions::status.eq(SessionStatus::Active.as_str()),
                            classroom_sessions::updated_at.eq(now),
                        ))
                        .get_result(conn)?;
                return Ok((started, true));
            }

            Ok((joined, false))
        }

        AttendanceAction::Leave => {
            let (teacher_active, student_active) = merged_counters(&session, role, active_seconds);
            let both = joint_active_seconds(teacher_active, student_active);

            let updated: ClassroomSession = match role {
                ParticipantRole::Teacher => {
                    diesel::update(classroom_sessions::table.find(session.id))
                        .set((
                            classroom_sessions::teacher_left_at.eq(timestamp),
                            classroom_sessions::teacher_active_seconds.eq(active_seconds),
                            classroom_sessions::both_active_seconds.eq(both),
                            classroom_sessions::updated_at.eq(now),
                        ))
                        .get_result(conn)?
                }
                ParticipantRole::Student => {
                    diesel::update(classroom_sessions::table.find(session.id))
                        .set((
                            classroom_sessions::student_left_at.eq(timestamp),
                            classroom_sessions::student_active_seconds.eq(active_seconds),
                            classroom_sessions::both_active_seconds.eq(both),
                            classroom_sessions::updated_at.eq(now),
                        ))
                        .get_result(conn)?
                }
            };

            Ok((updated, false))
        }

        AttendanceAction::Heartbeat => {
            diesel::insert_into(session_heartbeats::table)
                .values(&NewSessionHeartbeat {
                    session_id: session.id,
                    role: role.as_str().to_string(),
                    recorded_at: timestamp,
                    active_seconds,
                })
                .execute(conn)?;

            let (teacher_active, student_active) = merged_counters(&session, role, active_seconds);
            let both = joint_active_seconds(teacher_active, student_active);

            let updated: ClassroomSession = match role {
                ParticipantRole::Teacher => {
                    diesel::update(classroom_sessions::table.find(session.id))
                        .set((
                            classroom_sessions::teacher_active_seconds.eq(active_seconds),
                            classroom_sessions::both_active_seconds.eq(both),
                            classroom_sessions::updated_at.eq(now),
                        ))
                        .get_result(conn)?
                }
                ParticipantRole::Student => {
                    diesel::update(classroom_sessions::table.find(session.id))
                        .set((
                            classroom_sessions::student_active_seconds.eq(active_seconds),
                            classroom_sessions::both_active_seconds.eq(both),
                            classroom_sessions::updated_at.eq(now),
                        ))
                        .get_result(conn)?
                }
            };

            Ok((updated, false))
        }
    }
}

fn merged_counters(session: &ClassroomSession, role: ParticipantRole, reported: i32) -> (i32, i32) {
    match role {
        ParticipantRole::Teacher => (reported, session.student_active_seconds),
        ParticipantRole::Student => (session.teacher_active_seconds, reported),
    }
}

pub struct EndEarlyInput {
    pub reason: String,
    pub reported_by: ParticipantRole,
    pub description: Option<String>,
    pub teacher_active_seconds: i32,
    pub student_active_seconds: i32,
    pub both_active_seconds: i32,
    pub required_seconds: i32,
    pub ended_at: DateTime<Utc>,
    pub ended_by: ParticipantRole,
}

/// A participant ended the class before the joint-presence threshold was
/// met: snapshot both counters into a complaint, park the booking back in
/// `pending` for re-adjudication, and mark the session `ended-early`.
pub fn end_early(
    conn: &mut PgConnection,
    booking: &Booking,
    input: EndEarlyInput,
) -> AppResult<(ClassComplaint, ClassroomSession)> {
    let session = find_or_create_session(conn, booking)?;
    let now = Utc::now();

    let current = lifecycle::booking_status(booking)?;
    if current != BookingStatus::Pending {
        if !current.can_transition(BookingStatus::Pending) {
            return Err(AppError::state_conflict(
                ErrorCode::BookingStatusConflict,
                format!("class cannot be ended early from booking status '{current}'"),
                current.as_str(),
            ));
        }
        diesel::update(bookings::table.find(booking.id))
            .set(bookings::status.eq(BookingStatus::Pending.as_str()))
            .execute(conn)?;
    }

    let updated_session: ClassroomSession =
        diesel::update(classroom_sessions::table.find(session.id))
            .set((
                classroom_sessions::status.eq(SessionStatus::EndedEarly.as_str()),
                classroom_sessions::class_ended_at.eq(input.ended_at),
                classroom_sessions::teacher_active_seconds.eq(input.teacher_active_seconds),
                classroom_sessions::student_active_seconds.eq(input.student_active_seconds),
                classroom_sessions::both_active_seconds.eq(input.both_active_seconds),
                classroom_sessions::updated_at.eq(now),
            ))
            .get_result(conn)?;

    let complaint: ClassComplaint = diesel::insert_into(class_complaints::table)
        .values(&NewClassComplaint {
            booking_id: booking.id,
            teacher_id: booking.teacher_id,
            student_id: booking.student_id,
            reason: input.reason,
            reported_by: input.reported_by.as_str().to_string(),
            description: input.description,
            teacher_active_seconds: input.teacher_active_seconds,
            student_active_seconds: input.student_active_seconds,
            both_active_seconds: input.both_active_seconds,
            required_seconds: input.required_seconds,
            ended_at: input.ended_at,
            ended_by: input.ended_by.as_str().to_string(),
            status: ComplaintStatus::Pending.as_str().to_string(),
        })
        .get_result(conn)?;

    tracing::info!(
        booking_id = %booking.id,
        complaint_id = %complaint.id,
        both_active_seconds = input.both_active_seconds,
        required_seconds = input.required_seconds,
        "class ended early, complaint raised"
    );

    Ok((complaint, updated_session))
}

#[derive(Debug, Serialize)]
pub struct CompletionCheck {
    pub can_complete: bool,
    pub both_active_seconds: i32,
    pub required_seconds: i32,
    pub percentage: f64,
}

/// Advisory check: eligibility for normal completion. Actual completion
/// still requires the admin mark operation.
pub fn completion_check(conn: &mut PgConnection, booking_id: Uuid) -> AppResult<CompletionCheck> {
    let session = find_session(conn, booking_id)?;

    let percentage = if session.required_seconds > 0 {
        (f64::from(session.both_active_seconds) / f64::from(session.required_seconds) * 100.0)
            .min(100.0)
    } else {
        100.0
    };

    Ok(CompletionCheck {
        can_complete: can_complete(session.both_active_seconds, session.required_seconds),
        both_active_seconds: session.both_active_seconds,
        required_seconds: session.required_seconds,
        percentage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_seconds_is_83_percent_floored() {
        assert_eq!(required_seconds(60), 2988);
        assert_eq!(required_seconds(45), 2241);
        assert_eq!(required_seconds(30), 1494);
        assert_eq!(required_seconds(1), 49); // floor(60 * 0.83) = 49
    }

    #[test]
    fn completion_boundary_is_inclusive() {
        let required = required_seconds(60);
        assert!(!can_complete(2987, required));
        assert!(can_complete(2988, required));
        assert!(can_complete(3600, required));
    }

    #[test]
    fn joint_presence_needs_both_sides() {
        assert_eq!(joint_active_seconds(0, 500), 0);
        assert_eq!(joint_active_seconds(500, 0), 0);
        assert_eq!(joint_active_seconds(0, 0), 0);
        assert_eq!(joint_active_seconds(1200, 900), 900);
        assert_eq!(joint_active_seconds(900, 1200), 900);
    }
}
