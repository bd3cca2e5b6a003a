use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::{
    bookings, class_complaints, classroom_sessions, payment_transactions, recurring_patterns,
    session_heartbeats, students, teachers,
};

// --- Status enums ---
//
// Statuses are persisted as strings (Diesel CLI schema style) and parsed at
// the service boundary. The transition graph lives on `BookingStatus` so
// every status write goes through one guard.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
    Disputed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Disputed => "disputed",
        }
    }

    /// Legal lifecycle edges. Each edge is owned by exactly one operation:
    ///
    /// - pending -> accepted/rejected: teacher responds to a request
    /// - pending -> completed/cancelled: complaint review re-adjudicates a
    ///   class that was ended early (the booking was parked in pending)
    /// - pending/accepted -> disputed: complaint escalated to under review
    /// - accepted -> completed: admin mark-complete
    /// - accepted -> cancelled: cancellation (direct or via series cancel)
    /// - accepted -> pending: early-end resubmission
    /// - completed -> accepted: administrative reversal (unmark)
    /// - disputed -> completed/cancelled: booking-level dispute resolution
    pub fn can_transition(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Rejected)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (Pending, Disputed)
                | (Accepted, Completed)
                | (Accepted, Cancelled)
                | (Accepted, Disputed)
                | (Accepted, Pending)
                | (Completed, Accepted)
                | (Disputed, Completed)
                | (Disputed, Cancelled)
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "disputed" => Ok(Self::Disputed),
            _ => Err(format!("unknown booking status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Waiting,
    Active,
    Completed,
    EndedEarly,
    Incomplete,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::EndedEarly => "ended-early",
            Self::Incomplete => "incomplete",
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "ended-early" => Ok(Self::EndedEarly),
            "incomplete" => Ok(Self::Incomplete),
            _ => Err(format!("unknown session status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplaintStatus {
    Pending,
    Approved,
    Rejected,
    UnderReview,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::UnderReview => "under_review",
        }
    }

    /// Approved/rejected complaints are terminal once a resolution has
    /// been applied.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl std::str::FromStr for ComplaintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "under_review" => Ok(Self::UnderReview),
            _ => Err(format!("unknown complaint status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplaintResolution {
    MarkComplete,
    MarkIncomplete,
    RefundStudent,
    NoAction,
}

impl ComplaintResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarkComplete => "mark_complete",
            Self::MarkIncomplete => "mark_incomplete",
            Self::RefundStudent => "refund_student",
            Self::NoAction => "no_action",
        }
    }
}

impl std::str::FromStr for ComplaintResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mark_complete" => Ok(Self::MarkComplete),
            "mark_incomplete" => Ok(Self::MarkIncomplete),
            "refund_student" => Ok(Self::RefundStudent),
            "no_action" => Ok(Self::NoAction),
            _ => Err(format!("unknown complaint resolution: {s}")),
        }
    }
}

/// Outcome of a booking-level dispute. The stored value records who the
/// resolution favoured (`approved_teacher`/`approved_student`); the request
/// verbs are `approve_teacher`/`approve_student`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisputeResolution {
    ApprovedTeacher,
    ApprovedStudent,
}

impl DisputeResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApprovedTeacher => "approved_teacher",
            Self::ApprovedStudent => "approved_student",
        }
    }

    pub fn from_request(s: &str) -> Result<Self, String> {
        match s {
            "approve_teacher" => Ok(Self::ApprovedTeacher),
            "approve_student" => Ok(Self::ApprovedStudent),
            _ => Err(format!("unknown dispute resolution: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    ClassCompletion,
    ManualAdjustment,
    Bonus,
    Deduction,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassCompletion => "class_completion",
            Self::ManualAdjustment => "manual_adjustment",
            Self::Bonus => "bonus",
            Self::Deduction => "deduction",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "class_completion" => Ok(Self::ClassCompletion),
            "manual_adjustment" => Ok(Self::ManualAdjustment),
            "bonus" => Ok(Self::Bonus),
            "deduction" => Ok(Self::Deduction),
            _ => Err(format!("unknown transaction type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Paid,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("unknown transaction status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(format!("unknown frequency: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantRole {
    Teacher,
    Student,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }
}

impl std::str::FromStr for ParticipantRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teacher" => Ok(Self::Teacher),
            "student" => Ok(Self::Student),
            _ => Err(format!("unknown participant role: {s}")),
        }
    }
}

// --- Teacher / Student ---
//
// Profile CRUD lives in the user service; this service only reads the
// fields the lifecycle engine mutates (credit balance, earnings counters).

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = teachers)]
pub struct Teacher {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub rate_per_class: f64,
    pub earned: f64,
    pub lessons_completed: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = students)]
pub struct Student {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub no_of_classes: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

// --- Booking ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = bookings)]
pub struct Booking {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub class_title: String,
    pub topic: Option<String>,
    pub scheduled_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: String,
    pub created_by_role: String,
    pub created_by: Uuid,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub admin_rejected: bool,
    pub admin_rejected_reason: Option<String>,
    pub admin_rejected_by: Option<Uuid>,
    pub admin_rejected_at: Option<DateTime<Utc>>,
    pub dispute_resolution: Option<String>,
    pub dispute_resolved_by: Option<Uuid>,
    pub dispute_resolved_at: Option<DateTime<Utc>>,
    pub recurring_pattern_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = bookings)]
pub struct NewBooking {
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub class_title: String,
    pub topic: Option<String>,
    pub scheduled_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: String,
    pub created_by_role: String,
    pub created_by: Uuid,
    pub recurring_pattern_id: Option<Uuid>,
}

// --- ClassroomSession ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = classroom_sessions)]
pub struct ClassroomSession {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub teacher_joined_at: Option<DateTime<Utc>>,
    pub teacher_left_at: Option<DateTime<Utc>>,
    pub student_joined_at: Option<DateTime<Utc>>,
    pub student_left_at: Option<DateTime<Utc>>,
    pub teacher_active_seconds: i32,
    pub student_active_seconds: i32,
    pub both_active_seconds: i32,
    pub required_seconds: i32,
    pub class_started_at: Option<DateTime<Utc>>,
    pub class_ended_at: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = classroom_sessions)]
pub struct NewClassroomSession {
    pub booking_id: Uuid,
    pub required_seconds: i32,
    pub status: String,
}

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = session_heartbeats)]
pub struct SessionHeartbeat {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: String,
    pub recorded_at: DateTime<Utc>,
    pub active_seconds: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = session_heartbeats)]
pub struct NewSessionHeartbeat {
    pub session_id: Uuid,
    pub role: String,
    pub recorded_at: DateTime<Utc>,
    pub active_seconds: i32,
}

// --- ClassComplaint ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = class_complaints)]
pub struct ClassComplaint {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub reason: String,
    pub reported_by: String,
    pub description: Option<String>,
    pub teacher_active_seconds: i32,
    pub student_active_seconds: i32,
    pub both_active_seconds: i32,
    pub required_seconds: i32,
    pub ended_at: DateTime<Utc>,
    pub ended_by: String,
    pub status: String,
    pub resolution: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = class_complaints)]
pub struct NewClassComplaint {
    pub booking_id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub reason: String,
    pub reported_by: String,
    pub description: Option<String>,
    pub teacher_active_seconds: i32,
    pub student_active_seconds: i32,
    pub both_active_seconds: i32,
    pub required_seconds: i32,
    pub ended_at: DateTime<Utc>,
    pub ended_by: String,
    pub status: String,
}

// --- PaymentTransaction ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = payment_transactions)]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub amount: f64,
    pub transaction_type: String,
    pub status: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_by: Option<Uuid>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payment_transactions)]
pub struct NewPaymentTransaction {
    pub teacher_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub amount: f64,
    pub transaction_type: String,
    pub status: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

// --- RecurringPattern ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = recurring_patterns)]
pub struct RecurringPattern {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub class_title: String,
    pub start_time: DateTime<Utc>,
    pub frequency: String,
    pub occurrences: i32,
    pub days_of_week: Option<Vec<i32>>,
    pub status: String,
    pub created_by: Uuid,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = recurring_patterns)]
pub struct NewRecurringPattern {
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub class_title: String,
    pub start_time: DateTime<Utc>,
    pub frequency: String,
    pub occurrences: i32,
    pub days_of_week: Option<Vec<i32>>,
    pub status: String,
    pub created_by: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [BookingStatus; 6] = [
        BookingStatus::Pending,
        BookingStatus::Accepted,
        BookingStatus::Rejected,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::Disputed,
    ];

    #[test]
    fn transition_graph_matches_lifecycle() {
        use BookingStatus::*;

        let allowed = [
            (Pending, Accepted),
            (Pending, Rejected),
            (Pending, Completed),
            (Pending, Cancelled),
            (Pending, Disputed),
            (Accepted, Completed),
            (Accepted, Cancelled),
            (Accepted, Disputed),
            (Accepted, Pending),
            (Completed, Accepted),
            (Disputed, Completed),
            (Disputed, Cancelled),
        ];

        for from in ALL {
            for to in ALL {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition(to),
                    expected,
                    "transition {from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn rejected_and_cancelled_are_terminal() {
        for to in ALL {
            assert!(!BookingStatus::Rejected.can_transition(to));
            assert!(!BookingStatus::Cancelled.can_transition(to));
        }
    }

    #[test]
    fn status_strings_round_trip() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert!("unknown".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn dispute_resolution_request_verbs() {
        assert_eq!(
            DisputeResolution::from_request("approve_teacher").unwrap(),
            DisputeResolution::ApprovedTeacher
        );
        assert_eq!(
            DisputeResolution::from_request("approve_student").unwrap(),
            DisputeResolution::ApprovedStudent
        );
        assert!(DisputeResolution::from_request("approved_teacher").is_err());
    }

    #[test]
    fn terminal_complaint_statuses() {
        assert!(ComplaintStatus::Approved.is_terminal());
        assert!(ComplaintStatus::Rejected.is_terminal());
        assert!(!ComplaintStatus::Pending.is_terminal());
        assert!(!ComplaintStatus::UnderReview.is_terminal());
    }
}
