use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ event envelope wrapping all domain events.
///
/// Routing key format: `tutora.{domain}.{entity}.{action}`
/// Example: `tutora.lessons.booking.completed`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // Booking lifecycle events
    pub const LESSONS_BOOKING_CREATED: &str = "tutora.lessons.booking.created";
    pub const LESSONS_BOOKING_COMPLETED: &str = "tutora.lessons.booking.completed";
    pub const LESSONS_BOOKING_REVERSED: &str = "tutora.lessons.booking.reversed";
    pub const LESSONS_BOOKING_CANCELLED: &str = "tutora.lessons.booking.cancelled";
    pub const LESSONS_DISPUTE_RESOLVED: &str = "tutora.lessons.dispute.resolved";

    // Recurring series events
    pub const LESSONS_SERIES_CREATED: &str = "tutora.lessons.series.created";
    pub const LESSONS_SERIES_CANCELLED: &str = "tutora.lessons.series.cancelled";

    // Classroom events
    pub const CLASSROOM_SESSION_STARTED: &str = "tutora.classroom.session.started";
    pub const CLASSROOM_COMPLAINT_RAISED: &str = "tutora.classroom.complaint.raised";
    pub const CLASSROOM_COMPLAINT_REVIEWED: &str = "tutora.classroom.complaint.reviewed";

    // Payment ledger events
    pub const PAYMENTS_TRANSACTION_PAID: &str = "tutora.payments.transaction.paid";
    pub const PAYMENTS_TEACHER_SETTLED: &str = "tutora.payments.teacher.settled";
}

/// Common event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BookingCreated {
        pub booking_id: Uuid,
        pub teacher_id: Uuid,
        pub student_id: Uuid,
        pub scheduled_time: chrono::DateTime<chrono::Utc>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BookingCompleted {
        pub booking_id: Uuid,
        pub teacher_id: Uuid,
        pub student_id: Uuid,
        pub rate: f64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BookingReversed {
        pub booking_id: Uuid,
        pub teacher_id: Uuid,
        pub student_id: Uuid,
        pub reason: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BookingCancelled {
        pub booking_id: Uuid,
        pub teacher_id: Uuid,
        pub student_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DisputeResolved {
        pub booking_id: Uuid,
        pub resolution: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SeriesCreated {
        pub pattern_id: Uuid,
        pub teacher_id: Uuid,
        pub student_id: Uuid,
        pub booking_count: usize,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SeriesCancelled {
        pub pattern_id: Uuid,
        pub cancelled_bookings: usize,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SessionStarted {
        pub session_id: Uuid,
        pub booking_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ComplaintRaised {
        pub complaint_id: Uuid,
        pub booking_id: Uuid,
        pub reason: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ComplaintReviewed {
        pub complaint_id: Uuid,
        pub booking_id: Uuid,
        pub status: String,
        pub resolution: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TransactionPaid {
        pub transaction_id: Uuid,
        pub teacher_id: Uuid,
        pub amount: f64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TeacherSettled {
        pub teacher_id: Uuid,
        pub total_amount: f64,
        pub transaction_count: usize,
    }
}
