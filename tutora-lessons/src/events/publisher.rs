use chrono::{DateTime, Utc};
use uuid::Uuid;

use tutora_shared::clients::rabbitmq::RabbitMQClient;
use tutora_shared::types::event::{payloads, routing_keys, Event};

const SOURCE: &str = "tutora-lessons";

pub async fn publish_booking_created(
    rabbitmq: &RabbitMQClient,
    booking_id: Uuid,
    teacher_id: Uuid,
    student_id: Uuid,
    scheduled_time: DateTime<Utc>,
    actor_id: Uuid,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::LESSONS_BOOKING_CREATED,
        payloads::BookingCreated {
            booking_id,
            teacher_id,
            student_id,
            scheduled_time,
        },
    )
    .with_user(actor_id);

    if let Err(e) = rabbitmq.publish(routing_keys::LESSONS_BOOKING_CREATED, &event).await {
        tracing::error!(error = %e, "failed to publish booking.created event");
    }
}

pub async fn publish_booking_completed(
    rabbitmq: &RabbitMQClient,
    booking_id: Uuid,
    teacher_id: Uuid,
    student_id: Uuid,
    rate: f64,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::LESSONS_BOOKING_COMPLETED,
        payloads::BookingCompleted {
            booking_id,
            teacher_id,
            student_id,
            rate,
        },
    );

    if let Err(e) = rabbitmq.publish(routing_keys::LESSONS_BOOKING_COMPLETED, &event).await {
        tracing::error!(error = %e, "failed to publish booking.completed event");
    }
}

pub async fn publish_booking_reversed(
    rabbitmq: &RabbitMQClient,
    booking_id: Uuid,
    teacher_id: Uuid,
    student_id: Uuid,
    reason: &str,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::LESSONS_BOOKING_REVERSED,
        payloads::BookingReversed {
            booking_id,
            teacher_id,
            student_id,
            reason: reason.to_string(),
        },
    );

    if let Err(e) = rabbitmq.publish(routing_keys::LESSONS_BOOKING_REVERSED, &event).await {
        tracing::error!(error = %e, "failed to publish booking.reversed event");
    }
}

pub async fn publish_booking_cancelled(
    rabbitmq: &RabbitMQClient,
    booking_id: Uuid,
    teacher_id: Uuid,
    student_id: Uuid,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::LESSONS_BOOKING_CANCELLED,
        payloads::BookingCancelled {
            booking_id,
            teacher_id,
            student_id,
        },
    );

    if let Err(e) = rabbitmq.publish(routing_keys::LESSONS_BOOKING_CANCELLED, &event).await {
        tracing::error!(error = %e, "failed to publish booking.cancelled event");
    }
}

pub async fn publish_dispute_resolved(
    rabbitmq: &RabbitMQClient,
    booking_id: Uuid,
    resolution: &str,
    admin_id: Uuid,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::LESSONS_DISPUTE_RESOLVED,
        payloads::DisputeResolved {
            booking_id,
            resolution: resolution.to_string(),
        },
    )
    .with_user(admin_id);

    if let Err(e) = rabbitmq.publish(routing_keys::LESSONS_DISPUTE_RESOLVED, &event).await {
        tracing::error!(error = %e, "failed to publish dispute.resolved event");
    }
}

pub async fn publish_series_created(
    rabbitmq: &RabbitMQClient,
    pattern_id: Uuid,
    teacher_id: Uuid,
    student_id: Uuid,
    booking_count: usize,
    actor_id: Uuid,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::LESSONS_SERIES_CREATED,
        payloads::SeriesCreated {
            pattern_id,
            teacher_id,
            student_id,
            booking_count,
        },
    )
    .with_user(actor_id);

    if let Err(e) = rabbitmq.publish(routing_keys::LESSONS_SERIES_CREATED, &event).await {
        tracing::error!(error = %e, "failed to publish series.created event");
    }
}

pub async fn publish_series_cancelled(
    rabbitmq: &RabbitMQClient,
    pattern_id: Uuid,
    cancelled_bookings: usize,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::LESSONS_SERIES_CANCELLED,
        payloads::SeriesCancelled {
            pattern_id,
            cancelled_bookings,
        },
    );

    if let Err(e) = rabbitmq.publish(routing_keys::LESSONS_SERIES_CANCELLED, &event).await {
        tracing::error!(error = %e, "failed to publish series.cancelled event");
    }
}

pub async fn publish_session_started(
    rabbitmq: &RabbitMQClient,
    session_id: Uuid,
    booking_id: Uuid,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::CLASSROOM_SESSION_STARTED,
        payloads::SessionStarted {
            session_id,
            booking_id,
        },
    );

    if let Err(e) = rabbitmq.publish(routing_keys::CLASSROOM_SESSION_STARTED, &event).await {
        tracing::error!(error = %e, "failed to publish session.started event");
    }
}

pub async fn publish_complaint_raised(
    rabbitmq: &RabbitMQClient,
    complaint_id: Uuid,
    booking_id: Uuid,
    reason: &str,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::CLASSROOM_COMPLAINT_RAISED,
        payloads::ComplaintRaised {
            complaint_id,
            booking_id,
            reason: reason.to_string(),
        },
    );

    if let Err(e) = rabbitmq.publish(routing_keys::CLASSROOM_COMPLAINT_RAISED, &event).await {
        tracing::error!(error = %e, "failed to publish complaint.raised event");
    }
}

pub async fn publish_complaint_reviewed(
    rabbitmq: &RabbitMQClient,
    complaint_id: Uuid,
    booking_id: Uuid,
    status: &str,
    resolution: &str,
    admin_id: Uuid,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::CLASSROOM_COMPLAINT_REVIEWED,
        payloads::ComplaintReviewed {
            complaint_id,
            booking_id,
            status: status.to_string(),
            resolution: resolution.to_string(),
        },
    )
    .with_user(admin_id);

    if let Err(e) = rabbitmq.publish(routing_keys::CLASSROOM_COMPLAINT_REVIEWED, &event).await {
        tracing::error!(error = %e, "failed to publish complaint.reviewed event");
    }
}

pub async fn publish_transaction_paid(
    rabbitmq: &RabbitMQClient,
    transaction_id: Uuid,
    teacher_id: Uuid,
    amount: f64,
    admin_id: Uuid,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::PAYMENTS_TRANSACTION_PAID,
        payloads::TransactionPaid {
            transaction_id,
            teacher_id,
            amount,
        },
    )
    .with_user(admin_id);

    if let Err(e) = rabbitmq.publish(routing_keys::PAYMENTS_TRANSACTION_PAID, &event).await {
        tracing::error!(error = %e, "failed to publish transaction.paid event");
    }
}

pub async fn publish_teacher_settled(
    rabbitmq: &RabbitMQClient,
    teacher_id: Uuid,
    total_amount: f64,
    transaction_count: usize,
    admin_id: Uuid,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::PAYMENTS_TEACHER_SETTLED,
        payloads::TeacherSettled {
            teacher_id,
            total_amount,
            transaction_count,
        },
    )
    .with_user(admin_id);

    if let Err(e) = rabbitmq.publish(routing_keys::PAYMENTS_TEACHER_SETTLED, &event).await {
        tracing::error!(error = %e, "failed to publish teacher.settled event");
    }
}
