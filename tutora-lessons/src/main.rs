use axum::routing::{get, patch, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod models;
mod routes;
mod schema;
mod services;

use config::AppConfig;
use tutora_shared::clients::db::{create_pool, DbPool};
use tutora_shared::clients::email::EmailClient;
use tutora_shared::clients::rabbitmq::RabbitMQClient;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub email: EmailClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tutora_shared::middleware::init_tracing("tutora-lessons");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url);
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let email = EmailClient::new(&config.resend_api_key, &config.from_email, &config.from_name);

    let state = Arc::new(AppState { db, config, rabbitmq, email });

    let admin_routes = Router::new()
        .route("/lessons/mark", post(routes::lessons::mark_lesson))
        .route("/lessons/unmark", post(routes::lessons::unmark_lesson));

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/bookings",
            post(routes::bookings::create_booking).get(routes::bookings::list_bookings),
        )
        .route("/bookings/:id", get(routes::bookings::get_booking))
        .route("/bookings/:id/accept", patch(routes::bookings::accept_booking))
        .route("/bookings/:id/reject", patch(routes::bookings::reject_booking))
        .nest("/admin", admin_routes)
        .route("/disputes/:id/resolve", patch(routes::disputes::resolve_dispute))
        .route("/classroom/attendance", post(routes::classroom::record_attendance))
        .route("/classroom/end-early", post(routes::classroom::end_class_early))
        .route(
            "/classroom/check-completion/:booking_id",
            get(routes::classroom::check_completion),
        )
        .route(
            "/classroom/complaints/:id/review",
            patch(routes::classroom::review_complaint),
        )
        .route("/recurring-bookings", post(routes::recurring::create_series))
        .route(
            "/recurring-bookings/:id",
            get(routes::recurring::get_series).delete(routes::recurring::delete_series),
        )
        .route(
            "/recurring-bookings/:id/cancel",
            patch(routes::recurring::cancel_series),
        )
        .route("/payments/summary", get(routes::payments::ledger_summary))
        .route("/payments/adjustment", post(routes::payments::create_adjustment))
        .route("/payments/:id/pay", patch(routes::payments::pay_transaction))
        .route(
            "/payments/teacher/:id",
            get(routes::payments::list_teacher_transactions),
        )
        .route(
            "/payments/teacher/:id/pay-all",
            patch(routes::payments::pay_all),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "tutora-lessons starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
