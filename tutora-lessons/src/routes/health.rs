use axum::Json;

use tutora_shared::types::api::{ApiResponse, HealthResponse};

pub async fn health_check() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse::healthy(
        "tutora-lessons",
        env!("CARGO_PKG_VERSION"),
    )))
}
