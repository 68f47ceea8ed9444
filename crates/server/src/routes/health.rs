use axum::Json;
use partyplanner_api::{HealthResponse, MessageResponse};

/// GET /: welcome message.
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Welcome to the Party Planner API".to_string(),
    })
}

/// GET /api/health: server liveness check.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
