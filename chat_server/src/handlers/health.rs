//! Health check, grounded in `notify_server::handlers::health`.

use axum::extract::State;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

pub async fn health_check(State(_state): State<AppState>) -> impl IntoResponse {
    axum::Json(HealthResponse {
        status: "healthy",
        service: "chat_server",
    })
}
