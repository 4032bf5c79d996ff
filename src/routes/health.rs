use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::result::success_to_api_response;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
}

pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        success_to_api_response(HealthResponse {
            status: "ok".to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }),
    )
}
