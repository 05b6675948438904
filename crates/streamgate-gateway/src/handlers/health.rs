//! Liveness endpoint.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

/// GET /health
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "streamgate" })),
    )
}
