use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Fallback handler for unmatched routes.
///
/// The body shape is part of the public API contract:
/// `{"status": "error", "message": "Route not found"}`.
pub async fn not_found() -> Response {
    let body = Json(json!({
        "status": "error",
        "message": "Route not found",
    }));

    (StatusCode::NOT_FOUND, body).into_response()
}
