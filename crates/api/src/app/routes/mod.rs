use axum::{http::StatusCode, response::IntoResponse, Json, Router};

pub mod accounts;
pub mod credits;

pub fn router() -> Router {
    Router::new()
        .merge(accounts::router())
        .merge(credits::router())
}

/// Liveness probe.
pub async fn health() -> axum::response::Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response()
}
