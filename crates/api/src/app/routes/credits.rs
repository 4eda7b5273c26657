use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use ferrobank_core::CreditId;

use crate::app::{dto, errors, AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/credits", post(create_credit))
        .route("/credits/:id", get(get_credit))
        .route("/credits/:id/schedule", get(get_schedule))
}

async fn create_credit(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateCreditRequest>,
) -> axum::response::Response {
    match services
        .credits
        .create_credit(body.account_id, body.principal, body.term_months)
        .await
    {
        Ok(credit) => (StatusCode::CREATED, Json(dto::credit_to_json(&credit))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

async fn get_credit(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    match services.credits.credit(CreditId::from_uuid(id)).await {
        Ok(credit) => (StatusCode::OK, Json(dto::credit_to_json(&credit))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

async fn get_schedule(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    match services.credits.schedule(CreditId::from_uuid(id)).await {
        Ok(entries) => {
            let items: Vec<_> = entries.iter().map(dto::schedule_entry_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}
