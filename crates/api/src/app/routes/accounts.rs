use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use ferrobank_core::AccountId;

use crate::app::{dto, errors, AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/accounts", post(open_account))
        .route("/accounts/:id", get(get_account))
        .route("/accounts/:id/balance", post(adjust_balance))
        .route("/accounts/:id/transactions", get(list_transactions))
        .route("/transfers", post(transfer))
}

async fn open_account(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::OpenAccountRequest>,
) -> axum::response::Response {
    match services
        .ledger
        .open_account(body.owner_id, &body.currency)
        .await
    {
        Ok(account) => {
            (StatusCode::CREATED, Json(dto::account_to_json(&account))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

async fn get_account(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    match services.ledger.account(AccountId::from_uuid(id)).await {
        Ok(account) => (StatusCode::OK, Json(dto::account_to_json(&account))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

async fn adjust_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
    Json(body): Json<dto::AdjustBalanceRequest>,
) -> axum::response::Response {
    let description = body
        .description
        .unwrap_or_else(|| "balance adjustment".to_string());

    match services
        .ledger
        .adjust_balance(AccountId::from_uuid(id), body.amount, &description)
        .await
    {
        Ok(tx) => (StatusCode::OK, Json(dto::transaction_to_json(&tx))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    match services.ledger.transactions(AccountId::from_uuid(id)).await {
        Ok(log) => {
            let items: Vec<_> = log.iter().map(dto::transaction_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

async fn transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::TransferRequest>,
) -> axum::response::Response {
    let description = body.description.unwrap_or_else(|| "transfer".to_string());

    match services
        .ledger
        .transfer(
            body.from_account_id,
            body.to_account_id,
            body.amount,
            &description,
        )
        .await
    {
        Ok(receipt) => (StatusCode::OK, Json(dto::transfer_to_json(&receipt))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
