//! HTTP API application wiring (Axum router + service wiring).
//!
//! This folder is structured like:
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use ferrobank_infra::{CreditService, LedgerService};

pub mod dto;
pub mod errors;
pub mod routes;

/// Engine services shared by the handlers.
#[derive(Clone)]
pub struct AppServices {
    pub ledger: LedgerService,
    pub credits: CreditService,
}

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: AppServices) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .merge(routes::router())
        .layer(ServiceBuilder::new().layer(Extension(Arc::new(services))))
}
