//! `ferrobank-api` — thin HTTP adapter over the ledger & credit engine.
//!
//! No financial logic lives here: handlers validate the wire shape, call
//! the engine services and map `DomainError` to status codes.

pub mod app;
pub mod config;
