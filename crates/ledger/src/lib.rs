//! Ledger module (accounts + append-only transaction log).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod account;
pub mod transaction;

pub use account::Account;
pub use transaction::{balance_of, Transaction, TransactionKind};
