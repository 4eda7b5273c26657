//! Domain error model.

use thiserror::Error;

use crate::money::Money;

/// Result type used across the engine.
pub type DomainResult<T> = Result<T, DomainError>;

/// Error taxonomy shared by every ledger and credit operation.
///
/// All operations return one of these to the caller; only notification
/// failures are swallowed internally (they are a side effect, not part of
/// the financial contract).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Unknown account or credit.
    #[error("not found")]
    NotFound,

    /// A debit would push the balance below zero.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: Money, available: Money },

    /// Malformed input (bad amount, non-positive principal/term, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A collaborator outside the engine (rate lookup) was unreachable.
    #[error("external service error: {0}")]
    ExternalService(String),

    /// Store/transaction failure.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl DomainError {
    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn insufficient_funds(requested: Money, available: Money) -> Self {
        Self::InsufficientFunds {
            requested,
            available,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}
