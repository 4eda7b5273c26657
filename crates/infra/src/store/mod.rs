//! Persistence: the [`BankStore`] contract and its implementations.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryBankStore;
pub use postgres::PostgresBankStore;
pub use r#trait::{BankStore, DueInstallment, SettlementOutcome, TransferReceipt};

/// Ledger description attached to a credit disbursement.
pub(crate) const DISBURSEMENT_DESCRIPTION: &str = "credit disbursement";

/// Ledger description attached to a settled installment.
pub(crate) const INSTALLMENT_DESCRIPTION: &str = "installment payment";
