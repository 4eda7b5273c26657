//! Infrastructure layer: persistent store, engine services, background
//! sweep, and collaborator contracts (rates, notifications).

pub mod notify;
pub mod rates;
pub mod schema;
pub mod services;
pub mod store;
pub mod sweep;

pub use notify::{LogNotifier, Notifier};
pub use rates::{FixedRateProvider, RateProvider};
pub use services::{CreditService, LedgerService};
pub use store::{
    BankStore, DueInstallment, InMemoryBankStore, PostgresBankStore, SettlementOutcome,
    TransferReceipt,
};
pub use sweep::{PaymentSweep, SweepHandle, SweepReport};
