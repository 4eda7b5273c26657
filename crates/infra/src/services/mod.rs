//! Engine services: the boundary operations exposed to the request layer.

pub mod credit;
pub mod ledger;

pub use credit::CreditService;
pub use ledger::LedgerService;
