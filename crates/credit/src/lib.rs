//! Credit module (loan origination + amortization).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod amortization;
pub mod credit;

pub use amortization::{annuity_schedule, ScheduleLine};
pub use credit::{Credit, CreditStatus, EntryStatus, PaymentEntry};
