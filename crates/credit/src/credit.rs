use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ferrobank_core::{AccountId, CreditId, DomainError, EntryId, Money};

use crate::amortization::ScheduleLine;

/// Lifecycle of a credit.
///
/// Created `Active`; the payment sweep drives the transitions to `Overdue`
/// (a missed installment) and `Closed` (every entry paid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditStatus {
    Active,
    Overdue,
    Closed,
}

impl CreditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditStatus::Active => "active",
            CreditStatus::Overdue => "overdue",
            CreditStatus::Closed => "closed",
        }
    }
}

impl FromStr for CreditStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CreditStatus::Active),
            "overdue" => Ok(CreditStatus::Overdue),
            "closed" => Ok(CreditStatus::Closed),
            other => Err(DomainError::validation(format!(
                "unknown credit status {other:?}"
            ))),
        }
    }
}

/// Lifecycle of one schedule entry. Only this and `paid_at` ever mutate
/// after the schedule is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Paid,
    Overdue,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Paid => "paid",
            EntryStatus::Overdue => "overdue",
        }
    }
}

impl FromStr for EntryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EntryStatus::Pending),
            "paid" => Ok(EntryStatus::Paid),
            "overdue" => Ok(EntryStatus::Overdue),
            other => Err(DomainError::validation(format!(
                "unknown entry status {other:?}"
            ))),
        }
    }
}

/// An annuity loan against exactly one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub id: CreditId,
    pub account_id: AccountId,
    pub principal: Money,
    /// Annual rate in percent.
    pub interest_rate: Decimal,
    pub term_months: u32,
    pub start_date: DateTime<Utc>,
    pub status: CreditStatus,
    pub created_at: DateTime<Utc>,
}

impl Credit {
    pub fn originate(
        account_id: AccountId,
        principal: Money,
        interest_rate: Decimal,
        term_months: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CreditId::new(),
            account_id,
            principal,
            interest_rate,
            term_months,
            start_date: now,
            status: CreditStatus::Active,
            created_at: now,
        }
    }
}

/// One installment of a credit's payment schedule.
///
/// The full sequence is generated at origination and never regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub id: EntryId,
    pub credit_id: CreditId,
    pub due_date: DateTime<Utc>,
    pub amount: Money,
    pub principal: Money,
    pub interest: Money,
    pub status: EntryStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentEntry {
    pub fn from_line(credit_id: CreditId, line: ScheduleLine) -> Self {
        Self {
            id: EntryId::new(),
            credit_id,
            due_date: line.due_date,
            amount: line.amount,
            principal: line.principal,
            interest: line.interest,
            status: EntryStatus::Pending,
            paid_at: None,
        }
    }
}
