use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ferrobank_core::{AccountId, DomainError, Money, TransactionId};

/// Balance-affecting event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionKind {
    /// Kind of a plain balance adjustment, derived from its sign.
    ///
    /// Transfer legs are tagged [`TransactionKind::Transfer`] explicitly by
    /// the coordinator instead of going through this derivation.
    pub fn from_amount(amount: Money) -> Self {
        if amount.is_negative() {
            TransactionKind::Withdrawal
        } else {
            TransactionKind::Deposit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Transfer => "transfer",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdrawal" => Ok(TransactionKind::Withdrawal),
            "transfer" => Ok(TransactionKind::Transfer),
            other => Err(DomainError::validation(format!(
                "unknown transaction kind {other:?}"
            ))),
        }
    }
}

/// One row of the per-account transaction log.
///
/// Immutable once written: never updated or deleted. The signed `amount`
/// (negative = debit, positive = credit) is what makes per-account sums
/// equal the balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub amount: Money,
    pub kind: TransactionKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn record(
        account_id: AccountId,
        amount: Money,
        kind: TransactionKind,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            account_id,
            amount,
            kind,
            description: description.into(),
            created_at: now,
        }
    }
}

/// Sum of signed amounts over a transaction log.
///
/// For a complete committed log this equals the account balance.
pub fn balance_of<'a, I>(log: I) -> Money
where
    I: IntoIterator<Item = &'a Transaction>,
{
    log.into_iter()
        .fold(Money::ZERO, |total, tx| total + tx.amount)
}
