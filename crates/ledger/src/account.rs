use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ferrobank_core::{AccountId, Currency, Money, UserId};

/// A customer account: the single authority for one balance.
///
/// The balance is never mutated except jointly with a [`Transaction`] append
/// in the same atomic unit, so `balance == sum(tx.amount)` over the
/// account's log at all times.
///
/// [`Transaction`]: crate::transaction::Transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner_id: UserId,
    pub balance: Money,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Open a zero-balance account.
    pub fn open(owner_id: UserId, currency: Currency, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            owner_id,
            balance: Money::ZERO,
            currency,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether applying `delta` would push the balance below zero.
    ///
    /// Advisory only: the authoritative solvency check is the store's
    /// conditional update under a row lock.
    pub fn would_overdraw(&self, delta: Money) -> bool {
        (self.balance + delta).is_negative()
    }
}
