//! Account ledger + transfer coordinator: the single write path to balances.

use std::sync::Arc;

use tracing::warn;

use ferrobank_core::{AccountId, DomainError, DomainResult, Money, UserId};
use ferrobank_ledger::{Account, Transaction, TransactionKind};

use crate::notify::Notifier;
use crate::store::{BankStore, TransferReceipt};

#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn BankStore>,
    notifier: Arc<dyn Notifier>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn BankStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Open a zero-balance account for `owner_id`.
    ///
    /// Ownership/authorization checks are the caller's concern; the engine
    /// trusts the acting user has been verified.
    pub async fn open_account(&self, owner_id: UserId, currency: &str) -> DomainResult<Account> {
        let currency = currency.parse()?;
        self.store.create_account(owner_id, currency).await
    }

    pub async fn account(&self, id: AccountId) -> DomainResult<Account> {
        self.store.account(id).await?.ok_or(DomainError::NotFound)
    }

    /// Apply a signed delta to an account, appending the matching
    /// transaction in the same atomic unit.
    ///
    /// The kind is derived from the sign: positive is a deposit, negative a
    /// withdrawal. Transfers never go through here.
    pub async fn adjust_balance(
        &self,
        account_id: AccountId,
        amount: Money,
        description: &str,
    ) -> DomainResult<Transaction> {
        if amount.is_zero() {
            return Err(DomainError::validation("amount must be non-zero"));
        }

        let kind = TransactionKind::from_amount(amount);
        let transaction = self
            .store
            .adjust_balance(account_id, amount, kind, description)
            .await?;

        self.notify_payment(account_id, amount).await;
        Ok(transaction)
    }

    /// Account history, newest first.
    pub async fn transactions(&self, account_id: AccountId) -> DomainResult<Vec<Transaction>> {
        self.store.transactions(account_id).await
    }

    /// Move funds between two accounts as one atomic unit, recording one
    /// signed transaction per leg.
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Money,
        description: &str,
    ) -> DomainResult<TransferReceipt> {
        if !amount.is_positive() {
            return Err(DomainError::validation("transfer amount must be positive"));
        }
        if from == to {
            return Err(DomainError::validation(
                "transfer requires two distinct accounts",
            ));
        }

        let receipt = self.store.transfer(from, to, amount, description).await?;
        self.notify_payment(from, amount).await;
        Ok(receipt)
    }

    /// Best-effort: a notifier failure is logged, never surfaced.
    async fn notify_payment(&self, account_id: AccountId, amount: Money) {
        if let Err(e) = self
            .notifier
            .payment_processed(account_id, amount.abs())
            .await
        {
            warn!(account_id = %account_id, error = %e, "payment notification failed");
        }
    }
}
