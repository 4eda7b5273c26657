//! In-memory implementation of [`BankStore`].
//!
//! Intended for tests/dev. One mutex guards all state, so every operation
//! is naturally a single atomic unit; checks are performed before the first
//! mutation so a failed operation leaves nothing behind, mirroring the
//! rollback behavior of the Postgres store.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use ferrobank_core::{
    AccountId, CreditId, Currency, DomainError, DomainResult, EntryId, Money, UserId,
};
use ferrobank_credit::{Credit, CreditStatus, EntryStatus, PaymentEntry};
use ferrobank_ledger::{Account, Transaction, TransactionKind};

use super::r#trait::{BankStore, DueInstallment, SettlementOutcome, TransferReceipt};
use super::{DISBURSEMENT_DESCRIPTION, INSTALLMENT_DESCRIPTION};

#[derive(Debug, Default)]
struct MemState {
    accounts: HashMap<AccountId, Account>,
    transactions: Vec<Transaction>,
    credits: HashMap<CreditId, Credit>,
    entries: HashMap<EntryId, PaymentEntry>,
}

impl MemState {
    /// Signed delta with the solvency check and the write as one step
    /// (the caller holds the state lock).
    fn apply_delta(&mut self, account_id: AccountId, delta: Money, now: DateTime<Utc>) -> DomainResult<()> {
        let account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(DomainError::NotFound)?;

        let next = account.balance + delta;
        if next.is_negative() {
            return Err(DomainError::insufficient_funds(delta.abs(), account.balance));
        }

        account.balance = next;
        account.updated_at = now;
        Ok(())
    }

    fn append(&mut self, transaction: Transaction) -> Transaction {
        self.transactions.push(transaction.clone());
        transaction
    }
}

/// Mutex-guarded store with the same semantics as the Postgres one.
#[derive(Debug, Default)]
pub struct InMemoryBankStore {
    state: Mutex<MemState>,
}

impl InMemoryBankStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> DomainResult<std::sync::MutexGuard<'_, MemState>> {
        self.state
            .lock()
            .map_err(|_| DomainError::persistence("store mutex poisoned"))
    }
}

#[async_trait::async_trait]
impl BankStore for InMemoryBankStore {
    async fn create_account(&self, owner_id: UserId, currency: Currency) -> DomainResult<Account> {
        let account = Account::open(owner_id, currency, Utc::now());
        self.lock()?.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn account(&self, id: AccountId) -> DomainResult<Option<Account>> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn adjust_balance(
        &self,
        account_id: AccountId,
        amount: Money,
        kind: TransactionKind,
        description: &str,
    ) -> DomainResult<Transaction> {
        let now = Utc::now();
        let mut state = self.lock()?;

        state.apply_delta(account_id, amount, now)?;
        Ok(state.append(Transaction::record(
            account_id,
            amount,
            kind,
            description,
            now,
        )))
    }

    async fn transactions(&self, account_id: AccountId) -> DomainResult<Vec<Transaction>> {
        let state = self.lock()?;
        if !state.accounts.contains_key(&account_id) {
            return Err(DomainError::NotFound);
        }

        let mut log: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|tx| tx.account_id == account_id)
            .cloned()
            .collect();
        log.reverse();
        Ok(log)
    }

    async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Money,
        description: &str,
    ) -> DomainResult<TransferReceipt> {
        let now = Utc::now();
        let mut state = self.lock()?;

        // All-or-nothing: every check that can fail comes before the first
        // mutation.
        if !state.accounts.contains_key(&from) || !state.accounts.contains_key(&to) {
            return Err(DomainError::NotFound);
        }
        if !amount.is_positive() {
            return Err(DomainError::validation("transfer amount must be positive"));
        }
        state.apply_delta(from, -amount, now)?;
        state.apply_delta(to, amount, now)?;

        let debit = state.append(Transaction::record(
            from,
            -amount,
            TransactionKind::Transfer,
            description,
            now,
        ));
        let credit = state.append(Transaction::record(
            to,
            amount,
            TransactionKind::Transfer,
            description,
            now,
        ));
        Ok(TransferReceipt { debit, credit })
    }

    async fn create_credit(
        &self,
        credit: Credit,
        entries: Vec<PaymentEntry>,
    ) -> DomainResult<Credit> {
        let now = Utc::now();
        let mut state = self.lock()?;

        if !state.accounts.contains_key(&credit.account_id) {
            return Err(DomainError::NotFound);
        }

        // Disburse first: it is the only step that can fail, and nothing has
        // been written yet if it does.
        state.apply_delta(credit.account_id, credit.principal, now)?;
        state.append(Transaction::record(
            credit.account_id,
            credit.principal,
            TransactionKind::Deposit,
            DISBURSEMENT_DESCRIPTION,
            now,
        ));

        state.credits.insert(credit.id, credit.clone());
        for entry in entries {
            state.entries.insert(entry.id, entry);
        }

        Ok(credit)
    }

    async fn credit(&self, id: CreditId) -> DomainResult<Option<Credit>> {
        Ok(self.lock()?.credits.get(&id).cloned())
    }

    async fn schedule(&self, credit_id: CreditId) -> DomainResult<Vec<PaymentEntry>> {
        let state = self.lock()?;
        if !state.credits.contains_key(&credit_id) {
            return Err(DomainError::NotFound);
        }

        let mut entries: Vec<PaymentEntry> = state
            .entries
            .values()
            .filter(|e| e.credit_id == credit_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.due_date);
        Ok(entries)
    }

    async fn due_installments(&self, as_of: DateTime<Utc>) -> DomainResult<Vec<DueInstallment>> {
        let state = self.lock()?;

        let mut due: Vec<DueInstallment> = state
            .entries
            .values()
            .filter(|e| e.status == EntryStatus::Pending && e.due_date <= as_of)
            .map(|e| {
                let account_id = state
                    .credits
                    .get(&e.credit_id)
                    .map(|c| c.account_id)
                    .ok_or_else(|| DomainError::persistence("entry without parent credit"))?;
                Ok(DueInstallment {
                    entry: e.clone(),
                    account_id,
                })
            })
            .collect::<DomainResult<_>>()?;
        due.sort_by_key(|d| d.entry.due_date);
        Ok(due)
    }

    async fn settle_installment(
        &self,
        entry_id: EntryId,
        now: DateTime<Utc>,
    ) -> DomainResult<SettlementOutcome> {
        let mut state = self.lock()?;

        let entry = state
            .entries
            .get(&entry_id)
            .cloned()
            .ok_or(DomainError::NotFound)?;
        if entry.status != EntryStatus::Pending {
            return Ok(SettlementOutcome::AlreadySettled);
        }

        let credit = state
            .credits
            .get(&entry.credit_id)
            .cloned()
            .ok_or(DomainError::NotFound)?;

        match state.apply_delta(credit.account_id, -entry.amount, now) {
            Ok(()) => {
                state.append(Transaction::record(
                    credit.account_id,
                    -entry.amount,
                    TransactionKind::Withdrawal,
                    INSTALLMENT_DESCRIPTION,
                    now,
                ));

                if let Some(stored) = state.entries.get_mut(&entry_id) {
                    stored.status = EntryStatus::Paid;
                    stored.paid_at = Some(now);
                }

                let credit_closed = state
                    .entries
                    .values()
                    .filter(|e| e.credit_id == entry.credit_id)
                    .all(|e| e.status == EntryStatus::Paid);
                if credit_closed {
                    if let Some(stored) = state.credits.get_mut(&entry.credit_id) {
                        stored.status = CreditStatus::Closed;
                    }
                }

                Ok(SettlementOutcome::Paid { credit_closed })
            }
            Err(DomainError::InsufficientFunds { .. }) => {
                if let Some(stored) = state.entries.get_mut(&entry_id) {
                    stored.status = EntryStatus::Overdue;
                }
                if let Some(stored) = state.credits.get_mut(&entry.credit_id) {
                    stored.status = CreditStatus::Overdue;
                }
                Ok(SettlementOutcome::Overdue)
            }
            Err(e) => Err(e),
        }
    }
}
