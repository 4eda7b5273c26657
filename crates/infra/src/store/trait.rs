//! Store contract consumed by the engine services and the payment sweep.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use ferrobank_core::{AccountId, CreditId, Currency, DomainResult, EntryId, Money, UserId};
use ferrobank_credit::{Credit, PaymentEntry};
use ferrobank_ledger::{Account, Transaction, TransactionKind};

/// Both committed legs of a transfer. The debit leg carries a negative
/// amount, the credit leg a positive one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub debit: Transaction,
    pub credit: Transaction,
}

/// A pending schedule entry due for settlement, joined with the account the
/// parent credit draws from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueInstallment {
    pub entry: PaymentEntry,
    pub account_id: AccountId,
}

/// Outcome of settling one installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Debit committed and the entry is `Paid`. `credit_closed` is set when
    /// this left every entry of the credit paid.
    Paid { credit_closed: bool },
    /// Insufficient funds: the entry and its parent credit are `Overdue`.
    Overdue,
    /// The entry was no longer `Pending`; nothing was done.
    AlreadySettled,
}

/// Transactional persistence boundary.
///
/// Every method that touches more than one row executes as a single atomic
/// unit under row-level locking; a failure on any step rolls the whole unit
/// back. Implementations must never check a balance in one statement and
/// write it in another.
#[async_trait]
pub trait BankStore: Send + Sync {
    async fn create_account(&self, owner_id: UserId, currency: Currency) -> DomainResult<Account>;

    async fn account(&self, id: AccountId) -> DomainResult<Option<Account>>;

    /// Apply a signed delta and append the matching transaction as one
    /// atomic unit. The solvency check is a conditional update evaluated
    /// under the account's row lock.
    async fn adjust_balance(
        &self,
        account_id: AccountId,
        amount: Money,
        kind: TransactionKind,
        description: &str,
    ) -> DomainResult<Transaction>;

    /// Account history, newest first.
    async fn transactions(&self, account_id: AccountId) -> DomainResult<Vec<Transaction>>;

    /// Move `amount` between two accounts atomically, appending one signed
    /// transaction per leg. Row locks are taken in ascending account-id
    /// order regardless of direction.
    async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Money,
        description: &str,
    ) -> DomainResult<TransferReceipt>;

    /// Persist a credit with its full schedule and disburse the principal
    /// into the account, all in one atomic unit.
    async fn create_credit(
        &self,
        credit: Credit,
        entries: Vec<PaymentEntry>,
    ) -> DomainResult<Credit>;

    async fn credit(&self, id: CreditId) -> DomainResult<Option<Credit>>;

    /// Schedule entries ordered by due date. Fails `NotFound` for an
    /// unknown credit.
    async fn schedule(&self, credit_id: CreditId) -> DomainResult<Vec<PaymentEntry>>;

    /// Pending entries with `due_date <= as_of` across all credits, oldest
    /// first.
    async fn due_installments(&self, as_of: DateTime<Utc>) -> DomainResult<Vec<DueInstallment>>;

    /// Settle one installment: debit the account, mark the entry `Paid`
    /// (or `Overdue` on insufficient funds, together with its credit) as one
    /// atomic unit. Re-checks that the entry is still `Pending` under the
    /// row lock, which is what makes the sweep idempotent.
    async fn settle_installment(
        &self,
        entry_id: EntryId,
        now: DateTime<Utc>,
    ) -> DomainResult<SettlementOutcome>;
}
