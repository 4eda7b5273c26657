//! Postgres-backed implementation of [`BankStore`].
//!
//! Every multi-step mutation runs inside one sqlx transaction. Solvency is
//! enforced with a single conditional `UPDATE … WHERE balance + delta >= 0`
//! evaluated under the account's row lock; reading the balance and deciding
//! in a separate statement from the write would race and is never done here.
//! A transaction that is dropped without commit rolls back, so every early
//! error return discards the whole unit.
//!
//! ## Lock ordering
//!
//! Operations touching two accounts (transfers) take their row locks in
//! ascending account-id order regardless of which side is source or
//! destination, so two opposite-direction transfers between the same pair
//! cannot deadlock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row};
use tracing::instrument;
use uuid::Uuid;

use ferrobank_core::{
    AccountId, CreditId, Currency, DomainError, DomainResult, EntryId, Money, TransactionId,
    UserId,
};
use ferrobank_credit::{Credit, CreditStatus, EntryStatus, PaymentEntry};
use ferrobank_ledger::{Account, Transaction, TransactionKind};

use super::r#trait::{BankStore, DueInstallment, SettlementOutcome, TransferReceipt};
use super::{DISBURSEMENT_DESCRIPTION, INSTALLMENT_DESCRIPTION};

type PgTx<'c> = sqlx::Transaction<'c, Postgres>;

/// Postgres store. Cheap to clone; all operations go through the shared
/// connection pool.
#[derive(Debug, Clone)]
pub struct PostgresBankStore {
    pool: Arc<PgPool>,
}

impl PostgresBankStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl BankStore for PostgresBankStore {
    #[instrument(skip(self), fields(owner_id = %owner_id), err)]
    async fn create_account(&self, owner_id: UserId, currency: Currency) -> DomainResult<Account> {
        let account = Account::open(owner_id, currency, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO accounts (id, owner_id, balance, currency, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(account.owner_id.as_uuid())
        .bind(account.balance.as_decimal())
        .bind(account.currency.as_str())
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_account", e))?;

        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn account(&self, id: AccountId) -> DomainResult<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, balance, currency, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("account", e))?;

        row.map(|r| AccountRow::read(&r)?.into_account()).transpose()
    }

    #[instrument(skip(self, description), fields(account_id = %account_id, amount = %amount), err)]
    async fn adjust_balance(
        &self,
        account_id: AccountId,
        amount: Money,
        kind: TransactionKind,
        description: &str,
    ) -> DomainResult<Transaction> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        apply_delta(&mut tx, account_id, amount, now).await?;
        let transaction = append_transaction(
            &mut tx,
            Transaction::record(account_id, amount, kind, description, now),
        )
        .await?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(transaction)
    }

    #[instrument(skip(self), fields(account_id = %account_id), err)]
    async fn transactions(&self, account_id: AccountId) -> DomainResult<Vec<Transaction>> {
        let exists = sqlx::query("SELECT 1 FROM accounts WHERE id = $1")
            .bind(account_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("transactions", e))?;
        if exists.is_none() {
            return Err(DomainError::NotFound);
        }

        let rows = sqlx::query(
            r#"
            SELECT id, account_id, amount, kind, description, created_at
            FROM transactions
            WHERE account_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("transactions", e))?;

        rows.iter()
            .map(|r| TransactionRow::read(r)?.into_transaction())
            .collect()
    }

    #[instrument(skip(self, description), fields(from = %from, to = %to, amount = %amount), err)]
    async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Money,
        description: &str,
    ) -> DomainResult<TransferReceipt> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        // Deterministic lock order over the pair, not source-first.
        let (first, second) = if from <= to { (from, to) } else { (to, from) };
        lock_account(&mut tx, first).await?;
        lock_account(&mut tx, second).await?;

        apply_delta(&mut tx, from, -amount, now).await?;
        apply_delta(&mut tx, to, amount, now).await?;

        let debit = append_transaction(
            &mut tx,
            Transaction::record(from, -amount, TransactionKind::Transfer, description, now),
        )
        .await?;
        let credit = append_transaction(
            &mut tx,
            Transaction::record(to, amount, TransactionKind::Transfer, description, now),
        )
        .await?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(TransferReceipt { debit, credit })
    }

    #[instrument(skip(self, entries), fields(credit_id = %credit.id, account_id = %credit.account_id, entry_count = entries.len()), err)]
    async fn create_credit(
        &self,
        credit: Credit,
        entries: Vec<PaymentEntry>,
    ) -> DomainResult<Credit> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        lock_account(&mut tx, credit.account_id).await?;

        sqlx::query(
            r#"
            INSERT INTO credits
                (id, account_id, principal, interest_rate, term_months, start_date, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(credit.id.as_uuid())
        .bind(credit.account_id.as_uuid())
        .bind(credit.principal.as_decimal())
        .bind(credit.interest_rate)
        .bind(credit.term_months as i32)
        .bind(credit.start_date)
        .bind(credit.status.as_str())
        .bind(credit.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_credit", e))?;

        for entry in &entries {
            sqlx::query(
                r#"
                INSERT INTO payment_schedules
                    (id, credit_id, due_date, amount, principal, interest, status, paid_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(entry.id.as_uuid())
            .bind(entry.credit_id.as_uuid())
            .bind(entry.due_date)
            .bind(entry.amount.as_decimal())
            .bind(entry.principal.as_decimal())
            .bind(entry.interest.as_decimal())
            .bind(entry.status.as_str())
            .bind(entry.paid_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_credit", e))?;
        }

        apply_delta(&mut tx, credit.account_id, credit.principal, now).await?;
        append_transaction(
            &mut tx,
            Transaction::record(
                credit.account_id,
                credit.principal,
                TransactionKind::Deposit,
                DISBURSEMENT_DESCRIPTION,
                now,
            ),
        )
        .await?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(credit)
    }

    #[instrument(skip(self), fields(credit_id = %id), err)]
    async fn credit(&self, id: CreditId) -> DomainResult<Option<Credit>> {
        let row = sqlx::query(
            r#"
            SELECT id, account_id, principal, interest_rate, term_months, start_date, status, created_at
            FROM credits
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("credit", e))?;

        row.map(|r| CreditRow::read(&r)?.into_credit()).transpose()
    }

    #[instrument(skip(self), fields(credit_id = %credit_id), err)]
    async fn schedule(&self, credit_id: CreditId) -> DomainResult<Vec<PaymentEntry>> {
        let exists = sqlx::query("SELECT 1 FROM credits WHERE id = $1")
            .bind(credit_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("schedule", e))?;
        if exists.is_none() {
            return Err(DomainError::NotFound);
        }

        let rows = sqlx::query(
            r#"
            SELECT id, credit_id, due_date, amount, principal, interest, status, paid_at
            FROM payment_schedules
            WHERE credit_id = $1
            ORDER BY due_date ASC
            "#,
        )
        .bind(credit_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("schedule", e))?;

        rows.iter().map(|r| EntryRow::read(r)?.into_entry()).collect()
    }

    #[instrument(skip(self), err)]
    async fn due_installments(&self, as_of: DateTime<Utc>) -> DomainResult<Vec<DueInstallment>> {
        let rows = sqlx::query(
            r#"
            SELECT
                e.id, e.credit_id, e.due_date, e.amount, e.principal, e.interest,
                e.status, e.paid_at,
                c.account_id
            FROM payment_schedules e
            JOIN credits c ON c.id = e.credit_id
            WHERE e.status = 'pending' AND e.due_date <= $1
            ORDER BY e.due_date ASC
            "#,
        )
        .bind(as_of)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("due_installments", e))?;

        rows.iter()
            .map(|r| {
                let entry = EntryRow::read(r)?.into_entry()?;
                let account_id: Uuid = r
                    .try_get("account_id")
                    .map_err(|e| map_sqlx_error("due_installments", e))?;
                Ok(DueInstallment {
                    entry,
                    account_id: AccountId::from_uuid(account_id),
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(entry_id = %entry_id), err)]
    async fn settle_installment(
        &self,
        entry_id: EntryId,
        now: DateTime<Utc>,
    ) -> DomainResult<SettlementOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        // Claim the entry under its row lock; the status re-check is the
        // idempotency gate against a second sweep pass.
        let row = sqlx::query(
            r#"
            SELECT id, credit_id, due_date, amount, principal, interest, status, paid_at
            FROM payment_schedules
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(entry_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("settle_installment", e))?;

        let Some(row) = row else {
            return Err(DomainError::NotFound);
        };
        let entry = EntryRow::read(&row)?.into_entry()?;
        if entry.status != EntryStatus::Pending {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(SettlementOutcome::AlreadySettled);
        }

        let credit_row = sqlx::query("SELECT account_id FROM credits WHERE id = $1")
            .bind(entry.credit_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("settle_installment", e))?;
        let Some(credit_row) = credit_row else {
            return Err(DomainError::NotFound);
        };
        let account_uuid: Uuid = credit_row
            .try_get("account_id")
            .map_err(|e| map_sqlx_error("settle_installment", e))?;
        let account_id = AccountId::from_uuid(account_uuid);

        match apply_delta(&mut tx, account_id, -entry.amount, now).await {
            Ok(()) => {
                append_transaction(
                    &mut tx,
                    Transaction::record(
                        account_id,
                        -entry.amount,
                        TransactionKind::Withdrawal,
                        INSTALLMENT_DESCRIPTION,
                        now,
                    ),
                )
                .await?;

                sqlx::query(
                    "UPDATE payment_schedules SET status = 'paid', paid_at = $2 WHERE id = $1",
                )
                .bind(entry.id.as_uuid())
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("settle_installment", e))?;

                let open = sqlx::query(
                    "SELECT COUNT(*) AS open FROM payment_schedules WHERE credit_id = $1 AND status <> 'paid'",
                )
                .bind(entry.credit_id.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("settle_installment", e))?;
                let open: i64 = open
                    .try_get("open")
                    .map_err(|e| map_sqlx_error("settle_installment", e))?;

                let credit_closed = open == 0;
                if credit_closed {
                    sqlx::query("UPDATE credits SET status = 'closed' WHERE id = $1")
                        .bind(entry.credit_id.as_uuid())
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| map_sqlx_error("settle_installment", e))?;
                }

                tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
                Ok(SettlementOutcome::Paid { credit_closed })
            }
            Err(DomainError::InsufficientFunds { .. }) => {
                sqlx::query("UPDATE payment_schedules SET status = 'overdue' WHERE id = $1")
                    .bind(entry.id.as_uuid())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("settle_installment", e))?;
                sqlx::query("UPDATE credits SET status = 'overdue' WHERE id = $1")
                    .bind(entry.credit_id.as_uuid())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("settle_installment", e))?;

                tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
                Ok(SettlementOutcome::Overdue)
            }
            Err(e) => Err(e),
        }
    }
}

/// Apply a signed delta with the solvency check folded into the update
/// itself. The `WHERE balance + $2 >= 0` clause is evaluated under the
/// row lock Postgres takes for the update, so check and write are one step.
async fn apply_delta(
    tx: &mut PgTx<'_>,
    account_id: AccountId,
    delta: Money,
    now: DateTime<Utc>,
) -> DomainResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE accounts
        SET balance = balance + $2, updated_at = $3
        WHERE id = $1 AND balance + $2 >= 0
        "#,
    )
    .bind(account_id.as_uuid())
    .bind(delta.as_decimal())
    .bind(now)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("apply_delta", e))?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    // No row matched: unknown account, or the debit would overdraw. Lock
    // the row to tell the two apart with a stable balance.
    let row = sqlx::query("SELECT balance FROM accounts WHERE id = $1 FOR UPDATE")
        .bind(account_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("apply_delta", e))?;

    match row {
        None => Err(DomainError::NotFound),
        Some(row) => {
            let available: Decimal = row
                .try_get("balance")
                .map_err(|e| map_sqlx_error("apply_delta", e))?;
            Err(DomainError::insufficient_funds(
                delta.abs(),
                Money::new(available),
            ))
        }
    }
}

/// Take the row lock on an account, failing `NotFound` if it does not exist.
async fn lock_account(tx: &mut PgTx<'_>, account_id: AccountId) -> DomainResult<()> {
    let row = sqlx::query("SELECT id FROM accounts WHERE id = $1 FOR UPDATE")
        .bind(account_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_account", e))?;

    row.map(|_| ()).ok_or(DomainError::NotFound)
}

/// Append one immutable transaction row inside the caller's unit.
async fn append_transaction(
    tx: &mut PgTx<'_>,
    transaction: Transaction,
) -> DomainResult<Transaction> {
    sqlx::query(
        r#"
        INSERT INTO transactions (id, account_id, amount, kind, description, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(transaction.id.as_uuid())
    .bind(transaction.account_id.as_uuid())
    .bind(transaction.amount.as_decimal())
    .bind(transaction.kind.as_str())
    .bind(&transaction.description)
    .bind(transaction.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("append_transaction", e))?;

    Ok(transaction)
}

/// Map sqlx errors to the domain taxonomy.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::Database(db_err) => DomainError::persistence(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            DomainError::persistence(format!("connection pool closed in {operation}"))
        }
        other => DomainError::persistence(format!("sqlx error in {operation}: {other}")),
    }
}

// Row readers. sqlx's derive is not pulled in; columns are read explicitly
// the same way the values were bound.

struct AccountRow {
    id: Uuid,
    owner_id: Uuid,
    balance: Decimal,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn read(row: &sqlx::postgres::PgRow) -> DomainResult<Self> {
        (|| -> Result<Self, sqlx::Error> {
            Ok(Self {
                id: row.try_get("id")?,
                owner_id: row.try_get("owner_id")?,
                balance: row.try_get("balance")?,
                currency: row.try_get("currency")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        })()
        .map_err(|e| DomainError::persistence(format!("accounts row: {e}")))
    }

    fn into_account(self) -> DomainResult<Account> {
        Ok(Account {
            id: AccountId::from_uuid(self.id),
            owner_id: UserId::from_uuid(self.owner_id),
            balance: Money::new(self.balance),
            currency: self
                .currency
                .trim()
                .parse::<Currency>()
                .map_err(|e| DomainError::persistence(format!("accounts.currency: {e}")))?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

struct TransactionRow {
    id: Uuid,
    account_id: Uuid,
    amount: Decimal,
    kind: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl TransactionRow {
    fn read(row: &sqlx::postgres::PgRow) -> DomainResult<Self> {
        (|| -> Result<Self, sqlx::Error> {
            Ok(Self {
                id: row.try_get("id")?,
                account_id: row.try_get("account_id")?,
                amount: row.try_get("amount")?,
                kind: row.try_get("kind")?,
                description: row.try_get("description")?,
                created_at: row.try_get("created_at")?,
            })
        })()
        .map_err(|e| DomainError::persistence(format!("transactions row: {e}")))
    }

    fn into_transaction(self) -> DomainResult<Transaction> {
        Ok(Transaction {
            id: TransactionId::from_uuid(self.id),
            account_id: AccountId::from_uuid(self.account_id),
            amount: Money::new(self.amount),
            kind: self
                .kind
                .parse::<TransactionKind>()
                .map_err(|e| DomainError::persistence(format!("transactions.kind: {e}")))?,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

struct CreditRow {
    id: Uuid,
    account_id: Uuid,
    principal: Decimal,
    interest_rate: Decimal,
    term_months: i32,
    start_date: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
}

impl CreditRow {
    fn read(row: &sqlx::postgres::PgRow) -> DomainResult<Self> {
        (|| -> Result<Self, sqlx::Error> {
            Ok(Self {
                id: row.try_get("id")?,
                account_id: row.try_get("account_id")?,
                principal: row.try_get("principal")?,
                interest_rate: row.try_get("interest_rate")?,
                term_months: row.try_get("term_months")?,
                start_date: row.try_get("start_date")?,
                status: row.try_get("status")?,
                created_at: row.try_get("created_at")?,
            })
        })()
        .map_err(|e| DomainError::persistence(format!("credits row: {e}")))
    }

    fn into_credit(self) -> DomainResult<Credit> {
        Ok(Credit {
            id: CreditId::from_uuid(self.id),
            account_id: AccountId::from_uuid(self.account_id),
            principal: Money::new(self.principal),
            interest_rate: self.interest_rate,
            term_months: self.term_months as u32,
            start_date: self.start_date,
            status: self
                .status
                .parse::<CreditStatus>()
                .map_err(|e| DomainError::persistence(format!("credits.status: {e}")))?,
            created_at: self.created_at,
        })
    }
}

struct EntryRow {
    id: Uuid,
    credit_id: Uuid,
    due_date: DateTime<Utc>,
    amount: Decimal,
    principal: Decimal,
    interest: Decimal,
    status: String,
    paid_at: Option<DateTime<Utc>>,
}

impl EntryRow {
    fn read(row: &sqlx::postgres::PgRow) -> DomainResult<Self> {
        (|| -> Result<Self, sqlx::Error> {
            Ok(Self {
                id: row.try_get("id")?,
                credit_id: row.try_get("credit_id")?,
                due_date: row.try_get("due_date")?,
                amount: row.try_get("amount")?,
                principal: row.try_get("principal")?,
                interest: row.try_get("interest")?,
                status: row.try_get("status")?,
                paid_at: row.try_get("paid_at")?,
            })
        })()
        .map_err(|e| DomainError::persistence(format!("payment_schedules row: {e}")))
    }

    fn into_entry(self) -> DomainResult<PaymentEntry> {
        Ok(PaymentEntry {
            id: EntryId::from_uuid(self.id),
            credit_id: CreditId::from_uuid(self.credit_id),
            due_date: self.due_date,
            amount: Money::new(self.amount),
            principal: Money::new(self.principal),
            interest: Money::new(self.interest),
            status: self
                .status
                .parse::<EntryStatus>()
                .map_err(|e| DomainError::persistence(format!("payment_schedules.status: {e}")))?,
            paid_at: self.paid_at,
        })
    }
}
