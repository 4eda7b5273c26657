//! Postgres schema bootstrap.
//!
//! Applied at startup; every statement is idempotent. The `CHECK
//! (balance >= 0)` constraint backs up the conditional-update solvency path
//! at the schema level.

use sqlx::PgPool;

use ferrobank_core::{DomainError, DomainResult};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id          UUID PRIMARY KEY,
        owner_id    UUID NOT NULL,
        balance     NUMERIC(19, 2) NOT NULL CHECK (balance >= 0),
        currency    CHAR(3) NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
        id          UUID PRIMARY KEY,
        account_id  UUID NOT NULL REFERENCES accounts(id),
        amount      NUMERIC(19, 2) NOT NULL,
        kind        TEXT NOT NULL,
        description TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS transactions_account_idx
        ON transactions (account_id, created_at)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS credits (
        id            UUID PRIMARY KEY,
        account_id    UUID NOT NULL REFERENCES accounts(id),
        principal     NUMERIC(19, 2) NOT NULL,
        interest_rate NUMERIC(9, 4) NOT NULL,
        term_months   INTEGER NOT NULL,
        start_date    TIMESTAMPTZ NOT NULL,
        status        TEXT NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payment_schedules (
        id         UUID PRIMARY KEY,
        credit_id  UUID NOT NULL REFERENCES credits(id),
        due_date   TIMESTAMPTZ NOT NULL,
        amount     NUMERIC(19, 2) NOT NULL,
        principal  NUMERIC(19, 2) NOT NULL,
        interest   NUMERIC(19, 2) NOT NULL,
        status     TEXT NOT NULL,
        paid_at    TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS payment_schedules_due_idx
        ON payment_schedules (status, due_date)
    "#,
];

/// Create the engine's tables and indexes if they do not exist yet.
pub async fn init_schema(pool: &PgPool) -> DomainResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DomainError::persistence(format!("schema bootstrap: {e}")))?;
    }
    Ok(())
}
