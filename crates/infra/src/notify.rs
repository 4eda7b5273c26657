//! Outbound notification contract.

use async_trait::async_trait;

use ferrobank_core::{AccountId, Money};

/// Best-effort delivery of payment and credit notifications.
///
/// Fire-and-forget from the engine's perspective: the services log a
/// failure and move on, it is never surfaced as an operation failure.
/// Implementations resolve the account owner's contact details themselves.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn payment_processed(&self, account_id: AccountId, amount: Money) -> anyhow::Result<()>;

    async fn credit_opened(
        &self,
        account_id: AccountId,
        principal: Money,
        term_months: u32,
    ) -> anyhow::Result<()>;
}

/// Logs notifications instead of delivering them.
///
/// The mail transport is a collaborator outside this engine; this keeps the
/// notification path observable without it.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn payment_processed(&self, account_id: AccountId, amount: Money) -> anyhow::Result<()> {
        tracing::info!(account_id = %account_id, amount = %amount, "payment processed");
        Ok(())
    }

    async fn credit_opened(
        &self,
        account_id: AccountId,
        principal: Money,
        term_months: u32,
    ) -> anyhow::Result<()> {
        tracing::info!(
            account_id = %account_id,
            principal = %principal,
            term_months,
            "credit opened"
        );
        Ok(())
    }
}
