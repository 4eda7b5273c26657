//! Credit originator: loan creation, schedule persistence, disbursement.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::warn;

use ferrobank_core::{AccountId, CreditId, DomainError, DomainResult, Money};
use ferrobank_credit::{annuity_schedule, Credit, PaymentEntry};

use crate::notify::Notifier;
use crate::rates::RateProvider;
use crate::store::BankStore;

/// Term bounds accepted for a new credit, in months.
pub const MIN_TERM_MONTHS: u32 = 1;
pub const MAX_TERM_MONTHS: u32 = 60;

/// Lending margin added on top of the reference rate, in percentage points.
const RATE_MARGIN_PP: u32 = 5;

#[derive(Clone)]
pub struct CreditService {
    store: Arc<dyn BankStore>,
    rates: Arc<dyn RateProvider>,
    notifier: Arc<dyn Notifier>,
}

impl CreditService {
    pub fn new(
        store: Arc<dyn BankStore>,
        rates: Arc<dyn RateProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            rates,
            notifier,
        }
    }

    /// Originate a credit against an account.
    ///
    /// The reference rate is fetched up front; a lookup failure aborts the
    /// whole operation with nothing persisted. Credit row, schedule entries
    /// and the principal disbursement then commit as one atomic unit.
    pub async fn create_credit(
        &self,
        account_id: AccountId,
        principal: Money,
        term_months: u32,
    ) -> DomainResult<Credit> {
        if !principal.is_positive() {
            return Err(DomainError::validation("principal must be positive"));
        }
        if !(MIN_TERM_MONTHS..=MAX_TERM_MONTHS).contains(&term_months) {
            return Err(DomainError::validation(format!(
                "term must be between {MIN_TERM_MONTHS} and {MAX_TERM_MONTHS} months"
            )));
        }

        // Existence check belongs to the engine; ownership of the account
        // was already verified by the caller.
        let account = self
            .store
            .account(account_id)
            .await?
            .ok_or(DomainError::NotFound)?;

        let key_rate = self
            .rates
            .key_rate()
            .await
            .map_err(|e| DomainError::external(format!("rate lookup failed: {e}")))?;
        let rate = key_rate + Decimal::from(RATE_MARGIN_PP);

        let credit = Credit::originate(account.id, principal, rate, term_months, Utc::now());
        let entries: Vec<PaymentEntry> =
            annuity_schedule(principal, rate, term_months, credit.start_date)?
                .into_iter()
                .map(|line| PaymentEntry::from_line(credit.id, line))
                .collect();

        let credit = self.store.create_credit(credit, entries).await?;

        if let Err(e) = self
            .notifier
            .credit_opened(account_id, principal, term_months)
            .await
        {
            warn!(credit_id = %credit.id, error = %e, "credit notification failed");
        }

        Ok(credit)
    }

    pub async fn credit(&self, id: CreditId) -> DomainResult<Credit> {
        self.store.credit(id).await?.ok_or(DomainError::NotFound)
    }

    /// The credit's full schedule, ordered by due date.
    pub async fn schedule(&self, credit_id: CreditId) -> DomainResult<Vec<PaymentEntry>> {
        self.store.schedule(credit_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ferrobank_core::UserId;
    use ferrobank_credit::{CreditStatus, EntryStatus};

    use crate::notify::LogNotifier;
    use crate::rates::FixedRateProvider;
    use crate::services::LedgerService;
    use crate::store::InMemoryBankStore;

    struct UnreachableRates;

    #[async_trait::async_trait]
    impl RateProvider for UnreachableRates {
        async fn key_rate(&self) -> anyhow::Result<Decimal> {
            anyhow::bail!("connection timed out")
        }
    }

    fn services(rates: Arc<dyn RateProvider>) -> (LedgerService, CreditService) {
        let store = Arc::new(InMemoryBankStore::new());
        let notifier = Arc::new(LogNotifier);
        (
            LedgerService::new(store.clone(), notifier.clone()),
            CreditService::new(store, rates, notifier),
        )
    }

    #[tokio::test]
    async fn credit_is_disbursed_with_margin_applied() {
        let (ledger, credits) = services(Arc::new(FixedRateProvider::new(Decimal::from(16))));
        let account = ledger.open_account(UserId::new(), "RUB").await.unwrap();

        let credit = credits
            .create_credit(account.id, Money::from_major(120_000), 12)
            .await
            .unwrap();

        assert_eq!(credit.status, CreditStatus::Active);
        assert_eq!(credit.interest_rate, Decimal::from(21));

        // Disbursement landed as a deposit in the same unit.
        assert_eq!(
            ledger.account(account.id).await.unwrap().balance,
            Money::from_major(120_000)
        );

        let schedule = credits.schedule(credit.id).await.unwrap();
        assert_eq!(schedule.len(), 12);
        assert!(schedule.iter().all(|e| e.status == EntryStatus::Pending));
        let total_principal = schedule
            .iter()
            .fold(Money::ZERO, |sum, e| sum + e.principal);
        assert_eq!(total_principal, credit.principal);
    }

    #[tokio::test]
    async fn rate_lookup_failure_aborts_with_nothing_persisted() {
        let (ledger, credits) = services(Arc::new(UnreachableRates));
        let account = ledger.open_account(UserId::new(), "RUB").await.unwrap();

        let err = credits
            .create_credit(account.id, Money::from_major(1000), 6)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::ExternalService(_)));
        assert!(ledger.account(account.id).await.unwrap().balance.is_zero());
        assert!(ledger.transactions(account.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_account_aborts_with_nothing_persisted() {
        let (_, credits) = services(Arc::new(FixedRateProvider::new(Decimal::from(10))));

        let err = credits
            .create_credit(AccountId::new(), Money::from_major(1000), 6)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[tokio::test]
    async fn term_and_principal_bounds_are_enforced() {
        let (ledger, credits) = services(Arc::new(FixedRateProvider::new(Decimal::from(10))));
        let account = ledger.open_account(UserId::new(), "RUB").await.unwrap();

        for (principal, term) in [
            (Money::ZERO, 12),
            (Money::from_major(-5), 12),
            (Money::from_major(1000), 0),
            (Money::from_major(1000), 61),
        ] {
            let err = credits
                .create_credit(account.id, principal, term)
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{principal} {term}");
        }
    }

    #[tokio::test]
    async fn unknown_credit_is_not_found() {
        let (_, credits) = services(Arc::new(FixedRateProvider::new(Decimal::from(10))));

        assert!(matches!(
            credits.credit(CreditId::new()).await.unwrap_err(),
            DomainError::NotFound
        ));
        assert!(matches!(
            credits.schedule(CreditId::new()).await.unwrap_err(),
            DomainError::NotFound
        ));
    }
}
