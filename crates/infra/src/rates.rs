//! Reference-rate lookup contract.

use async_trait::async_trait;
use rust_decimal::Decimal;

/// Source of the current annual reference rate, in percent.
///
/// One call per credit origination, no automatic retry: a failure here
/// aborts the origination before anything is persisted.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn key_rate(&self) -> anyhow::Result<Decimal>;
}

/// Fixed rate from configuration.
///
/// Stands in for the external lookup service, whose wire protocol is out of
/// scope for this engine.
#[derive(Debug, Clone)]
pub struct FixedRateProvider {
    rate: Decimal,
}

impl FixedRateProvider {
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }
}

#[async_trait]
impl RateProvider for FixedRateProvider {
    async fn key_rate(&self) -> anyhow::Result<Decimal> {
        Ok(self.rate)
    }
}
