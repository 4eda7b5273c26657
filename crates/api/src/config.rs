//! Environment-based configuration for the API binary.

use std::time::Duration;

use anyhow::Context;
use rust_decimal::Decimal;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// Cadence of the payment sweep.
    pub sweep_interval: Duration,
    /// Annual reference rate served by the fixed rate provider, percent.
    pub key_rate_percent: Decimal,
}

impl Config {
    /// Load from the environment. Everything except `DATABASE_URL` has a
    /// dev-friendly default.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let sweep_interval = match std::env::var("SWEEP_INTERVAL_SECS") {
            Ok(v) => Duration::from_secs(
                v.parse()
                    .context("SWEEP_INTERVAL_SECS must be a number of seconds")?,
            ),
            Err(_) => Duration::from_secs(3600),
        };

        let key_rate_percent = match std::env::var("KEY_RATE_PERCENT") {
            Ok(v) => v
                .parse()
                .context("KEY_RATE_PERCENT must be a decimal percentage")?,
            Err(_) => Decimal::from(16),
        };

        Ok(Self {
            database_url,
            bind_addr,
            sweep_interval,
            key_rate_percent,
        })
    }
}
