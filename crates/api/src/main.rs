use std::sync::Arc;

use ferrobank_api::app::{build_app, AppServices};
use ferrobank_api::config::Config;
use ferrobank_infra::{
    schema, CreditService, FixedRateProvider, LedgerService, LogNotifier, PaymentSweep,
    PostgresBankStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ferrobank_observability::init();

    let config = Config::from_env()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(16)
        .connect(&config.database_url)
        .await?;
    schema::init_schema(&pool).await?;

    let store = Arc::new(PostgresBankStore::new(pool));
    let notifier = Arc::new(LogNotifier);
    let rates = Arc::new(FixedRateProvider::new(config.key_rate_percent));

    let services = AppServices {
        ledger: LedgerService::new(store.clone(), notifier.clone()),
        credits: CreditService::new(store.clone(), rates, notifier),
    };

    let sweep = PaymentSweep::new(store).spawn(config.sweep_interval);

    let app = build_app(services);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The in-flight sweep entry finishes its atomic unit before we exit.
    sweep.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
