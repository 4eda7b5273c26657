//! Periodic settlement of due installments.
//!
//! Runs on its own cadence, decoupled from request handling. Every balance
//! mutation goes through the same store operations (and the same locking)
//! as user-initiated requests, so a sweep and a concurrent withdrawal on
//! the same account serialize instead of racing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::store::{BankStore, SettlementOutcome};

/// Counters for one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries debited and marked paid.
    pub settled: usize,
    /// Entries (and their credits) marked overdue for insufficient funds.
    pub overdue: usize,
    /// Entries another pass settled first.
    pub skipped: usize,
    /// Entries left pending after a store failure.
    pub failed: usize,
}

/// Background worker that settles due installments against the ledger.
pub struct PaymentSweep {
    store: Arc<dyn BankStore>,
}

impl PaymentSweep {
    pub fn new(store: Arc<dyn BankStore>) -> Self {
        Self { store }
    }

    /// Settle everything currently due, once.
    ///
    /// Entries are independent: a failure on one is recorded and the pass
    /// moves on. Already-settled entries are skipped, so invoking this twice
    /// over the same window performs no additional debits.
    pub async fn run_once(&self) -> SweepReport {
        self.run_pass(None).await
    }

    async fn run_pass(&self, shutdown: Option<&watch::Receiver<bool>>) -> SweepReport {
        let mut report = SweepReport::default();

        let due = match self.store.due_installments(Utc::now()).await {
            Ok(due) => due,
            Err(e) => {
                error!(error = %e, "sweep could not query due installments");
                report.failed += 1;
                return report;
            }
        };
        debug!(due = due.len(), "sweep pass started");

        for installment in due {
            // Cancellation is only observed here, between entries, never
            // inside an entry's atomic unit.
            if shutdown.is_some_and(|rx| *rx.borrow()) {
                debug!("shutdown requested; remaining entries deferred to the next run");
                break;
            }

            let entry = &installment.entry;
            match self.store.settle_installment(entry.id, Utc::now()).await {
                Ok(SettlementOutcome::Paid { credit_closed }) => {
                    report.settled += 1;
                    info!(
                        entry_id = %entry.id,
                        credit_id = %entry.credit_id,
                        amount = %entry.amount,
                        credit_closed,
                        "installment settled"
                    );
                }
                Ok(SettlementOutcome::Overdue) => {
                    report.overdue += 1;
                    warn!(
                        entry_id = %entry.id,
                        credit_id = %entry.credit_id,
                        amount = %entry.amount,
                        "installment overdue: insufficient funds"
                    );
                }
                Ok(SettlementOutcome::AlreadySettled) => {
                    report.skipped += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    error!(
                        entry_id = %entry.id,
                        credit_id = %entry.credit_id,
                        error = %e,
                        "settlement failed; entry left pending"
                    );
                }
            }
        }

        report
    }

    /// Run the sweep every `interval` until shutdown.
    pub fn spawn(self, interval: Duration) -> SweepHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(sweep_loop(self, interval, shutdown_rx));
        SweepHandle {
            shutdown: shutdown_tx,
            join,
        }
    }
}

/// Handle to a running sweep task.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SweepHandle {
    /// Request shutdown and wait for the worker to stop.
    ///
    /// An in-flight entry always finishes its atomic unit; only the
    /// remaining entries of the pass are deferred.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }
}

async fn sweep_loop(sweep: PaymentSweep, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    info!(interval_secs = interval.as_secs(), "payment sweep started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }

        let report = sweep.run_pass(Some(&shutdown)).await;
        debug!(?report, "sweep pass finished");
    }

    info!("payment sweep stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    use chrono::Duration as ChronoDuration;
    use rust_decimal::Decimal;

    use ferrobank_core::{Currency, Money, UserId};
    use ferrobank_credit::{annuity_schedule, Credit, CreditStatus, EntryStatus, PaymentEntry};
    use ferrobank_ledger::{Account, TransactionKind};

    use crate::store::InMemoryBankStore;

    /// Credit whose first three monthly entries are already due.
    async fn backdated_credit(
        store: &Arc<InMemoryBankStore>,
        principal: i64,
        term_months: u32,
    ) -> (Account, Credit) {
        let account = store
            .create_account(UserId::new(), Currency::from_str("RUB").unwrap())
            .await
            .unwrap();

        let start = Utc::now() - ChronoDuration::days(100);
        let credit = Credit::originate(
            account.id,
            Money::from_major(principal),
            Decimal::ZERO,
            term_months,
            start,
        );
        let entries: Vec<PaymentEntry> =
            annuity_schedule(credit.principal, Decimal::ZERO, term_months, start)
                .unwrap()
                .into_iter()
                .map(|line| PaymentEntry::from_line(credit.id, line))
                .collect();

        let credit = store.create_credit(credit, entries).await.unwrap();
        (account, credit)
    }

    #[tokio::test]
    async fn due_entries_are_settled_once() {
        let store = Arc::new(InMemoryBankStore::new());
        // 1200 over 12 months at 0%: installments of 100, three already due.
        let (account, credit) = backdated_credit(&store, 1200, 12).await;

        let sweep = PaymentSweep::new(store.clone());
        let first = sweep.run_once().await;
        assert_eq!(
            first,
            SweepReport {
                settled: 3,
                ..SweepReport::default()
            }
        );

        // Disbursement minus three installments.
        let balance = store.account(account.id).await.unwrap().unwrap().balance;
        assert_eq!(balance, Money::from_major(900));

        let schedule = store.schedule(credit.id).await.unwrap();
        assert_eq!(
            schedule
                .iter()
                .filter(|e| e.status == EntryStatus::Paid)
                .count(),
            3
        );
        assert!(schedule
            .iter()
            .filter(|e| e.status == EntryStatus::Paid)
            .all(|e| e.paid_at.is_some()));

        // Idempotent: a second pass over the same window debits nothing.
        let second = sweep.run_once().await;
        assert_eq!(second, SweepReport::default());
        assert_eq!(
            store.account(account.id).await.unwrap().unwrap().balance,
            Money::from_major(900)
        );
    }

    #[tokio::test]
    async fn insufficient_funds_marks_entry_and_credit_overdue() {
        let store = Arc::new(InMemoryBankStore::new());
        let (account, credit) = backdated_credit(&store, 1200, 12).await;

        // Drain the account below one installment.
        store
            .adjust_balance(
                account.id,
                Money::from_major(-1150),
                TransactionKind::Withdrawal,
                "drain",
            )
            .await
            .unwrap();

        let sweep = PaymentSweep::new(store.clone());
        let report = sweep.run_once().await;
        assert_eq!(report.settled, 0);
        assert_eq!(report.overdue, 3);

        let stored = store.credit(credit.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CreditStatus::Overdue);
        assert_eq!(
            store.account(account.id).await.unwrap().unwrap().balance,
            Money::from_major(50)
        );

        // Overdue entries are never reprocessed.
        assert_eq!(sweep.run_once().await, SweepReport::default());
    }

    #[tokio::test]
    async fn partial_funds_settle_oldest_entries_first() {
        let store = Arc::new(InMemoryBankStore::new());
        let (account, credit) = backdated_credit(&store, 1200, 12).await;

        // Leave funds for exactly two installments.
        store
            .adjust_balance(
                account.id,
                Money::from_major(-950),
                TransactionKind::Withdrawal,
                "drain",
            )
            .await
            .unwrap();

        let report = PaymentSweep::new(store.clone()).run_once().await;
        assert_eq!(report.settled, 2);
        assert_eq!(report.overdue, 1);

        let schedule = store.schedule(credit.id).await.unwrap();
        assert_eq!(schedule[0].status, EntryStatus::Paid);
        assert_eq!(schedule[1].status, EntryStatus::Paid);
        assert_eq!(schedule[2].status, EntryStatus::Overdue);
    }

    #[tokio::test]
    async fn paying_the_last_entry_closes_the_credit() {
        let store = Arc::new(InMemoryBankStore::new());
        // Two installments, both due, fully funded by the disbursement.
        let (_, credit) = backdated_credit(&store, 200, 2).await;

        let report = PaymentSweep::new(store.clone()).run_once().await;
        assert_eq!(report.settled, 2);

        let stored = store.credit(credit.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CreditStatus::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_worker() {
        let store = Arc::new(InMemoryBankStore::new());
        let (_, credit) = backdated_credit(&store, 200, 2).await;

        let handle = PaymentSweep::new(store.clone()).spawn(Duration::from_secs(3600));
        // First tick fires immediately; give the pass a chance to run.
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown().await;

        let stored = store.credit(credit.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CreditStatus::Closed);
    }
}
