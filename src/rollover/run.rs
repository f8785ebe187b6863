//! A single rollover run: archive every owner's totals for a finished period
//! and start the owner's new period from zero.

use std::sync::Arc;

use rusqlite::{Connection, TransactionBehavior};
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{
    Error, Ledger, OwnerId,
    aggregate::{get_aggregate, reset_totals},
    archive::{PeriodLabel, insert_archive_entry_if_absent},
};

/// Whether a rollover is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverState {
    /// Waiting for the next period boundary.
    Idle,
    /// Archiving and resetting aggregates.
    RollingOver,
}

/// What a rollover did for one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerOutcome {
    /// The totals were archived and reset.
    Archived,
    /// The period had already been archived for this owner, nothing changed.
    AlreadyArchived,
    /// The owner's aggregate disappeared before it could be archived.
    NoAggregate,
}

/// The result of one rollover run.
#[derive(Debug, PartialEq)]
pub struct RolloverReport {
    /// The period that was archived.
    pub period: PeriodLabel,
    /// The owners whose totals were archived and reset.
    pub archived: Vec<OwnerId>,
    /// The owners that already had an archive entry for the period.
    pub already_archived: Vec<OwnerId>,
    /// The owners that could not be rolled over. Their aggregates are unchanged.
    pub failed: Vec<(OwnerId, Error)>,
}

/// Archives and resets the running aggregates of every owner.
///
/// Only one run can be in progress at a time, whether it was started by the
/// scheduler or by hand.
#[derive(Debug, Clone)]
pub struct Rollover {
    ledger: Ledger,
    run_guard: Arc<Mutex<()>>,
}

impl Rollover {
    /// Create a rollover that works on `ledger`.
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            run_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Whether a run is in progress.
    pub fn state(&self) -> RolloverState {
        match self.run_guard.try_lock() {
            Ok(_) => RolloverState::Idle,
            Err(_) => RolloverState::RollingOver,
        }
    }

    /// Archive every owner's totals under `period` and reset them.
    ///
    /// Each owner is rolled over in its own SQL transaction. An owner that
    /// fails keeps its totals and is listed in [RolloverReport::failed], the
    /// run carries on with the remaining owners. Running again for the same
    /// period does not change anything.
    ///
    /// # Errors
    /// Returns [Error::RolloverInProgress] if another run has not finished, or
    /// a storage error if the owners could not be listed, in which case
    /// nothing was rolled over.
    pub async fn run(&self, period: PeriodLabel) -> Result<RolloverReport, Error> {
        let _guard = self
            .run_guard
            .try_lock()
            .map_err(|_| Error::RolloverInProgress)?;

        tracing::info!("Starting rollover for {period}");

        let owners = self.ledger.owners().await.inspect_err(|error| {
            tracing::error!("Abandoning rollover for {period}, could not list owners: {error}");
        })?;

        let mut report = RolloverReport {
            period,
            archived: Vec::new(),
            already_archived: Vec::new(),
            failed: Vec::new(),
        };

        for owner in owners {
            let outcome = self
                .ledger
                .execute(move |connection| roll_over_owner(owner, period, connection))
                .await;

            match outcome {
                Ok(OwnerOutcome::Archived) => report.archived.push(owner),
                Ok(OwnerOutcome::AlreadyArchived) => report.already_archived.push(owner),
                Ok(OwnerOutcome::NoAggregate) => {}
                Err(error) => {
                    tracing::error!("Could not roll over owner {owner} for {period}: {error}");
                    report.failed.push((owner, error));
                }
            }
        }

        tracing::info!(
            "Finished rollover for {period}: {} archived, {} already archived, {} failed",
            report.archived.len(),
            report.already_archived.len(),
            report.failed.len()
        );

        Ok(report)
    }
}

/// Archive and reset one owner's aggregate in a single SQL transaction.
///
/// The totals are only reset if this call wrote the archive entry.
fn roll_over_owner(
    owner: OwnerId,
    period: PeriodLabel,
    connection: &mut Connection,
) -> Result<OwnerOutcome, Error> {
    let sql_transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let now = OffsetDateTime::now_utc();

    let Some(aggregate) = get_aggregate(owner, &sql_transaction)? else {
        return Ok(OwnerOutcome::NoAggregate);
    };

    if !insert_archive_entry_if_absent(&aggregate, period, now, &sql_transaction)? {
        return Ok(OwnerOutcome::AlreadyArchived);
    }

    reset_totals(owner, now, &sql_transaction)?;
    sql_transaction.commit()?;

    Ok(OwnerOutcome::Archived)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use time::Month;

    use crate::{
        Error, Ledger, LedgerConfig, OwnerId,
        archive::{PeriodLabel, list_archive_entries},
        db::initialize,
        rollover::{Rollover, RolloverState},
        test_utils::get_test_ledger,
        transaction::{Transaction, TransactionKind, count_transactions},
    };

    const OCTOBER: PeriodLabel = PeriodLabel::new(2025, Month::October);

    async fn record(ledger: &Ledger, owner: i64, kind: TransactionKind, amount: &str) {
        ledger
            .record_transaction(
                OwnerId::new(owner),
                Transaction::build(kind, amount.parse().unwrap()),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn archives_and_resets_totals() {
        let ledger = get_test_ledger();
        let owner = OwnerId::new(1);
        ledger.set_limit(owner, "10000".parse().unwrap()).await.unwrap();
        record(&ledger, 1, TransactionKind::Credit, "5000").await;
        record(&ledger, 1, TransactionKind::Debit, "1200").await;

        let report = Rollover::new(ledger.clone()).run(OCTOBER).await.unwrap();

        assert_eq!(report.archived, [owner]);
        assert!(report.failed.is_empty());
        let entries = ledger.list_archive(owner).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].period, OCTOBER);
        assert_eq!(entries[0].limit, Decimal::new(10000, 0));
        assert_eq!(entries[0].total_credit, Decimal::new(5000, 0));
        assert_eq!(entries[0].total_debit, Decimal::new(1200, 0));

        let summary = ledger.get_aggregate(owner).await.unwrap();
        assert_eq!(summary.limit, Decimal::new(10000, 0));
        assert_eq!(summary.total_credit, Decimal::ZERO);
        assert_eq!(summary.total_debit, Decimal::ZERO);
        assert_eq!(ledger.list_transactions(owner).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn second_run_for_same_period_changes_nothing() {
        let ledger = get_test_ledger();
        let owner = OwnerId::new(1);
        let rollover = Rollover::new(ledger.clone());
        record(&ledger, 1, TransactionKind::Debit, "30").await;
        rollover.run(OCTOBER).await.unwrap();
        record(&ledger, 1, TransactionKind::Debit, "12").await;

        let report = rollover.run(OCTOBER).await.unwrap();

        assert!(report.archived.is_empty());
        assert_eq!(report.already_archived, [owner]);
        let entries = ledger.list_archive(owner).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].total_debit, Decimal::new(30, 0));
        let summary = ledger.get_aggregate(owner).await.unwrap();
        assert_eq!(summary.total_debit, Decimal::new(12, 0));
    }

    #[tokio::test]
    async fn failing_owner_keeps_totals_and_others_continue() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
            .execute(
                "CREATE TRIGGER fail_owner_two BEFORE INSERT ON archive_entry
                 WHEN NEW.owner_id = 2
                 BEGIN SELECT RAISE(ABORT, 'archive unavailable'); END;",
                (),
            )
            .unwrap();
        let ledger = Ledger::new(connection, LedgerConfig::default()).unwrap();
        for owner in 1..=3 {
            record(&ledger, owner, TransactionKind::Debit, "25").await;
        }

        let report = Rollover::new(ledger.clone()).run(OCTOBER).await.unwrap();

        assert_eq!(report.archived, [OwnerId::new(1), OwnerId::new(3)]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, OwnerId::new(2));
        let failed = ledger.get_aggregate(OwnerId::new(2)).await.unwrap();
        assert_eq!(failed.total_debit, Decimal::new(25, 0));
        assert!(ledger.list_archive(OwnerId::new(2)).await.unwrap().is_empty());
        let archived = ledger.get_aggregate(OwnerId::new(3)).await.unwrap();
        assert_eq!(archived.total_debit, Decimal::ZERO);
    }

    #[tokio::test]
    async fn rejects_overlapping_runs() {
        let rollover = Rollover::new(get_test_ledger());
        assert_eq!(rollover.state(), RolloverState::Idle);

        let _running = rollover.run_guard.try_lock().unwrap();

        assert_eq!(rollover.state(), RolloverState::RollingOver);
        assert_eq!(rollover.run(OCTOBER).await, Err(Error::RolloverInProgress));
    }

    #[tokio::test]
    async fn owners_without_aggregate_are_skipped() {
        let ledger = get_test_ledger();

        let report = Rollover::new(ledger.clone()).run(OCTOBER).await.unwrap();

        assert!(report.archived.is_empty());
        assert!(report.already_archived.is_empty());
        assert!(report.failed.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_records_land_in_exactly_one_period() {
        let ledger = get_test_ledger();
        let owner = OwnerId::new(5);
        record(&ledger, 5, TransactionKind::Debit, "1").await;

        let mut handles = Vec::new();
        for _ in 0..40 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                record(&ledger, 5, TransactionKind::Debit, "1").await;
            }));
        }
        let rollover = Rollover::new(ledger.clone());
        let report = rollover.run(OCTOBER).await.unwrap();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(report.archived, [owner]);
        let archived: Decimal = ledger
            .list_archive(owner)
            .await
            .unwrap()
            .iter()
            .map(|entry| entry.total_debit)
            .sum();
        let current = ledger.get_aggregate(owner).await.unwrap().total_debit;
        assert_eq!(archived + current, Decimal::new(41, 0));
        let logged = ledger
            .execute(|connection| count_transactions(connection))
            .await
            .unwrap();
        assert_eq!(logged, 41);
        let entries = ledger
            .execute(move |connection| list_archive_entries(owner, connection))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
    }
}
