//! The ledger service: the one entry point that keeps the transaction log,
//! the running aggregates and the archive consistent with each other.
//!
//! Every operation runs as a single SQL transaction on a blocking thread, so
//! a transaction is never in the log without its amount in the aggregate, even
//! when the caller's future is dropped part way through. Aggregates are always
//! changed by applying deltas inside the database, never by saving a
//! previously read snapshot.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::{
    Error, OwnerId,
    aggregate::{
        AggregateSummary, adjust_totals, apply_delta, get_aggregate, list_aggregate_owners,
        upsert_limit,
    },
    archive::{ArchiveEntry, list_archive_entries},
    database_id::TransactionId,
    db::initialize,
    money::SpendingLimit,
    transaction::{
        Transaction, TransactionBuilder, TransactionUpdate, get_transaction, insert_transaction,
        list_transactions, save_transaction,
    },
};

/// Settings for how the ledger deals with a busy database.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerConfig {
    /// How many times an operation is retried after the database reports it
    /// is busy before giving up with [Error::RetriesExhausted].
    pub max_conflict_retries: u32,
    /// The delay before the first retry. Each further retry waits one more
    /// multiple of this delay.
    pub conflict_backoff: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
            conflict_backoff: Duration::from_millis(50),
        }
    }
}

/// Records transactions and maintains each owner's running aggregate.
#[derive(Debug, Clone)]
pub struct Ledger {
    db_connection: Arc<Mutex<Connection>>,
    config: LedgerConfig,
}

impl Ledger {
    /// Create a ledger backed by `db_connection`.
    ///
    /// This function will initialize the database by adding the ledger tables
    /// if they do not exist yet.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, config: LedgerConfig) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            config,
        })
    }

    /// Record a transaction for `owner` and add its amount to the owner's
    /// running aggregate, creating the aggregate if needed.
    ///
    /// # Errors
    /// Returns a storage error if the transaction could not be saved, in which
    /// case neither the log nor the aggregate has changed.
    pub async fn record_transaction(
        &self,
        owner: OwnerId,
        builder: TransactionBuilder,
    ) -> Result<Transaction, Error> {
        let transaction = self
            .execute(move |connection| {
                let sql_transaction =
                    connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let now = OffsetDateTime::now_utc();
                let (credit, debit) = builder.kind.deltas(builder.amount);

                let generation = apply_delta(owner, credit, debit, now, &sql_transaction)?;
                let transaction =
                    insert_transaction(owner, &builder, generation, now, &sql_transaction)?;

                sql_transaction.commit()?;

                Ok(transaction)
            })
            .await?;

        tracing::debug!(
            "Recorded {} of {} for owner {owner} as transaction {}",
            transaction.kind,
            transaction.amount,
            transaction.id
        );

        Ok(transaction)
    }

    /// Change one of `owner`'s transactions.
    ///
    /// If the transaction was counted in the owner's current period, the
    /// difference between the old and new amounts is applied to the aggregate
    /// in the same SQL transaction. Transactions from periods that have
    /// already been archived are changed in the log only.
    ///
    /// # Errors
    /// Returns [Error::TransactionNotFound] if `id` does not refer to one of
    /// `owner`'s transactions.
    pub async fn update_transaction(
        &self,
        owner: OwnerId,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> Result<Transaction, Error> {
        self.execute(move |connection| {
            let sql_transaction =
                connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = OffsetDateTime::now_utc();

            let original = get_transaction(owner, id, &sql_transaction)?;
            let updated = update.apply_to(&original);

            let (old_credit, old_debit) = original.kind.deltas(original.amount);
            let (new_credit, new_debit) = updated.kind.deltas(updated.amount);
            let counted = adjust_totals(
                owner,
                original.generation,
                new_credit - old_credit,
                new_debit - old_debit,
                now,
                &sql_transaction,
            )?;
            if !counted {
                tracing::debug!(
                    "Transaction {id} belongs to an archived period, leaving the aggregate unchanged"
                );
            }

            save_transaction(&updated, &sql_transaction)?;
            sql_transaction.commit()?;

            Ok(updated)
        })
        .await
    }

    /// Set `owner`'s spending limit, creating the aggregate with zero totals if
    /// needed. Returns the limit now in effect.
    ///
    /// Setting the same limit twice leaves the aggregate unchanged apart from
    /// its last-updated time.
    pub async fn set_limit(&self, owner: OwnerId, limit: SpendingLimit) -> Result<Decimal, Error> {
        self.execute(move |connection| {
            upsert_limit(owner, limit, OffsetDateTime::now_utc(), connection)
        })
        .await
    }

    /// Get `owner`'s spending limit, or zero if none has been set.
    pub async fn get_limit(&self, owner: OwnerId) -> Result<Decimal, Error> {
        Ok(self.get_aggregate(owner).await?.limit)
    }

    /// Get `owner`'s limit and current-period totals.
    ///
    /// An owner without an aggregate gets zeros rather than an error.
    pub async fn get_aggregate(&self, owner: OwnerId) -> Result<AggregateSummary, Error> {
        self.execute(move |connection| {
            let summary = get_aggregate(owner, connection)?
                .map(|aggregate| AggregateSummary::from(&aggregate))
                .unwrap_or_default();

            Ok(summary)
        })
        .await
    }

    /// Get all of `owner`'s transactions, most recent occurrence first.
    pub async fn list_transactions(&self, owner: OwnerId) -> Result<Vec<Transaction>, Error> {
        self.execute(move |connection| list_transactions(owner, connection))
            .await
    }

    /// Get `owner`'s archived period totals, oldest period first.
    pub async fn list_archive(&self, owner: OwnerId) -> Result<Vec<ArchiveEntry>, Error> {
        self.execute(move |connection| list_archive_entries(owner, connection))
            .await
    }

    /// Get every owner that has a running aggregate.
    pub async fn owners(&self) -> Result<Vec<OwnerId>, Error> {
        self.execute(|connection| list_aggregate_owners(connection))
            .await
    }

    /// Run `operation` against the database on a blocking thread.
    ///
    /// The connection lock is only held while `operation` runs, never across
    /// an await point. If the database is busy the operation is retried with
    /// a linear backoff, up to [LedgerConfig::max_conflict_retries] times.
    pub(crate) async fn execute<T, F>(&self, operation: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: Fn(&mut Connection) -> Result<T, Error> + Send + Sync + 'static,
    {
        let operation = Arc::new(operation);
        let mut retries = 0;

        loop {
            let db_connection = self.db_connection.clone();
            let attempt = operation.clone();

            let result = tokio::task::spawn_blocking(move || {
                let mut connection = db_connection
                    .lock()
                    .map_err(|_| Error::DatabaseLockError)?;

                (*attempt)(&mut connection)
            })
            .await
            .map_err(|error| Error::TaskFailed(error.to_string()))?;

            match result {
                Err(Error::Conflict) if retries < self.config.max_conflict_retries => {
                    retries += 1;
                    tracing::warn!(
                        "Database busy, retrying ({retries}/{})",
                        self.config.max_conflict_retries
                    );
                    tokio::time::sleep(self.config.conflict_backoff * retries).await;
                }
                Err(Error::Conflict) => return Err(Error::RetriesExhausted(retries + 1)),
                result => return result,
            }
        }
    }
}
