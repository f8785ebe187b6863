//! The running aggregate model and the database queries that maintain it.
//!
//! Totals are only ever changed with `total = total + delta` statements so
//! that concurrent writers cannot overwrite each other's updates.

use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::Serialize;
use time::{OffsetDateTime, UtcOffset};

use crate::{
    Error, OwnerId,
    money::{SpendingLimit, from_minor_units},
};

// ============================================================================
// MODELS
// ============================================================================

/// An owner's spending limit and totals for the current period.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningAggregate {
    /// The account holder the aggregate belongs to.
    pub owner_id: OwnerId,
    /// The configured spending limit.
    pub limit: Decimal,
    /// The sum of credits recorded since the last reset.
    pub total_credit: Decimal,
    /// The sum of debits and withdrawals recorded since the last reset.
    pub total_debit: Decimal,
    /// How many times the totals have been reset.
    pub generation: i64,
    /// When the aggregate last changed.
    pub updated_at: OffsetDateTime,
}

/// The view of a [RunningAggregate] returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateSummary {
    /// The configured spending limit.
    pub limit: Decimal,
    /// The sum of credits recorded this period.
    pub total_credit: Decimal,
    /// The sum of debits and withdrawals recorded this period.
    pub total_debit: Decimal,
}

impl AggregateSummary {
    /// How much can still be spent this period before the limit is reached.
    ///
    /// Negative once the limit has been exceeded.
    pub fn remaining(&self) -> Decimal {
        self.limit - self.total_debit
    }

    /// Whether a limit has been set and spending has gone past it.
    pub fn is_over_limit(&self) -> bool {
        self.limit > Decimal::ZERO && self.total_debit > self.limit
    }
}

/// Zeros at the same scale as stored totals, so an owner with no aggregate
/// serializes the same way as one that has been reset.
impl Default for AggregateSummary {
    fn default() -> Self {
        Self {
            limit: from_minor_units(0),
            total_credit: from_minor_units(0),
            total_debit: from_minor_units(0),
        }
    }
}

impl From<&RunningAggregate> for AggregateSummary {
    fn from(aggregate: &RunningAggregate) -> Self {
        Self {
            limit: aggregate.limit,
            total_credit: aggregate.total_credit,
            total_debit: aggregate.total_debit,
        }
    }
}

impl Serialize for AggregateSummary {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Json {
            limit: Decimal,
            total_credit: Decimal,
            total_debit: Decimal,
            remaining: Decimal,
            over_limit: bool,
        }

        Json {
            limit: self.limit,
            total_credit: self.total_credit,
            total_debit: self.total_debit,
            remaining: self.remaining(),
            over_limit: self.is_over_limit(),
        }
        .serialize(serializer)
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Add `credit` and `debit` (minor units) to `owner`'s totals, creating the
/// aggregate with a zero limit if it does not exist.
///
/// Returns the generation the deltas were added to.
///
/// # Errors
/// This function will return a:
/// - [Error::TotalOverflow] if a total would no longer fit in an integer,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn apply_delta(
    owner: OwnerId,
    credit: i64,
    debit: i64,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<i64, Error> {
    connection
        .prepare(
            "INSERT INTO running_aggregate (owner_id, total_credit, total_debit, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(owner_id) DO UPDATE SET
                total_credit = total_credit + excluded.total_credit,
                total_debit = total_debit + excluded.total_debit,
                updated_at = excluded.updated_at
             RETURNING generation",
        )?
        .query_row(
            (owner.as_i64(), credit, debit, now.to_offset(UtcOffset::UTC)),
            |row| row.get(0),
        )
        .map_err(|error| map_total_error(owner, error))
}

/// Add `credit` and `debit` (minor units) to `owner`'s totals, but only while
/// the aggregate is still in `generation`.
///
/// Returns `false`, changing nothing, if the aggregate has been reset since
/// `generation` or does not exist.
///
/// # Errors
/// This function will return a:
/// - [Error::TotalOverflow] if a total would no longer fit in an integer,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn adjust_totals(
    owner: OwnerId,
    generation: i64,
    credit: i64,
    debit: i64,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_affected = connection
        .execute(
            "UPDATE running_aggregate
             SET total_credit = total_credit + ?3,
                 total_debit = total_debit + ?4,
                 updated_at = ?5
             WHERE owner_id = ?1 AND generation = ?2",
            (
                owner.as_i64(),
                generation,
                credit,
                debit,
                now.to_offset(UtcOffset::UTC),
            ),
        )
        .map_err(|error| map_total_error(owner, error))?;

    Ok(rows_affected == 1)
}

/// Set `owner`'s spending limit, creating the aggregate with zero totals if it
/// does not exist. Returns the stored limit.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub(crate) fn upsert_limit(
    owner: OwnerId,
    limit: SpendingLimit,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Decimal, Error> {
    connection
        .prepare(
            "INSERT INTO running_aggregate (owner_id, spending_limit, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(owner_id) DO UPDATE SET
                spending_limit = excluded.spending_limit,
                updated_at = excluded.updated_at
             RETURNING spending_limit",
        )?
        .query_row(
            (
                owner.as_i64(),
                limit.minor_units(),
                now.to_offset(UtcOffset::UTC),
            ),
            |row| row.get(0).map(from_minor_units),
        )
        .map_err(|error| error.into())
}

/// Zero `owner`'s totals and start a new generation. The limit is kept.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub(crate) fn reset_totals(
    owner: OwnerId,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE running_aggregate
         SET total_credit = 0, total_debit = 0, generation = generation + 1, updated_at = ?2
         WHERE owner_id = ?1",
        (owner.as_i64(), now.to_offset(UtcOffset::UTC)),
    )?;

    Ok(())
}

/// Get `owner`'s aggregate, or `None` if it has not been created yet.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub(crate) fn get_aggregate(
    owner: OwnerId,
    connection: &Connection,
) -> Result<Option<RunningAggregate>, Error> {
    connection
        .prepare(
            "SELECT owner_id, spending_limit, total_credit, total_debit, generation, updated_at
             FROM running_aggregate WHERE owner_id = :owner_id",
        )?
        .query_row(&[(":owner_id", &owner.as_i64())], map_aggregate_row)
        .optional()
        .map_err(|error| error.into())
}

/// Get the owners that have an aggregate, in ascending order.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub(crate) fn list_aggregate_owners(connection: &Connection) -> Result<Vec<OwnerId>, Error> {
    connection
        .prepare("SELECT owner_id FROM running_aggregate ORDER BY owner_id")?
        .query_map([], |row| row.get(0).map(OwnerId::new))?
        .map(|maybe_owner| maybe_owner.map_err(Error::from))
        .collect()
}

/// Create the running aggregate table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_aggregate_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS running_aggregate (
                owner_id INTEGER PRIMARY KEY,
                spending_limit INTEGER NOT NULL DEFAULT 0 CHECK (spending_limit >= 0),
                total_credit INTEGER NOT NULL DEFAULT 0 CHECK (typeof(total_credit) = 'integer'),
                total_debit INTEGER NOT NULL DEFAULT 0 CHECK (typeof(total_debit) = 'integer'),
                generation INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// SQLite turns an integer sum that overflows into a real number, which the
/// `typeof` checks on the totals refuse.
fn map_total_error(owner: OwnerId, error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(ref sql_error, _)
            if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_CHECK =>
        {
            Error::TotalOverflow(owner)
        }
        error => error.into(),
    }
}

fn map_aggregate_row(row: &Row) -> Result<RunningAggregate, rusqlite::Error> {
    Ok(RunningAggregate {
        owner_id: OwnerId::new(row.get(0)?),
        limit: from_minor_units(row.get(1)?),
        total_credit: from_minor_units(row.get(2)?),
        total_debit: from_minor_units(row.get(3)?),
        generation: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
