//! The archive entry model and its database queries.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::Serialize;
use time::{OffsetDateTime, UtcOffset};

use crate::{
    Error, OwnerId,
    aggregate::RunningAggregate,
    archive::PeriodLabel,
    money::{from_minor_units, to_minor_units},
};

/// A snapshot of one owner's totals at the end of one period.
///
/// Entries are written once by the rollover and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveEntry {
    /// The account holder the entry belongs to.
    pub owner_id: OwnerId,
    /// The month the totals were accumulated in.
    pub period: PeriodLabel,
    /// The credit total at the end of the period.
    pub total_credit: Decimal,
    /// The debit total at the end of the period.
    pub total_debit: Decimal,
    /// The spending limit in effect at the end of the period.
    pub limit: Decimal,
    /// When the snapshot was taken.
    #[serde(with = "time::serde::rfc3339")]
    pub archived_at: OffsetDateTime,
}

/// Write a snapshot of `aggregate` for `period`, unless that owner already has
/// an entry for `period`.
///
/// Returns `true` if the entry was written.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub(crate) fn insert_archive_entry_if_absent(
    aggregate: &RunningAggregate,
    period: PeriodLabel,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<bool, Error> {
    let minor_units = |value: Decimal| {
        to_minor_units(value).ok_or_else(|| Error::InvalidAmount(value.to_string()))
    };
    let total_credit = minor_units(aggregate.total_credit)?;
    let total_debit = minor_units(aggregate.total_debit)?;
    let limit = minor_units(aggregate.limit)?;

    let rows_affected = connection.execute(
        "INSERT INTO archive_entry
            (owner_id, period, total_credit, total_debit, spending_limit, archived_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(owner_id, period) DO NOTHING",
        (
            aggregate.owner_id.as_i64(),
            period,
            total_credit,
            total_debit,
            limit,
            now.to_offset(UtcOffset::UTC),
        ),
    )?;

    Ok(rows_affected == 1)
}

/// Get all of `owner`'s archive entries, oldest period first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub(crate) fn list_archive_entries(
    owner: OwnerId,
    connection: &Connection,
) -> Result<Vec<ArchiveEntry>, Error> {
    connection
        .prepare(
            "SELECT owner_id, period, total_credit, total_debit, spending_limit, archived_at
             FROM archive_entry WHERE owner_id = :owner_id ORDER BY period ASC",
        )?
        .query_map(&[(":owner_id", &owner.as_i64())], map_archive_row)?
        .map(|maybe_entry| maybe_entry.map_err(Error::from))
        .collect()
}

/// Create the archive table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_archive_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS archive_entry (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                period TEXT NOT NULL,
                total_credit INTEGER NOT NULL,
                total_debit INTEGER NOT NULL,
                spending_limit INTEGER NOT NULL,
                archived_at TEXT NOT NULL,
                UNIQUE(owner_id, period)
                )",
        (),
    )?;

    Ok(())
}

fn map_archive_row(row: &Row) -> Result<ArchiveEntry, rusqlite::Error> {
    Ok(ArchiveEntry {
        owner_id: OwnerId::new(row.get(0)?),
        period: row.get(1)?,
        total_credit: from_minor_units(row.get(2)?),
        total_debit: from_minor_units(row.get(3)?),
        limit: from_minor_units(row.get(4)?),
        archived_at: row.get(5)?,
    })
}
