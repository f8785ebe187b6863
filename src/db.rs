//! Database initialization for the ledger tables.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, aggregate::create_aggregate_table, archive::create_archive_table,
    transaction::create_transaction_table,
};

/// Create the application tables if they do not already exist.
///
/// Safe to call on every start-up.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_transaction_table(&transaction)?;
    create_aggregate_table(&transaction)?;
    create_archive_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
