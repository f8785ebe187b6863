//! Implements a struct that holds the state of the REST server.

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{Error, Ledger, LedgerConfig};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The ledger that every endpoint reads from and writes to.
    pub ledger: Ledger,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, ledger_config: LedgerConfig) -> Result<Self, Error> {
        Ok(Self {
            ledger: Ledger::new(db_connection, ledger_config)?,
        })
    }
}

impl From<Ledger> for AppState {
    fn from(ledger: Ledger) -> Self {
        Self { ledger }
    }
}

impl FromRef<AppState> for Ledger {
    fn from_ref(state: &AppState) -> Self {
        state.ledger.clone()
    }
}
