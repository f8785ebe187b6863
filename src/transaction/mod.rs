//! The transaction log: every credit, debit and withdrawal recorded for an
//! owner.
//!
//! This module contains:
//! - The `Transaction` model, `TransactionBuilder` and `TransactionUpdate`
//! - Database functions for appending, reading and editing transactions
//! - The JSON endpoints for recording, listing and editing transactions

mod core;
mod list_endpoint;
mod record_endpoint;
mod update_endpoint;

pub use core::{
    DEFAULT_TAG, Transaction, TransactionBuilder, TransactionKind, TransactionUpdate,
    create_transaction_table,
};
pub use list_endpoint::list_transactions_endpoint;
pub use record_endpoint::record_transaction_endpoint;
pub use update_endpoint::update_transaction_endpoint;

pub(crate) use core::{get_transaction, insert_transaction, list_transactions, save_transaction};

#[cfg(test)]
pub(crate) use core::{count_transactions, sum_generation};
