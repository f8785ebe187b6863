//! Finance Recorder keeps a personal-finance ledger for many account holders.
//!
//! Every credit, debit and withdrawal an owner records is appended to a
//! transaction log and added to that owner's running aggregate: their spending
//! limit plus the credit and debit totals for the current calendar month. At
//! the start of each month a rollover archives every aggregate and resets its
//! totals.
//!
//! This library provides the [Ledger] service, the [Rollover] and its
//! scheduler, and a JSON API built on axum.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod aggregate;
mod app_state;
mod archive;
mod database_id;
mod db;
mod endpoints;
mod error;
mod ledger;
mod logging;
mod money;
mod owner;
mod owner_guard;
mod rollover;
mod routing;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use aggregate::{AggregateSummary, RunningAggregate};
pub use app_state::AppState;
pub use archive::{ArchiveEntry, PeriodLabel};
pub use database_id::{DatabaseId, TransactionId};
pub use db::initialize as initialize_db;
pub use error::{Error, ErrorKind};
pub use ledger::{Ledger, LedgerConfig};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use money::{Amount, MAX_MINOR_UNITS, MINOR_UNIT_SCALE, NumberInput, SpendingLimit};
pub use owner::OwnerId;
pub use owner_guard::{OWNER_HEADER, require_owner};
pub use rollover::{
    OwnerOutcome, Rollover, RolloverReport, RolloverState, SchedulerConfig, SchedulerHandle,
    duration_until_next_period, spawn_scheduler,
};
pub use routing::build_router;
pub use timezone::{local_now, to_local_time};
pub use transaction::{
    DEFAULT_TAG, Transaction, TransactionBuilder, TransactionKind, TransactionUpdate,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                tracing::error!("Failed to install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::debug!("Received ctrl+c signal."),
        _ = terminate => tracing::debug!("Received terminate signal."),
    }

    handle.graceful_shutdown(Some(Duration::from_secs(1)));
}
