//! Defines the app level error type and its conversion to JSON error responses.
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::{OwnerId, database_id::TransactionId};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The amount of a transaction was missing, not a number, not positive,
    /// or had more than two decimal places.
    ///
    /// Callers should pass in the raw amount as supplied by the client.
    #[error("invalid amount {0:?}: amounts must be positive numbers with at most two decimal places")]
    InvalidAmount(String),

    /// The transaction kind was not one of credit, debit or withdrawal.
    #[error("invalid transaction kind {0:?}, expected one of credit, debit or withdrawal")]
    InvalidKind(String),

    /// The spending limit was missing, not a number, negative, or had more
    /// than two decimal places.
    #[error("invalid limit {0:?}: limits must be non-negative numbers with at most two decimal places")]
    InvalidLimit(String),

    /// A period label could not be parsed or falls outside the supported
    /// calendar range.
    #[error("invalid period {0:?}, expected a calendar month formatted as YYYY-MM")]
    InvalidPeriod(String),

    /// The request body or path could not be read, e.g. malformed JSON or a
    /// field of the wrong type.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Adding a transaction would push the owner's totals past what can be
    /// stored. Nothing was recorded.
    #[error("the totals for owner {0} cannot grow any larger this period")]
    TotalOverflow(OwnerId),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The request did not carry an owner reference.
    ///
    /// The owner is established by the identity layer in front of the
    /// ledger, so this indicates a request that bypassed authentication.
    #[error("the request does not identify an owner")]
    MissingOwner,

    /// Tried to update a transaction that does not exist or belongs to
    /// another owner.
    #[error("transaction {0} could not be found")]
    TransactionNotFound(TransactionId),

    /// The database reported that it was busy or locked by another writer.
    ///
    /// The ledger retries these internally, so callers normally see
    /// [Error::RetriesExhausted] instead.
    #[error("the database is busy")]
    Conflict,

    /// The database stayed busy for every retry of an operation.
    #[error("gave up after {0} attempts because the database stayed busy")]
    RetriesExhausted(u32),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The blocking task that ran a database operation panicked or was
    /// cancelled by the runtime.
    #[error("a background database task failed: {0}")]
    TaskFailed(String),

    /// A rollover was requested while another rollover was still running.
    #[error("a rollover is already in progress")]
    RolloverInProgress,
}

/// The broad categories of [Error] that callers need to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input. The caller should correct the input, the ledger never retries these.
    Validation,
    /// The owner reference is missing.
    Authorization,
    /// The referenced record does not exist.
    NotFound,
    /// A concurrent writer held the database.
    Conflict,
    /// The persistence layer failed.
    Storage,
}

impl Error {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidAmount(_)
            | Error::InvalidKind(_)
            | Error::InvalidLimit(_)
            | Error::InvalidPeriod(_)
            | Error::InvalidRequest(_)
            | Error::TotalOverflow(_)
            | Error::InvalidTimezoneError(_) => ErrorKind::Validation,
            Error::MissingOwner => ErrorKind::Authorization,
            Error::TransactionNotFound(_) => ErrorKind::NotFound,
            Error::Conflict => ErrorKind::Conflict,
            Error::RetriesExhausted(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::TaskFailed(_)
            | Error::RolloverInProgress => ErrorKind::Storage,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(ref sql_error, _)
                if matches!(
                    sql_error.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                Error::Conflict
            }
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, self.to_string()),
            ErrorKind::Authorization => (StatusCode::UNAUTHORIZED, self.to_string()),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ErrorKind::Conflict => (StatusCode::CONFLICT, self.to_string()),
            // Storage errors are not intended to be shown to the client.
            ErrorKind::Storage => {
                tracing::error!("An unexpected error occurred: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred, check the server logs for more details."
                        .to_owned(),
                )
            }
        };

        (status, Json(json!({ "error": message, "kind": kind }))).into_response()
    }
}
