//! Defines the endpoint for reading an owner's archived period totals.

use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};

use crate::{Ledger, OwnerId};

/// A route handler that returns the owner's archive entries, oldest period first.
pub async fn list_archive_endpoint(
    State(ledger): State<Ledger>,
    Extension(owner): Extension<OwnerId>,
) -> Response {
    match ledger.list_archive(owner).await {
        Ok(entries) => Json(entries).into_response(),
        Err(error) => error.into_response(),
    }
}
