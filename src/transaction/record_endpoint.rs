//! Defines the endpoint for recording a new transaction.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    Error, Ledger, OwnerId,
    money::{Amount, NumberInput},
    transaction::{Transaction, TransactionBuilder, TransactionKind},
};

/// The request body for recording a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// One of "credit", "debit" or "withdrawal".
    #[serde(alias = "type")]
    pub kind: Option<String>,
    /// The value of the transaction, as a JSON number or a numeric string.
    pub amount: Option<NumberInput>,
    /// How the transaction was paid, defaults to "Other".
    #[serde(default)]
    pub method: Option<String>,
    /// What the transaction was for, defaults to "Other".
    #[serde(default)]
    pub category: Option<String>,
    /// Text detailing the transaction.
    #[serde(default)]
    pub description: Option<String>,
    /// When the transaction happened, defaults to now.
    #[serde(default, alias = "date", with = "time::serde::rfc3339::option")]
    pub occurred_at: Option<OffsetDateTime>,
}

impl TryFrom<TransactionForm> for TransactionBuilder {
    type Error = Error;

    fn try_from(form: TransactionForm) -> Result<Self, Self::Error> {
        let kind: TransactionKind = form
            .kind
            .ok_or_else(|| Error::InvalidKind(String::new()))?
            .parse()?;
        let amount: Amount = form
            .amount
            .ok_or_else(|| Error::InvalidAmount(String::new()))?
            .try_into()?;

        Ok(TransactionBuilder {
            method: form.method,
            category: form.category,
            description: form.description,
            occurred_at: form.occurred_at,
            ..Transaction::build(kind, amount)
        })
    }
}

/// A route handler for recording a transaction, responds with the stored
/// transaction and 201 Created on success.
pub async fn record_transaction_endpoint(
    State(ledger): State<Ledger>,
    Extension(owner): Extension<OwnerId>,
    form: Result<Json<TransactionForm>, JsonRejection>,
) -> Response {
    let builder = match form
        .map_err(Error::from)
        .and_then(|Json(form)| TransactionBuilder::try_from(form))
    {
        Ok(builder) => builder,
        Err(error) => return error.into_response(),
    };

    match ledger.record_transaction(owner, builder).await {
        Ok(transaction) => (StatusCode::CREATED, Json(transaction)).into_response(),
        Err(error) => error.into_response(),
    }
}
