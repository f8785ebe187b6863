//! Defines the endpoint for changing an existing transaction.

use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    Error, Ledger, OwnerId,
    database_id::TransactionId,
    money::{Amount, NumberInput},
    transaction::{TransactionKind, TransactionUpdate},
};

/// The request body for changing a transaction. Omitted fields are left as is.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionUpdateForm {
    /// The new kind.
    #[serde(default, alias = "type")]
    pub kind: Option<String>,
    /// The new amount, as a JSON number or a numeric string.
    #[serde(default)]
    pub amount: Option<NumberInput>,
    /// The new payment method.
    #[serde(default)]
    pub method: Option<String>,
    /// The new category.
    #[serde(default)]
    pub category: Option<String>,
    /// The new description, an empty string clears it.
    #[serde(default)]
    pub description: Option<String>,
    /// The new occurrence time.
    #[serde(default, alias = "date", with = "time::serde::rfc3339::option")]
    pub occurred_at: Option<OffsetDateTime>,
}

impl TryFrom<TransactionUpdateForm> for TransactionUpdate {
    type Error = Error;

    fn try_from(form: TransactionUpdateForm) -> Result<Self, Self::Error> {
        Ok(TransactionUpdate {
            kind: form
                .kind
                .map(|kind| kind.parse::<TransactionKind>())
                .transpose()?,
            amount: form.amount.map(Amount::try_from).transpose()?,
            method: form.method,
            category: form.category,
            description: form.description,
            occurred_at: form.occurred_at,
        })
    }
}

/// A route handler for changing one of the owner's transactions, responds with
/// the updated transaction.
pub async fn update_transaction_endpoint(
    State(ledger): State<Ledger>,
    Extension(owner): Extension<OwnerId>,
    transaction_id: Result<Path<TransactionId>, PathRejection>,
    form: Result<Json<TransactionUpdateForm>, JsonRejection>,
) -> Response {
    let Path(transaction_id) = match transaction_id {
        Ok(path) => path,
        Err(rejection) => return Error::from(rejection).into_response(),
    };
    let update = match form
        .map_err(Error::from)
        .and_then(|Json(form)| TransactionUpdate::try_from(form))
    {
        Ok(update) => update,
        Err(error) => return error.into_response(),
    };

    match ledger
        .update_transaction(owner, transaction_id, update)
        .await
    {
        Ok(transaction) => Json(transaction).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use serde_json::{Value, json};

    use crate::{
        OwnerId, endpoints,
        test_utils::{get_test_ledger, get_test_server, owner_header},
        transaction::{Transaction, TransactionKind},
    };

    #[tokio::test]
    async fn updates_transaction_and_totals() {
        let ledger = get_test_ledger();
        let owner = OwnerId::new(2);
        let transaction = ledger
            .record_transaction(
                owner,
                Transaction::build(TransactionKind::Debit, "80".parse().unwrap())
                    .category("Food"),
            )
            .await
            .unwrap();
        let server = get_test_server(ledger.clone());
        let (name, value) = owner_header(2);

        let response = server
            .put(&endpoints::format_endpoint(
                endpoints::TRANSACTION,
                transaction.id,
            ))
            .add_header(name, value)
            .json(&json!({ "amount": 95.5, "description": "Dinner" }))
            .await;

        response.assert_status(StatusCode::OK);
        let body = response.json::<Value>();
        assert_eq!(body["amount"], json!("95.50"));
        assert_eq!(body["category"], json!("Food"));
        assert_eq!(body["description"], json!("Dinner"));
        let summary = ledger.get_aggregate(owner).await.unwrap();
        assert_eq!(summary.total_debit, Decimal::new(9550, 2));
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let server = get_test_server(get_test_ledger());
        let (name, value) = owner_header(2);

        let response = server
            .put(&endpoints::format_endpoint(endpoints::TRANSACTION, 404))
            .add_header(name, value)
            .json(&json!({ "amount": "1" }))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["kind"], json!("not_found"));
    }

    #[tokio::test]
    async fn rejects_invalid_changes() {
        let ledger = get_test_ledger();
        let transaction = ledger
            .record_transaction(
                OwnerId::new(2),
                Transaction::build(TransactionKind::Debit, "80".parse().unwrap()),
            )
            .await
            .unwrap();
        let server = get_test_server(ledger);
        let (name, value) = owner_header(2);

        let response = server
            .put(&endpoints::format_endpoint(
                endpoints::TRANSACTION,
                transaction.id,
            ))
            .add_header(name, value)
            .json(&json!({ "kind": "transfer" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_requests_get_json_validation_errors() {
        let ledger = get_test_ledger();
        let transaction = ledger
            .record_transaction(
                OwnerId::new(2),
                Transaction::build(TransactionKind::Debit, "80".parse().unwrap()),
            )
            .await
            .unwrap();
        let server = get_test_server(ledger.clone());
        let (name, value) = owner_header(2);
        let path = endpoints::format_endpoint(endpoints::TRANSACTION, transaction.id);

        let cases = [
            (path.clone(), json!({ "amount": true })),
            (path, json!({ "occurred_at": "2025-13-45" })),
            (
                endpoints::TRANSACTION.replace("{transaction_id}", "abc"),
                json!({ "amount": "1" }),
            ),
        ];
        for (path, body) in cases {
            let response = server
                .put(&path)
                .add_header(name.clone(), value.clone())
                .json(&body)
                .await;

            response.assert_status(StatusCode::BAD_REQUEST);
            let body = response.json::<Value>();
            assert_eq!(body["kind"], json!("validation"));
            assert!(body["error"].is_string());
        }

        let summary = ledger.get_aggregate(OwnerId::new(2)).await.unwrap();
        assert_eq!(summary.total_debit, Decimal::new(80, 0));
    }
}
