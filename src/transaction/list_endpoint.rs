//! Defines the endpoint for listing an owner's transactions.

use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};

use crate::{Ledger, OwnerId};

/// A route handler that returns the owner's transactions, most recent first.
pub async fn list_transactions_endpoint(
    State(ledger): State<Ledger>,
    Extension(owner): Extension<OwnerId>,
) -> Response {
    match ledger.list_transactions(owner).await {
        Ok(transactions) => Json(transactions).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use time::macros::datetime;

    use crate::{
        OwnerId, endpoints,
        test_utils::{get_test_ledger, get_test_server, owner_header},
        transaction::{Transaction, TransactionKind},
    };

    #[tokio::test]
    async fn lists_only_own_transactions_newest_first() {
        let ledger = get_test_ledger();
        for (owner, day, description) in [(1, 3, "first"), (1, 20, "second"), (2, 25, "other")] {
            ledger
                .record_transaction(
                    OwnerId::new(owner),
                    Transaction::build(TransactionKind::Debit, "5".parse().unwrap())
                        .description(description)
                        .occurred_at(datetime!(2025-10-01 12:00 UTC).replace_day(day).unwrap()),
                )
                .await
                .unwrap();
        }
        let server = get_test_server(ledger);
        let (name, value) = owner_header(1);

        let response = server.get(endpoints::TRANSACTIONS).add_header(name, value).await;

        response.assert_status(StatusCode::OK);
        let descriptions: Vec<Value> = response
            .json::<Vec<Value>>()
            .into_iter()
            .map(|transaction| transaction["description"].clone())
            .collect();
        assert_eq!(descriptions, [json!("second"), json!("first")]);
    }
}
