//! Defines the endpoint for reading an owner's running aggregate.

use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};

use crate::{Ledger, OwnerId};

/// A route handler that returns the owner's limit and current-period totals.
///
/// Owners without any transactions or limit get zeros.
pub async fn get_aggregate_endpoint(
    State(ledger): State<Ledger>,
    Extension(owner): Extension<OwnerId>,
) -> Response {
    match ledger.get_aggregate(owner).await {
        Ok(summary) => Json(summary).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        OwnerId, endpoints,
        test_utils::{get_test_ledger, get_test_server, owner_header},
        transaction::{Transaction, TransactionKind},
    };

    #[tokio::test]
    async fn new_owner_gets_zeros() {
        let server = get_test_server(get_test_ledger());
        let (name, value) = owner_header(1);

        let response = server.get(endpoints::AGGREGATE).add_header(name, value).await;

        response.assert_status(StatusCode::OK);
        let body = response.json::<Value>();
        assert_eq!(body["limit"], json!("0"));
        assert_eq!(body["total_credit"], json!("0"));
        assert_eq!(body["total_debit"], json!("0"));
        assert_eq!(body["over_limit"], json!(false));
    }

    #[tokio::test]
    async fn reports_over_limit_spending() {
        let ledger = get_test_ledger();
        let owner = OwnerId::new(1);
        ledger.set_limit(owner, "100".parse().unwrap()).await.unwrap();
        ledger
            .record_transaction(
                owner,
                Transaction::build(TransactionKind::Debit, "150.25".parse().unwrap()),
            )
            .await
            .unwrap();
        let server = get_test_server(ledger);
        let (name, value) = owner_header(1);

        let body = server
            .get(endpoints::AGGREGATE)
            .add_header(name, value)
            .await
            .json::<Value>();

        assert_eq!(body["limit"], json!("100.00"));
        assert_eq!(body["total_debit"], json!("150.25"));
        assert_eq!(body["remaining"], json!("-50.25"));
        assert_eq!(body["over_limit"], json!(true));
    }

    #[tokio::test]
    async fn rejects_requests_without_owner() {
        let server = get_test_server(get_test_ledger());

        let response = server.get(endpoints::AGGREGATE).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["kind"], json!("authorization"));
    }
}
