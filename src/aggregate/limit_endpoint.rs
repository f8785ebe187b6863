//! Defines the endpoints for reading and setting an owner's monthly spending limit.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Error, Ledger, OwnerId, money::NumberInput, money::SpendingLimit};

/// The request body for setting a limit.
#[derive(Debug, Deserialize)]
pub struct LimitForm {
    /// The new limit, as a JSON number or a numeric string.
    #[serde(alias = "monthlyLimit")]
    pub monthly_limit: Option<NumberInput>,
}

/// The response body for the limit endpoints.
#[derive(Debug, Serialize)]
struct LimitResponse {
    monthly_limit: Decimal,
}

/// A route handler that returns the owner's spending limit, zero if unset.
pub async fn get_limit_endpoint(
    State(ledger): State<Ledger>,
    Extension(owner): Extension<OwnerId>,
) -> Response {
    match ledger.get_limit(owner).await {
        Ok(monthly_limit) => Json(LimitResponse { monthly_limit }).into_response(),
        Err(error) => error.into_response(),
    }
}

/// A route handler that sets the owner's spending limit.
pub async fn set_limit_endpoint(
    State(ledger): State<Ledger>,
    Extension(owner): Extension<OwnerId>,
    form: Result<Json<LimitForm>, JsonRejection>,
) -> Response {
    let Json(form) = match form {
        Ok(form) => form,
        Err(rejection) => return Error::from(rejection).into_response(),
    };
    let limit: SpendingLimit = match form.monthly_limit {
        Some(raw_limit) => match raw_limit.try_into() {
            Ok(limit) => limit,
            Err(error) => return error.into_response(),
        },
        None => return Error::InvalidLimit(String::new()).into_response(),
    };

    match ledger.set_limit(owner, limit).await {
        Ok(monthly_limit) => Json(LimitResponse { monthly_limit }).into_response(),
        Err(error) => error.into_response(),
    }
}
