//! Application router configuration.

use axum::{
    Router, middleware,
    routing::{get, put},
};

use crate::{
    AppState,
    aggregate::{get_aggregate_endpoint, get_limit_endpoint, set_limit_endpoint},
    archive::list_archive_endpoint,
    endpoints,
    owner_guard::require_owner,
    transaction::{
        list_transactions_endpoint, record_transaction_endpoint, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// Every route requires the owner header, see [crate::require_owner].
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(record_transaction_endpoint),
        )
        .route(endpoints::TRANSACTION, put(update_transaction_endpoint))
        .route(endpoints::AGGREGATE, get(get_aggregate_endpoint))
        .route(
            endpoints::MONTHLY_LIMIT,
            get(get_limit_endpoint).put(set_limit_endpoint),
        )
        .route(endpoints::ARCHIVE, get(list_archive_endpoint))
        .layer(middleware::from_fn(require_owner))
        .with_state(state)
}
