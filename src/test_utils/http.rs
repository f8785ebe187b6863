use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use rusqlite::Connection;

use crate::{AppState, Ledger, LedgerConfig, build_router, owner_guard::OWNER_HEADER};

pub(crate) fn get_test_ledger() -> Ledger {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");

    Ledger::new(connection, LedgerConfig::default()).expect("Could not create ledger")
}

pub(crate) fn get_test_server(ledger: Ledger) -> TestServer {
    let app = build_router(AppState::from(ledger));

    TestServer::try_new(app).expect("Could not create test server.")
}

#[track_caller]
pub(crate) fn owner_header(owner_id: i64) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(OWNER_HEADER),
        HeaderValue::from(owner_id),
    )
}
