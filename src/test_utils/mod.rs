#![allow(missing_docs)]

pub(crate) mod http;

pub(crate) use http::{get_test_ledger, get_test_server, owner_header};
