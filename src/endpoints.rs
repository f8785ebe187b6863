//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}',
//! use [format_endpoint].

/// The route for recording and listing transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route for changing a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route for reading the current period's totals.
pub const AGGREGATE: &str = "/api/aggregate";
/// The route for reading and setting the monthly spending limit.
pub const MONTHLY_LIMIT: &str = "/api/monthly-limit";
/// The route for reading the totals of past periods.
pub const ARCHIVE: &str = "/api/archive";

/// Replace the first `{parameter}` in `endpoint_path` with `id`.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some((head, rest)) = endpoint_path.split_once('{') else {
        return endpoint_path.to_owned();
    };
    let tail = rest.split_once('}').map_or("", |(_, tail)| tail);

    format!("{head}{id}{tail}")
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS);
        assert_endpoint_is_valid_uri(endpoints::AGGREGATE);
        assert_endpoint_is_valid_uri(endpoints::MONTHLY_LIMIT);
        assert_endpoint_is_valid_uri(endpoints::ARCHIVE);
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::TRANSACTION, 1));
    }

    #[test]
    fn replaces_parameter() {
        assert_eq!(
            format_endpoint(endpoints::TRANSACTION, 42),
            "/api/transactions/42"
        );
        assert_eq!(format_endpoint("/hello/{world}/bye", 1), "/hello/1/bye");
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        assert_eq!(format_endpoint(endpoints::ARCHIVE, 1), endpoints::ARCHIVE);
    }
}
