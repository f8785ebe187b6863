//! Middleware that identifies the account holder a request acts on behalf of.
//!
//! Authentication happens upstream. The identity layer in front of this
//! service sets the [OWNER_HEADER] header on every request it lets through.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{Error, OwnerId};

/// The request header that carries the owner's ID.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Middleware function that reads the owner ID from the [OWNER_HEADER] header.
///
/// The owner ID is placed into the request extensions and the request executed
/// normally if the header holds a valid ID, otherwise a 401 response is returned.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(owner): Extension<OwnerId>` to receive the owner ID.
pub async fn require_owner(mut request: Request, next: Next) -> Response {
    let owner = request
        .headers()
        .get(OWNER_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(Error::MissingOwner)
        .and_then(str::parse::<OwnerId>);

    match owner {
        Ok(owner) => {
            request.extensions_mut().insert(owner);
            next.run(request).await
        }
        Err(error) => {
            tracing::warn!("Rejected {} {}: {error}", request.method(), request.uri());
            error.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{Extension, Router, http::StatusCode, middleware, routing::get};
    use axum_test::TestServer;

    use crate::{OwnerId, owner_guard::{OWNER_HEADER, require_owner}};

    fn get_test_server() -> TestServer {
        let app = Router::new()
            .route(
                "/whoami",
                get(|Extension(owner): Extension<OwnerId>| async move { owner.to_string() }),
            )
            .layer(middleware::from_fn(require_owner));

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn passes_owner_to_handler() {
        let server = get_test_server();

        let response = server.get("/whoami").add_header(OWNER_HEADER, "42").await;

        response.assert_status_ok();
        response.assert_text("42");
    }

    #[tokio::test]
    async fn rejects_missing_and_malformed_owner() {
        let server = get_test_server();

        server
            .get("/whoami")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get("/whoami")
            .add_header(OWNER_HEADER, "alice")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get("/whoami")
            .add_header(OWNER_HEADER, "")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
