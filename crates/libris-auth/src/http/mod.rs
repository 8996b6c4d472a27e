//! HTTP handlers for the OAuth 2.0 endpoints.
//!
//! # Available Handlers
//!
//! - [`authorize`] - Authorization endpoint (RFC 6749 §4.1.1)
//! - [`token`] - Token endpoint (RFC 6749 §3.2)
//! - [`introspect`] - Token introspection (RFC 7662)
//! - [`revoke`] - Token revocation (RFC 7009)
//! - [`userinfo`] - OpenID Connect UserInfo
//! - [`discovery`] - Authorization server metadata (RFC 8414)
//!
//! # Usage
//!
//! ```ignore
//! let state = AuthState::new(&config, StoragePorts::from_backend(storage), owner)?;
//! let app = libris_auth::http::router(state);
//! ```

pub mod authorize;
mod credentials;
pub mod discovery;
pub mod error;
pub mod introspect;
pub mod owner;
pub mod revoke;
pub mod state;
pub mod token;
pub mod userinfo;

use axum::Router;
use axum::routing::{get, post};

pub use authorize::authorize_handler;
pub use discovery::metadata_handler;
pub use introspect::introspect_handler;
pub use owner::{HeaderResourceOwner, ResourceOwnerResolver};
pub use revoke::revoke_handler;
pub use state::AuthState;
pub use token::token_handler;
pub use userinfo::userinfo_handler;

use crate::discovery::paths;

/// Builds the router serving every endpoint at its path under the issuer.
pub fn router(state: AuthState) -> Router {
    Router::new()
        .route(paths::AUTHORIZE, get(authorize_handler))
        .route(paths::TOKEN, post(token_handler))
        .route(paths::INTROSPECT, post(introspect_handler))
        .route(paths::REVOKE, post(revoke_handler))
        .route(paths::USERINFO, get(userinfo_handler).post(userinfo_handler))
        .route(paths::METADATA, get(metadata_handler))
        .route(paths::OPENID_CONFIGURATION, get(metadata_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use crate::grant::test_support::*;
    use crate::storage::StoragePorts;

    fn app() -> Router {
        let (storage, _, _) = setup(&config());
        let owner = Arc::new(HeaderResourceOwner::new("x-authenticated-user").unwrap());
        let state = AuthState::new(&config(), StoragePorts::from_backend(storage), owner).unwrap();
        router(state)
    }

    #[tokio::test]
    async fn test_metadata_is_cacheable() {
        let response = app()
            .oneshot(
                Request::get("/.well-known/oauth-authorization-server")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=3600"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["token_endpoint"], "http://localhost:8080/token");
    }

    #[tokio::test]
    async fn test_unknown_client_renders_error_page() {
        let response = app()
            .oneshot(
                Request::get("/authorize?response_type=code&client_id=nobody")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::LOCATION).is_none());
    }

    #[tokio::test]
    async fn test_token_without_form_is_invalid_request() {
        let response = app()
            .oneshot(Request::post("/token").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_userinfo_without_bearer() {
        let response = app()
            .oneshot(Request::get("/userinfo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response.headers().get(header::WWW_AUTHENTICATE).unwrap();
        assert!(challenge.to_str().unwrap().contains("error=\"invalid_token\""));
    }

    #[tokio::test]
    async fn test_revoke_requires_client() {
        let response = app()
            .oneshot(
                Request::post("/revoke")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("token=abc"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
