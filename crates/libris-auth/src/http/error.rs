//! HTTP rendering of [`AuthError`].
//!
//! - `invalid_client` → 401 with a `Basic` challenge
//! - `invalid_token` → 401 and `insufficient_scope` → 403, both with a
//!   `Bearer` challenge
//! - server errors → 500 with a generic description, the cause is logged
//! - everything else → 400
//!
//! The body is always `{"error": ..., "error_description": ...}`.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::error::AuthError;
use crate::oauth::token::TokenError;

/// Realm advertised in `WWW-Authenticate` challenges.
pub const REALM: &str = "libris";

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_for(&self);

        if self.is_server_error() {
            tracing::error!(error = %self, "Authorization server error");
        }

        let mut headers = HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));

        let challenge = match &self {
            AuthError::InvalidClient { .. } => Some(format!("Basic realm=\"{REALM}\"")),
            e if e.is_bearer_error() => Some(bearer_challenge(
                e.oauth_error_code(),
                &e.public_description(),
            )),
            _ => None,
        };
        if let Some(value) = challenge.and_then(|c| HeaderValue::from_str(&c).ok()) {
            headers.insert(header::WWW_AUTHENTICATE, value);
        }

        (status, headers, Json(TokenError::from(&self))).into_response()
    }
}

fn status_for(error: &AuthError) -> StatusCode {
    match error {
        AuthError::InvalidClient { .. } | AuthError::InvalidToken { .. } => {
            StatusCode::UNAUTHORIZED
        }
        AuthError::InsufficientScope { .. } | AuthError::AccessDenied { .. } => {
            StatusCode::FORBIDDEN
        }
        e if e.is_server_error() => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

/// Builds a `WWW-Authenticate` value per RFC 6750 §3.
///
/// Format: `Bearer realm="libris", error="invalid_token", error_description="..."`
fn bearer_challenge(error: &str, description: &str) -> String {
    let escaped = description.replace('\\', "\\\\").replace('"', "\\\"");
    format!("Bearer realm=\"{REALM}\", error=\"{error}\", error_description=\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn challenge(response: &Response) -> Option<&str> {
        response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_invalid_grant_is_400() {
        let response = AuthError::invalid_grant("Authorization code has expired").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(challenge(&response).is_none());
        assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");

        let json = body(response).await;
        assert_eq!(json["error"], "invalid_grant");
        assert_eq!(json["error_description"], "Authorization code has expired");
    }

    #[tokio::test]
    async fn test_invalid_client_carries_basic_challenge() {
        let response = AuthError::invalid_client("Client authentication failed").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(challenge(&response), Some("Basic realm=\"libris\""));
    }

    #[tokio::test]
    async fn test_bearer_errors() {
        let response = AuthError::invalid_token("Access token is not active").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(challenge(&response).unwrap().contains("error=\"invalid_token\""));

        let response = AuthError::insufficient_scope("openid required").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(challenge(&response).unwrap().contains("error=\"insufficient_scope\""));
    }

    #[tokio::test]
    async fn test_server_error_hides_cause() {
        let response = AuthError::storage("find_by_code timed out").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body(response).await;
        assert_eq!(json["error"], "server_error");
        assert!(!json["error_description"].as_str().unwrap().contains("find_by_code"));
    }

    #[test]
    fn test_bearer_challenge_escaping() {
        let header = bearer_challenge("invalid_token", "Token contains \"quotes\"");
        assert!(header.contains("\\\"quotes\\\""));
    }
}
