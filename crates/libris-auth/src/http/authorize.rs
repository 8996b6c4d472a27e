//! Authorization endpoint handler.
//!
//! # Request Format
//!
//! ```text
//! GET /authorize?response_type=code
//!     &client_id=c1
//!     &redirect_uri=https://app.example/cb
//!     &scope=openid%20email
//!     &state=xyz
//!     &code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM
//!     &code_challenge_method=S256
//! ```
//!
//! # Response
//!
//! - 302 to the redirect URI with `code` and `state` on success
//! - 302 to the redirect URI with `error`, `error_description` and `state`
//!   once the redirect URI is trusted
//! - an HTML error page when the client or redirect URI cannot be trusted

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use crate::http::state::AuthState;
use crate::oauth::authorize::{AuthorizationError, AuthorizationErrorCode, AuthorizationRequest};

/// Handler for `GET /authorize`.
pub async fn authorize_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    query: Result<Query<AuthorizationRequest>, QueryRejection>,
) -> Response {
    let Ok(Query(request)) = query else {
        return error_page(&AuthorizationError::direct(
            AuthorizationErrorCode::InvalidRequest,
            "Malformed authorization request",
        ));
    };

    let subject = state.resource_owner.resolve(&headers).await;

    match state.authorization.authorize(&request, subject.as_deref()).await {
        Ok(response) => match response.to_redirect_url() {
            Ok(location) => found(location),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build authorization redirect");
                error_page(&AuthorizationError::direct(
                    AuthorizationErrorCode::ServerError,
                    "The authorization server encountered an unexpected condition",
                ))
            }
        },
        Err(error) => match error.to_redirect_url() {
            Some(location) => {
                tracing::debug!(error = %error.error, "Authorization error redirected to client");
                found(location)
            }
            None => {
                tracing::debug!(error = %error.error, "Authorization error rendered directly");
                error_page(&error)
            }
        },
    }
}

fn found(location: String) -> Response {
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, location),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
    )
        .into_response()
}

fn error_page(error: &AuthorizationError) -> Response {
    let status = match error.error {
        AuthorizationErrorCode::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    let description = error.error_description.as_deref().unwrap_or_default();
    (status, Html(render_error_page(error.error.as_str(), description))).into_response()
}

fn render_error_page(error: &str, description: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Authorization error</title>
</head>
<body>
<h1>Authorization error</h1>
<p><code>{}</code></p>
<p>{}</p>
</body>
</html>
"#,
        html_escape(error),
        html_escape(description)
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_page_escapes_description() {
        let html = render_error_page("invalid_request", "<script>alert('x')</script>");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("invalid_request"));
    }

    #[test]
    fn test_found_sets_location() {
        let response = found("https://app.example/cb?code=abc".to_string());
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://app.example/cb?code=abc"
        );
    }
}
