//! Token endpoint types.
//!
//! # Supported Grant Types
//!
//! - `authorization_code` - Exchange authorization code for tokens
//! - `client_credentials` - Machine-to-machine authentication
//! - `refresh_token` - Refresh an access token

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Token request parameters.
///
/// Different fields are required depending on the `grant_type`:
///
/// - `authorization_code`: code, redirect_uri, code_verifier
/// - `client_credentials`: (optional) scope
/// - `refresh_token`: refresh_token, (optional) scope
///
/// Clients authenticate with the HTTP Basic header (not in this struct),
/// `client_id` + `client_secret` in the body, or `client_id` alone for
/// public clients.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type.
    #[serde(default)]
    pub grant_type: Option<String>,

    /// Authorization code (for authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// Redirect URI (must match the authorization request).
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// PKCE code verifier (for authorization_code grant).
    #[serde(default)]
    pub code_verifier: Option<String>,

    /// Client ID (for public clients or client_secret_post).
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (for client_secret_post authentication).
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Refresh token (for refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Requested scope.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Successful token response.
///
/// ```json
/// {
///   "access_token": "eyJhbG...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "refresh_token": "tGzv3JOkF0XG5Qx2TlKWIA",
///   "scope": "openid email"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token (JWT).
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Refresh token, when the grant yields one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Granted scopes (space-separated).
    pub scope: String,
}

impl TokenResponse {
    /// Creates a new token response with required fields.
    #[must_use]
    pub fn new(access_token: String, expires_in: u64, scope: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            refresh_token: None,
            scope,
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, token: Option<String>) -> Self {
        self.refresh_token = token;
        self
    }
}

/// Error body shared by the token, introspection and revocation endpoints.
///
/// ```json
/// {
///   "error": "invalid_grant",
///   "error_description": "Authorization code has expired"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenError {
    /// OAuth 2.0 error code.
    pub error: String,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl From<&AuthError> for TokenError {
    fn from(err: &AuthError) -> Self {
        Self {
            error: err.oauth_error_code().to_string(),
            error_description: Some(err.public_description()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_request_from_form_fields() {
        let json = r#"{
            "grant_type": "authorization_code",
            "code": "abc123",
            "redirect_uri": "https://app.example/cb",
            "code_verifier": "verifier123",
            "client_id": "c1"
        }"#;
        let request: TokenRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.grant_type.as_deref(), Some("authorization_code"));
        assert_eq!(request.code_verifier.as_deref(), Some("verifier123"));
        assert!(request.client_secret.is_none());
        assert!(request.refresh_token.is_none());
    }

    #[test]
    fn test_token_response_serialization() {
        let response = TokenResponse::new("at".to_string(), 3600, "read".to_string());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "access_token": "at",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "read"
            })
        );

        let response = response.with_refresh_token(Some("rt".to_string()));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["refresh_token"], "rt");
    }

    #[test]
    fn test_token_error_from_auth_error() {
        let err = TokenError::from(&AuthError::invalid_grant("Authorization code has expired"));
        assert_eq!(err.error, "invalid_grant");
        assert_eq!(
            err.error_description.as_deref(),
            Some("Authorization code has expired")
        );

        let err = TokenError::from(&AuthError::storage("db password leaked"));
        assert_eq!(err.error, "server_error");
        assert!(!err.error_description.unwrap().contains("leaked"));
    }
}
