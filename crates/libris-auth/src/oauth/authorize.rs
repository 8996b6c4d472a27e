//! Authorization endpoint types.
//!
//! # OAuth 2.0 Authorization Code Flow
//!
//! 1. Client redirects the resource owner to the authorization endpoint
//! 2. The resource owner is identified by the embedding application
//! 3. Server redirects back to the client with an authorization code
//! 4. Client exchanges the code and its PKCE verifier at the token endpoint

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AuthError;

/// Authorization request parameters.
///
/// Every field is optional at the parsing stage so that a missing parameter
/// is reported with the right error channel (page or redirect) instead of a
/// generic deserialization failure.
///
/// # Example
///
/// ```text
/// GET /authorize?
///   response_type=code
///   &client_id=c1
///   &redirect_uri=https://app.example/cb
///   &scope=openid email
///   &state=abc123xyz
///   &code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM
///   &code_challenge_method=S256
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationRequest {
    /// Must be "code".
    #[serde(default)]
    pub response_type: Option<String>,

    /// Client identifier issued during registration.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Must exactly match one of the registered redirect URIs.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Requested scopes (space-separated).
    #[serde(default)]
    pub scope: Option<String>,

    /// Opaque value echoed back to the client.
    #[serde(default)]
    pub state: Option<String>,

    /// PKCE code challenge.
    #[serde(default)]
    pub code_challenge: Option<String>,

    /// PKCE code challenge method, `S256` or `plain`.
    #[serde(default)]
    pub code_challenge_method: Option<String>,
}

/// Successful authorization: where to send the resource owner next.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationResponse {
    /// Authorization code to be exchanged for tokens.
    pub code: String,

    /// Echoed state parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// The validated redirect URI.
    #[serde(skip)]
    pub redirect_uri: String,
}

impl AuthorizationResponse {
    /// Builds the redirect URL with response parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI does not parse.
    pub fn to_redirect_url(&self) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(&self.redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", &self.code);
            if let Some(ref state) = self.state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.to_string())
    }
}

/// Authorization error response.
///
/// When `redirect_uri` is set the redirect URI has been validated and the
/// error goes back to the client as query parameters. Otherwise it must be
/// shown to the resource owner directly.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationError {
    /// OAuth 2.0 error code.
    pub error: AuthorizationErrorCode,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// Echoed state parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Trusted redirect URI, if validation got that far.
    #[serde(skip)]
    pub redirect_uri: Option<String>,
}

impl AuthorizationError {
    /// Creates an error rendered to the resource owner.
    #[must_use]
    pub fn direct(error: AuthorizationErrorCode, description: impl Into<String>) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
            state: None,
            redirect_uri: None,
        }
    }

    /// Creates an error delivered through the redirect URI.
    #[must_use]
    pub fn redirect(
        error: AuthorizationErrorCode,
        description: impl Into<String>,
        redirect_uri: impl Into<String>,
        state: Option<String>,
    ) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
            state,
            redirect_uri: Some(redirect_uri.into()),
        }
    }

    /// Returns `true` if this error can be sent to the redirect URI.
    #[must_use]
    pub fn is_redirectable(&self) -> bool {
        self.redirect_uri.is_some()
    }

    /// Builds the redirect URL with error parameters.
    ///
    /// Returns `None` for direct errors or an unparseable redirect URI.
    #[must_use]
    pub fn to_redirect_url(&self) -> Option<String> {
        let mut url = url::Url::parse(self.redirect_uri.as_deref()?).ok()?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("error", self.error.as_str());
            if let Some(ref desc) = self.error_description {
                pairs.append_pair("error_description", desc);
            }
            if let Some(ref state) = self.state {
                pairs.append_pair("state", state);
            }
        }
        Some(url.to_string())
    }
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {desc}", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

/// OAuth 2.0 authorization error codes (RFC 6749 §4.1.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorCode {
    /// The request is missing a required parameter or is otherwise malformed.
    InvalidRequest,

    /// The client is unknown or inactive. Only ever rendered directly.
    InvalidClient,

    /// The client is not authorized to request a code using this method.
    UnauthorizedClient,

    /// The resource owner or authorization server denied the request.
    AccessDenied,

    /// The authorization server does not support this response type.
    UnsupportedResponseType,

    /// The requested scope is invalid, unknown, or malformed.
    InvalidScope,

    /// The authorization server encountered an unexpected condition.
    ServerError,
}

impl AuthorizationErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
        }
    }
}

impl From<&AuthError> for AuthorizationErrorCode {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::InvalidClient { .. } => Self::InvalidClient,
            AuthError::UnauthorizedClient { .. } => Self::UnauthorizedClient,
            AuthError::AccessDenied { .. } => Self::AccessDenied,
            AuthError::UnsupportedResponseType { .. } => Self::UnsupportedResponseType,
            AuthError::InvalidScope { .. } => Self::InvalidScope,
            e if e.is_server_error() => Self::ServerError,
            _ => Self::InvalidRequest,
        }
    }
}

impl fmt::Display for AuthorizationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_request_deserialize_partial() {
        let json = r#"{
            "response_type": "code",
            "client_id": "c1",
            "redirect_uri": "https://app.example/cb"
        }"#;
        let request: AuthorizationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.client_id.as_deref(), Some("c1"));
        assert!(request.scope.is_none());
        assert!(request.code_challenge.is_none());
    }

    #[test]
    fn test_authorization_response_to_redirect_url() {
        let response = AuthorizationResponse {
            code: "code123".to_string(),
            state: Some("state 456".to_string()),
            redirect_uri: "https://app.example/cb".to_string(),
        };
        let url = response.to_redirect_url().unwrap();
        assert_eq!(url, "https://app.example/cb?code=code123&state=state+456");
    }

    #[test]
    fn test_redirect_url_keeps_existing_query() {
        let response = AuthorizationResponse {
            code: "abc".to_string(),
            state: None,
            redirect_uri: "https://app.example/cb?tenant=7".to_string(),
        };
        assert_eq!(
            response.to_redirect_url().unwrap(),
            "https://app.example/cb?tenant=7&code=abc"
        );
    }

    #[test]
    fn test_error_redirect_url() {
        let error = AuthorizationError::redirect(
            AuthorizationErrorCode::InvalidScope,
            "Unknown scope",
            "https://app.example/cb",
            Some("s1".to_string()),
        );
        let url = error.to_redirect_url().unwrap();
        assert!(url.starts_with("https://app.example/cb?"));
        assert!(url.contains("error=invalid_scope"));
        assert!(url.contains("error_description=Unknown+scope"));
        assert!(url.contains("state=s1"));
    }

    #[test]
    fn test_direct_error_has_no_redirect() {
        let error =
            AuthorizationError::direct(AuthorizationErrorCode::InvalidClient, "Unknown client");
        assert!(!error.is_redirectable());
        assert!(error.to_redirect_url().is_none());
        assert_eq!(error.to_string(), "invalid_client: Unknown client");
    }

    #[test]
    fn test_error_code_from_auth_error() {
        assert_eq!(
            AuthorizationErrorCode::from(&AuthError::storage("down")),
            AuthorizationErrorCode::ServerError
        );
        assert_eq!(
            AuthorizationErrorCode::from(&AuthError::invalid_scope("x")),
            AuthorizationErrorCode::InvalidScope
        );
        assert_eq!(
            AuthorizationErrorCode::from(&AuthError::invalid_grant("x")),
            AuthorizationErrorCode::InvalidRequest
        );
    }

    #[test]
    fn test_error_serialize_omits_transport_fields() {
        let error = AuthorizationError::redirect(
            AuthorizationErrorCode::AccessDenied,
            "No resource owner",
            "https://app.example/cb",
            None,
        );
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": "access_denied", "error_description": "No resource owner"})
        );
    }
}
