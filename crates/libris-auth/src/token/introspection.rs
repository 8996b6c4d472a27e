//! Token introspection (RFC 7662)
//!
//! Unknown, expired and revoked tokens all produce the same
//! `{"active":false}` body, so a caller learns nothing about why a token is
//! not usable.
//!
//! # References
//!
//! - [RFC 7662 - OAuth 2.0 Token Introspection](https://tools.ietf.org/html/rfc7662)

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::client_auth::AuthenticatedClient;
use crate::storage::{TokenStorage, with_timeout};
use crate::token::revocation::TokenTypeHint;
use crate::types::{TokenRecord, hash_token};

// =============================================================================
// Request Types
// =============================================================================

/// Token introspection request per RFC 7662.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntrospectionRequest {
    /// The token to introspect.
    pub token: Option<String>,

    /// Optional hint about the token type. Unknown values are ignored.
    #[serde(default)]
    pub token_type_hint: Option<String>,

    /// Client identifier for `client_secret_post`.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret for `client_secret_post`.
    #[serde(default)]
    pub client_secret: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// Token introspection response per RFC 7662.
///
/// Every field except `active` is omitted for an inactive token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionResponse {
    /// Whether the token is currently active.
    pub active: bool,

    /// Space-separated scopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Client the token was issued to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Token type, always `Bearer` when active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Expiration time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued at time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Subject: the resource owner, or the client for client credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Token identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl IntrospectionResponse {
    /// The response for any token that is not usable.
    #[must_use]
    pub fn inactive() -> Self {
        Self {
            active: false,
            scope: None,
            client_id: None,
            token_type: None,
            exp: None,
            iat: None,
            sub: None,
            iss: None,
            jti: None,
        }
    }

    /// Describes a stored token as seen at `now`.
    #[must_use]
    pub fn from_record(record: Option<&TokenRecord>, issuer: &str, now: OffsetDateTime) -> Self {
        let Some(record) = record.filter(|r| r.is_active(now)) else {
            return Self::inactive();
        };

        let (id, subject, scope, issued_at, expires_at) = match record {
            TokenRecord::Access(t) => (t.id, &t.subject, &t.scope, t.issued_at, t.expires_at),
            TokenRecord::Refresh(t) => (t.id, &t.subject, &t.scope, t.issued_at, t.expires_at),
        };
        let client_id = record.client_id().to_string();

        Self {
            active: true,
            scope: Some(scope.to_string()),
            sub: Some(subject.clone().unwrap_or_else(|| client_id.clone())),
            client_id: Some(client_id),
            token_type: Some("Bearer".to_string()),
            exp: Some(expires_at.unix_timestamp()),
            iat: Some(issued_at.unix_timestamp()),
            iss: Some(issuer.to_string()),
            jti: Some(id.to_string()),
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Answers introspection requests from authenticated confidential clients.
pub struct IntrospectionService {
    tokens: Arc<dyn TokenStorage>,
    issuer: String,
    storage_timeout: Duration,
}

impl IntrospectionService {
    /// Creates the service.
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenStorage>, config: &AuthConfig) -> Self {
        Self {
            tokens,
            issuer: config.issuer.clone(),
            storage_timeout: config.oauth.storage_timeout,
        }
    }

    /// Introspects the token named by the request.
    ///
    /// # Errors
    ///
    /// - `invalid_client` if the caller is not a secret-authenticated
    ///   confidential client
    /// - `invalid_request` if `token` is missing
    /// - storage errors
    pub async fn introspect(
        &self,
        request: &IntrospectionRequest,
        client: &AuthenticatedClient,
    ) -> AuthResult<IntrospectionResponse> {
        if !client.client.is_confidential() || !client.is_secret_authenticated() {
            return Err(AuthError::invalid_client(
                "Introspection requires confidential client authentication",
            ));
        }

        let value = request
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::invalid_request("Missing required parameter: token"))?;

        let hint = request.token_type_hint.as_deref().and_then(TokenTypeHint::parse);
        let record = with_timeout(
            self.storage_timeout,
            "load_token_info",
            self.tokens.load_token_info(&hash_token(value), hint),
        )
        .await?;

        let response =
            IntrospectionResponse::from_record(record.as_ref(), &self.issuer, OffsetDateTime::now_utc());
        tracing::debug!(
            client_id = %client.client.client_id,
            active = response.active,
            "Token introspected"
        );
        Ok(response)
    }
}
