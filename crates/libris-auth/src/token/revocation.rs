//! Token revocation (RFC 7009)
//!
//! The endpoint always answers success once the request is well formed:
//! revoking an unknown token, an already revoked token, or a token issued to
//! another client changes nothing and is not reported as an error.
//!
//! Revoking a refresh token cascades to its whole family when
//! `oauth.revoke_family_on_refresh_revocation` is set, which also invalidates
//! every access token minted from that lineage.
//!
//! # References
//!
//! - [RFC 7009 - OAuth 2.0 Token Revocation](https://tools.ietf.org/html/rfc7009)

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::storage::{RevocationScope, TokenStorage, with_timeout};
use crate::types::{Client, TokenRecord, hash_token};

// =============================================================================
// Request Types
// =============================================================================

/// Token revocation request per RFC 7009.
///
/// Client credentials travel in the same form body and are extracted
/// separately by the HTTP layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevocationRequest {
    /// The token to revoke. Required.
    pub token: Option<String>,

    /// Optional hint about the token type.
    ///
    /// Unrecognized values are ignored rather than rejected.
    #[serde(default)]
    pub token_type_hint: Option<String>,

    /// Client identifier, for public clients and `client_secret_post`.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret for `client_secret_post`.
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl RevocationRequest {
    /// The parsed hint, if it names a known token type.
    #[must_use]
    pub fn hint(&self) -> Option<TokenTypeHint> {
        self.token_type_hint.as_deref().and_then(TokenTypeHint::parse)
    }
}

/// Token type hint shared by revocation and introspection requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTypeHint {
    /// The token is an access token.
    AccessToken,
    /// The token is a refresh token.
    RefreshToken,
}

impl TokenTypeHint {
    /// Parses a hint value, returning `None` for unknown values.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "access_token" => Some(Self::AccessToken),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }

    /// Returns the token type hint as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl std::fmt::Display for TokenTypeHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Service
// =============================================================================

/// Revokes tokens on behalf of the client they were issued to.
pub struct RevocationService {
    tokens: Arc<dyn TokenStorage>,
    revoke_family: bool,
    storage_timeout: Duration,
}

impl RevocationService {
    /// Creates the service.
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenStorage>, config: &AuthConfig) -> Self {
        Self {
            tokens,
            revoke_family: config.oauth.revoke_family_on_refresh_revocation,
            storage_timeout: config.oauth.storage_timeout,
        }
    }

    /// Revokes the token named by the request.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` if `token` is missing, or a storage error.
    /// Every other outcome is `Ok(())`.
    pub async fn revoke(&self, request: &RevocationRequest, client: &Client) -> AuthResult<()> {
        let value = request
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::invalid_request("Missing required parameter: token"))?;

        let token_hash = hash_token(value);
        let record = with_timeout(
            self.storage_timeout,
            "load_token_info",
            self.tokens.load_token_info(&token_hash, request.hint()),
        )
        .await?;

        let Some(record) = record else {
            tracing::debug!(client_id = %client.client_id, "Revocation of unknown token ignored");
            return Ok(());
        };

        if record.client_id() != client.client_id {
            tracing::warn!(
                client_id = %client.client_id,
                "Revocation of a token issued to another client ignored"
            );
            return Ok(());
        }

        let scope = match &record {
            TokenRecord::Refresh(token) if self.revoke_family => RevocationScope::Family {
                family_id: token.family_id,
            },
            _ => RevocationScope::Token { token_hash },
        };
        let cascades = matches!(scope, RevocationScope::Family { .. });

        let revoked = with_timeout(
            self.storage_timeout,
            "revoke",
            self.tokens.revoke(scope, OffsetDateTime::now_utc()),
        )
        .await?;

        tracing::info!(
            client_id = %client.client_id,
            family = cascades,
            revoked,
            "Token revoked"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::test_support::*;
    use crate::types::Scope;

    fn request(token: &str, hint: Option<&str>) -> RevocationRequest {
        RevocationRequest {
            token: Some(token.to_string()),
            token_type_hint: hint.map(str::to_string),
            ..Default::default()
        }
    }

    fn is_active(storage: &MockStorage, value: &str) -> bool {
        storage
            .tokens
            .read()
            .unwrap()
            .get(&hash_token(value))
            .is_some_and(|r| r.is_active(OffsetDateTime::now_utc()))
    }

    #[test]
    fn test_token_type_hint() {
        assert_eq!(TokenTypeHint::parse("access_token"), Some(TokenTypeHint::AccessToken));
        assert_eq!(TokenTypeHint::parse("refresh_token"), Some(TokenTypeHint::RefreshToken));
        assert_eq!(TokenTypeHint::parse("id_token"), None);
        assert_eq!(TokenTypeHint::RefreshToken.to_string(), "refresh_token");
    }

    #[tokio::test]
    async fn test_refresh_revocation_cascades_to_family() {
        let config = config();
        let (storage, _, issuer) = setup(&config);
        let client = public_client();
        let issued = issuer
            .issue(&client, Some("reader-42"), &Scope::parse("openid"), true)
            .await
            .unwrap();
        let service = RevocationService::new(storage.clone(), &config);

        let rt = issued.refresh_token.unwrap();
        service
            .revoke(&request(&rt, Some("refresh_token")), &client)
            .await
            .unwrap();

        assert!(!is_active(&storage, &rt));
        assert!(!is_active(&storage, &issued.access_token));
    }

    #[tokio::test]
    async fn test_refresh_revocation_without_cascade() {
        let mut config = config();
        config.oauth.revoke_family_on_refresh_revocation = false;
        let (storage, _, issuer) = setup(&config);
        let client = public_client();
        let issued = issuer
            .issue(&client, Some("reader-42"), &Scope::parse("openid"), true)
            .await
            .unwrap();
        let service = RevocationService::new(storage.clone(), &config);

        let rt = issued.refresh_token.unwrap();
        service.revoke(&request(&rt, None), &client).await.unwrap();

        assert!(!is_active(&storage, &rt));
        assert!(is_active(&storage, &issued.access_token));
    }

    #[tokio::test]
    async fn test_access_token_revocation_is_single() {
        let config = config();
        let (storage, _, issuer) = setup(&config);
        let client = public_client();
        let issued = issuer
            .issue(&client, Some("reader-42"), &Scope::parse("openid"), true)
            .await
            .unwrap();
        let service = RevocationService::new(storage.clone(), &config);

        service
            .revoke(&request(&issued.access_token, Some("access_token")), &client)
            .await
            .unwrap();

        assert!(!is_active(&storage, &issued.access_token));
        assert!(is_active(&storage, issued.refresh_token.as_ref().unwrap()));
    }

    #[tokio::test]
    async fn test_unknown_and_foreign_tokens_are_ignored() {
        let config = config();
        let (storage, _, issuer) = setup(&config);
        let owner = public_client();
        let issued = issuer
            .issue(&owner, Some("reader-42"), &Scope::parse("openid"), false)
            .await
            .unwrap();
        let service = RevocationService::new(storage.clone(), &config);

        assert!(service.revoke(&request("never-issued", None), &owner).await.is_ok());

        let mut stranger = owner.clone();
        stranger.client_id = "c2".to_string();
        assert!(
            service
                .revoke(&request(&issued.access_token, None), &stranger)
                .await
                .is_ok()
        );
        assert!(is_active(&storage, &issued.access_token));
    }

    #[tokio::test]
    async fn test_missing_token_is_invalid_request() {
        let config = config();
        let (storage, _, _) = setup(&config);
        let service = RevocationService::new(storage, &config);
        let result = service
            .revoke(&RevocationRequest::default(), &public_client())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidRequest { .. })));
    }

    #[tokio::test]
    async fn test_revocation_is_idempotent() {
        let config = config();
        let (storage, _, issuer) = setup(&config);
        let client = public_client();
        let issued = issuer
            .issue(&client, Some("reader-42"), &Scope::parse("openid"), false)
            .await
            .unwrap();
        let service = RevocationService::new(storage.clone(), &config);

        let req = request(&issued.access_token, None);
        service.revoke(&req, &client).await.unwrap();
        service.revoke(&req, &client).await.unwrap();
        assert!(!is_active(&storage, &issued.access_token));
    }
}
