//! Refresh token grant (RFC 6749 §6) with rotation and replay detection.
//!
//! With rotation enabled every use revokes the presented token and issues a
//! successor in the same family. A token presented after it was rotated away
//! is a replay: the whole family is revoked, including every access token
//! minted from it.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::grant::GrantHandler;
use crate::oauth::client_auth::AuthenticatedClient;
use crate::oauth::token::TokenRequest;
use crate::storage::{RevocationScope, TokenStorage, with_timeout};
use crate::token::issuer::{IssuedTokens, TokenIssuer};
use crate::token::revocation::TokenTypeHint;
use crate::types::{GrantType, RefreshToken, Scope, TokenRecord, hash_token};

/// Exchanges a refresh token for a new access token.
pub struct RefreshTokenGrant {
    tokens: Arc<dyn TokenStorage>,
    issuer: Arc<TokenIssuer>,
    rotation: bool,
    storage_timeout: std::time::Duration,
}

impl RefreshTokenGrant {
    /// Creates the handler.
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenStorage>, issuer: Arc<TokenIssuer>, config: &AuthConfig) -> Self {
        Self {
            tokens,
            issuer,
            rotation: config.oauth.refresh_token_rotation,
            storage_timeout: config.oauth.storage_timeout,
        }
    }

    async fn load(&self, value: &str) -> AuthResult<Option<RefreshToken>> {
        let record = with_timeout(
            self.storage_timeout,
            "load_token_info",
            self.tokens
                .load_token_info(&hash_token(value), Some(TokenTypeHint::RefreshToken)),
        )
        .await?;
        Ok(match record {
            Some(TokenRecord::Refresh(token)) => Some(token),
            _ => None,
        })
    }
}

/// The refreshed scope is the original one or a requested subset of it.
fn refreshed_scope(requested: Option<&str>, original: &Scope) -> AuthResult<Scope> {
    match requested.map(Scope::parse) {
        Some(scope) if !scope.is_empty() => {
            if scope.is_subset_of(original) {
                Ok(scope)
            } else {
                Err(AuthError::invalid_scope(
                    "Requested scope exceeds the scope of the original grant",
                ))
            }
        }
        _ => Ok(original.clone()),
    }
}

#[async_trait]
impl GrantHandler for RefreshTokenGrant {
    fn grant_type(&self) -> GrantType {
        GrantType::RefreshToken
    }

    async fn handle(
        &self,
        request: &TokenRequest,
        client: &AuthenticatedClient,
    ) -> AuthResult<IssuedTokens> {
        let client = &client.client;

        // 1. Get refresh token from request
        let value = request.refresh_token.as_deref().ok_or_else(|| {
            AuthError::invalid_request("Missing required parameter: refresh_token")
        })?;

        // 2. Lookup by hash
        let now = OffsetDateTime::now_utc();
        let presented = self
            .load(value)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Refresh token is invalid"))?;

        // 3. Must belong to the authenticated client
        if presented.client_id != client.client_id {
            tracing::warn!(
                client_id = %client.client_id,
                "Refresh token presented by a different client"
            );
            return Err(AuthError::invalid_grant("Refresh token was issued to another client"));
        }

        // 4. A revoked token under rotation is a replay
        if presented.is_revoked() {
            if self.rotation {
                with_timeout(
                    self.storage_timeout,
                    "revoke_family",
                    self.tokens.revoke(
                        RevocationScope::Family {
                            family_id: presented.family_id,
                        },
                        now,
                    ),
                )
                .await?;
                tracing::warn!(
                    client_id = %client.client_id,
                    family_id = %presented.family_id,
                    "Refresh token replay detected, token family revoked"
                );
            }
            return Err(AuthError::invalid_grant("Refresh token has been revoked"));
        }

        if presented.is_expired(now) {
            return Err(AuthError::invalid_grant("Refresh token has expired"));
        }

        // 5. Narrow scope, never widen
        let scope = refreshed_scope(request.scope.as_deref(), &presented.scope)?;

        // 6. Rotate or mint an access token alone
        if self.rotation {
            self.issuer
                .issue_rotated(&presented, client, &scope, now)
                .await
        } else {
            self.issuer
                .issue_access_only(&presented, client, &scope)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::test_support::*;
    use crate::oauth::client_auth::ClientCredentials;

    fn request(token: &str, scope: Option<&str>) -> TokenRequest {
        TokenRequest {
            grant_type: Some("refresh_token".to_string()),
            refresh_token: Some(token.to_string()),
            client_id: Some("c1".to_string()),
            scope: scope.map(str::to_string),
            ..Default::default()
        }
    }

    struct Fixture {
        storage: Arc<MockStorage>,
        grant: RefreshTokenGrant,
        client: AuthenticatedClient,
        initial: IssuedTokens,
    }

    async fn fixture(config: &AuthConfig) -> Fixture {
        let (storage, registry, issuer) = setup(config);
        let client = registry
            .authenticate_client(&ClientCredentials::Public {
                client_id: "c1".to_string(),
            })
            .await
            .unwrap();
        let initial = issuer
            .issue(
                &client.client,
                Some("reader-42"),
                &Scope::parse("openid email"),
                true,
            )
            .await
            .unwrap();
        let grant = RefreshTokenGrant::new(storage.clone(), issuer, config);
        Fixture {
            storage,
            grant,
            client,
            initial,
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

    #[tokio::test]
    async fn test_refresh_rotates() {
        let f = fixture(&config()).await;
        let old = f.initial.refresh_token.clone().unwrap();

        let issued = f.grant.handle(&request(&old, None), &f.client).await.unwrap();
        let new = issued.refresh_token.clone().unwrap();
        assert_ne!(new, old);
        assert_eq!(issued.scope.to_string(), "openid email");
        assert!(!is_active(&f.storage, &old));
        assert!(is_active(&f.storage, &new));
    }

    #[tokio::test]
    async fn test_replay_revokes_family() {
        let f = fixture(&config()).await;
        let old = f.initial.refresh_token.clone().unwrap();

        let issued = f.grant.handle(&request(&old, None), &f.client).await.unwrap();

        let replay = f.grant.handle(&request(&old, None), &f.client).await;
        assert!(matches!(replay, Err(AuthError::InvalidGrant { .. })));

        // Every token of the family is now inactive
        assert!(!is_active(&f.storage, &f.initial.access_token));
        assert!(!is_active(&f.storage, &issued.access_token));
        assert!(!is_active(&f.storage, issued.refresh_token.as_ref().unwrap()));
    }

    #[tokio::test]
    async fn test_scope_narrowing_and_widening() {
        let f = fixture(&config()).await;
        let rt = f.initial.refresh_token.clone().unwrap();

        let widened = f.grant.handle(&request(&rt, Some("openid profile")), &f.client).await;
        assert!(matches!(widened, Err(AuthError::InvalidScope { .. })));

        let narrowed = f.grant.handle(&request(&rt, Some("email")), &f.client).await.unwrap();
        assert_eq!(narrowed.scope.to_string(), "email");
    }

    #[tokio::test]
    async fn test_narrowed_refresh_keeps_original_grant_scope() {
        let f = fixture(&config()).await;
        let rt = f.initial.refresh_token.clone().unwrap();

        let narrowed = f.grant.handle(&request(&rt, Some("email")), &f.client).await.unwrap();
        assert_eq!(narrowed.scope.to_string(), "email");
        let successor = narrowed.refresh_token.clone().unwrap();
        match &f.storage.tokens.read().unwrap()[&hash_token(&successor)] {
            TokenRecord::Refresh(record) => assert_eq!(record.scope.to_string(), "openid email"),
            other => panic!("expected a refresh token, got {other:?}"),
        }

        let restored = f
            .grant
            .handle(&request(&successor, Some("openid email")), &f.client)
            .await
            .unwrap();
        assert_eq!(restored.scope.to_string(), "openid email");
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let f = fixture(&config()).await;
        let result = f.grant.handle(&request("not-a-token", None), &f.client).await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let f = fixture(&config()).await;
        let result = f
            .grant
            .handle(&request(&f.initial.access_token, None), &f.client)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let f = fixture(&config()).await;
        let rt = f.initial.refresh_token.clone().unwrap();
        if let Some(TokenRecord::Refresh(t)) =
            f.storage.tokens.write().unwrap().get_mut(&hash_token(&rt))
        {
            t.expires_at = OffsetDateTime::now_utc() - time::Duration::seconds(1);
        }
        let result = f.grant.handle(&request(&rt, None), &f.client).await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_other_client_rejected() {
        let f = fixture(&config()).await;
        let rt = f.initial.refresh_token.clone().unwrap();
        let mut other = f.client.clone();
        other.client.client_id = "c2".to_string();
        let result = f.grant.handle(&request(&rt, None), &other).await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
        assert!(is_active(&f.storage, &rt));
    }

    #[tokio::test]
    async fn test_without_rotation_token_stays_valid() {
        let mut config = config();
        config.oauth.refresh_token_rotation = false;
        let f = fixture(&config).await;
        let rt = f.initial.refresh_token.clone().unwrap();

        let first = f.grant.handle(&request(&rt, None), &f.client).await.unwrap();
        assert!(first.refresh_token.is_none());
        let second = f.grant.handle(&request(&rt, None), &f.client).await.unwrap();
        assert_ne!(first.access_token, second.access_token);
        assert!(is_active(&f.storage, &rt));
    }
}
