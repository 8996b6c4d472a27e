//! OpenID Connect UserInfo.
//!
//! The claims returned depend on the scopes granted to the access token
//! (OpenID Connect Core 1.0 §5.4):
//!
//! - `openid` (required): enables the endpoint, always yields `sub`
//! - `profile`: name, given_name, family_name, birthdate, etc.
//! - `email`: email and email_verified
//! - `address`: address
//! - `phone`: phone_number and phone_number_verified
//!
//! # References
//!
//! - [OpenID Connect UserInfo](https://openid.net/specs/openid-connect-core-1_0.html#UserInfo)

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::storage::{TokenStorage, UserInfoStorage, with_timeout};
use crate::token::jwt::JwtService;
use crate::token::revocation::TokenTypeHint;
use crate::types::{Scope, TokenRecord, UserInfo, hash_token};

/// Reduces a resource owner's claims to those licensed by `scope`.
///
/// `sub` is always kept. Claims of scopes that were not granted are dropped
/// even when the identity store has them.
#[must_use]
pub fn filter_claims(user: UserInfo, scope: &Scope) -> UserInfo {
    let mut claims = UserInfo {
        sub: user.sub,
        ..Default::default()
    };

    if scope.contains("profile") {
        claims.name = user.name;
        claims.given_name = user.given_name;
        claims.family_name = user.family_name;
        claims.middle_name = user.middle_name;
        claims.nickname = user.nickname;
        claims.preferred_username = user.preferred_username;
        claims.profile = user.profile;
        claims.picture = user.picture;
        claims.website = user.website;
        claims.gender = user.gender;
        claims.birthdate = user.birthdate;
        claims.zoneinfo = user.zoneinfo;
        claims.locale = user.locale;
        claims.updated_at = user.updated_at;
    }

    if scope.contains("email") {
        claims.email = user.email;
        claims.email_verified = user.email_verified;
    }

    if scope.contains("address") {
        claims.address = user.address;
    }

    if scope.contains("phone") {
        claims.phone_number = user.phone_number;
        claims.phone_number_verified = user.phone_number_verified;
    }

    claims
}

/// Resolves a bearer access token into the claims it may read.
pub struct UserInfoService {
    jwt: Arc<JwtService>,
    tokens: Arc<dyn TokenStorage>,
    users: Arc<dyn UserInfoStorage>,
    storage_timeout: Duration,
}

impl UserInfoService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        jwt: Arc<JwtService>,
        tokens: Arc<dyn TokenStorage>,
        users: Arc<dyn UserInfoStorage>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            jwt,
            tokens,
            users,
            storage_timeout: config.oauth.storage_timeout,
        }
    }

    /// Returns the claims the bearer token licenses.
    ///
    /// # Errors
    ///
    /// - `invalid_token` if the token fails JWT validation, is unknown to the
    ///   store, revoked or expired
    /// - `insufficient_scope` if the token lacks `openid` or has no resource
    ///   owner
    /// - storage errors
    pub async fn userinfo(&self, bearer: &str) -> AuthResult<UserInfo> {
        // 1. Verify signature, issuer and expiry
        let claims = self.jwt.decode(bearer)?;

        // 2. The stored record must still be active
        let record = with_timeout(
            self.storage_timeout,
            "load_token_info",
            self.tokens
                .load_token_info(&hash_token(bearer), Some(TokenTypeHint::AccessToken)),
        )
        .await?;
        let token = match record {
            Some(TokenRecord::Access(token))
                if token.is_active(OffsetDateTime::now_utc())
                    && token.id.to_string() == claims.jti =>
            {
                token
            }
            _ => return Err(AuthError::invalid_token("Access token is not active")),
        };

        // 3. Require openid and a resource owner
        if !token.scope.contains("openid") {
            return Err(AuthError::insufficient_scope(
                "The openid scope is required for the userinfo endpoint",
            ));
        }
        let subject = token.subject.as_deref().ok_or_else(|| {
            AuthError::insufficient_scope("The userinfo endpoint requires a user-delegated token")
        })?;

        // 4. Load and filter claims
        let user = with_timeout(
            self.storage_timeout,
            "load_user_info",
            self.users.load_user_info(subject),
        )
        .await?
        .ok_or_else(|| AuthError::invalid_token("Resource owner no longer exists"))?;

        tracing::debug!(client_id = %token.client_id, scope = %token.scope, "UserInfo served");
        Ok(filter_claims(user, &token.scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::test_support::*;
    use crate::storage::RevocationScope;
    use crate::types::Address;

    fn reader() -> UserInfo {
        UserInfo {
            sub: "reader-42".to_string(),
            name: Some("Ada Reader".to_string()),
            birthdate: Some("1990-01-01".to_string()),
            email: Some("ada@example.org".to_string()),
            email_verified: Some(true),
            phone_number: Some("+1 555 0100".to_string()),
            address: Some(Address {
                locality: Some("Springfield".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    struct Fixture {
        storage: Arc<MockStorage>,
        issuer: Arc<crate::token::issuer::TokenIssuer>,
        service: UserInfoService,
    }

    fn fixture() -> Fixture {
        let config = config();
        let (storage, _, issuer) = setup(&config);
        storage
            .users
            .write()
            .unwrap()
            .insert("reader-42".to_string(), reader());
        let service = UserInfoService::new(
            issuer.jwt_service().clone(),
            storage.clone(),
            storage.clone(),
            &config,
        );
        Fixture {
            storage,
            issuer,
            service,
        }
    }

    async fn token(f: &Fixture, subject: Option<&str>, scope: &str) -> String {
        f.issuer
            .issue(&public_client(), subject, &Scope::parse(scope), false)
            .await
            .unwrap()
            .access_token
    }

    #[test]
    fn test_filter_claims_by_scope() {
        let claims = filter_claims(reader(), &Scope::parse("openid email"));
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "sub": "reader-42",
                "email": "ada@example.org",
                "email_verified": true
            })
        );

        let claims = filter_claims(reader(), &Scope::parse("openid profile address phone"));
        assert_eq!(claims.name.as_deref(), Some("Ada Reader"));
        assert_eq!(claims.birthdate.as_deref(), Some("1990-01-01"));
        assert!(claims.address.is_some());
        assert!(claims.phone_number.is_some());
        assert!(claims.email.is_none());
    }

    #[tokio::test]
    async fn test_email_scope_returns_only_sub_and_email() {
        let f = fixture();
        let bearer = token(&f, Some("reader-42"), "openid email").await;
        let claims = f.service.userinfo(&bearer).await.unwrap();
        assert_eq!(claims.sub, "reader-42");
        assert_eq!(claims.email.as_deref(), Some("ada@example.org"));
        assert!(claims.name.is_none());
        assert!(claims.birthdate.is_none());
    }

    #[tokio::test]
    async fn test_revoked_token_is_invalid() {
        let f = fixture();
        let bearer = token(&f, Some("reader-42"), "openid email").await;
        f.storage
            .revoke(
                RevocationScope::Token {
                    token_hash: hash_token(&bearer),
                },
                OffsetDateTime::now_utc(),
            )
            .await
            .unwrap();
        let result = f.service.userinfo(&bearer).await;
        assert!(matches!(result, Err(AuthError::InvalidToken { .. })));
    }

    #[tokio::test]
    async fn test_garbage_token_is_invalid() {
        let f = fixture();
        let result = f.service.userinfo("not.a.jwt").await;
        assert!(matches!(result, Err(AuthError::InvalidToken { .. })));
    }

    #[tokio::test]
    async fn test_missing_openid_is_insufficient_scope() {
        let f = fixture();
        let bearer = token(&f, Some("reader-42"), "email").await;
        let result = f.service.userinfo(&bearer).await;
        assert!(matches!(result, Err(AuthError::InsufficientScope { .. })));
    }

    #[tokio::test]
    async fn test_client_token_is_insufficient_scope() {
        let f = fixture();
        let bearer = token(&f, None, "openid").await;
        let result = f.service.userinfo(&bearer).await;
        assert!(matches!(result, Err(AuthError::InsufficientScope { .. })));
    }
}
