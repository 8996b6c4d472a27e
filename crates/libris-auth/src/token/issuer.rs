//! Token Issuer.
//!
//! Mints access and refresh tokens and records them through the Persistence
//! Port. A token value is only handed back once its record is durably
//! written. For the flows that consume something (a code, a refresh token)
//! the consume and the write are one port call.
//!
//! # Usage
//!
//! ```ignore
//! let issuer = TokenIssuer::new(jwt, tokens, codes, &config);
//! let issued = issuer.issue(&client, None, &scope, false).await?;
//! let response = issued.into_response();
//! ```

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::service::to_time_duration;
use crate::oauth::token::TokenResponse;
use crate::storage::{CodeStorage, RotationOutcome, TokenStorage, with_timeout};
use crate::token::jwt::{AccessTokenClaims, JwtService};
use crate::types::{
    AccessToken, AuthorizationCode, Client, GrantRecords, RefreshToken, Scope, hash_token,
};

/// Token values returned to the client.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    /// Signed access token.
    pub access_token: String,
    /// Refresh token value, if one was issued.
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Granted scope.
    pub scope: Scope,
}

impl IssuedTokens {
    /// Converts into the token endpoint response body.
    #[must_use]
    pub fn into_response(self) -> TokenResponse {
        TokenResponse::new(self.access_token, self.expires_in, self.scope.to_string())
            .with_refresh_token(self.refresh_token)
    }
}

/// Whether and how a refresh token accompanies the access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshIssue {
    /// Access token only, outside any family.
    None,
    /// Start a new family with a fresh refresh token.
    NewFamily,
    /// Continue an existing family with a new refresh token.
    Rotate {
        /// The family being continued.
        family_id: Uuid,
        /// The family's absolute expiry.
        expires_at: OffsetDateTime,
        /// The scope of the original grant, carried by every refresh token
        /// of the family.
        grant_scope: Scope,
    },
    /// Access token only, attributed to an existing family.
    AccessOnly {
        /// The family the access token belongs to.
        family_id: Uuid,
    },
}

/// Values and records of a grant that has not been persisted yet.
struct MintedGrant {
    tokens: IssuedTokens,
    records: GrantRecords,
}

/// Service that mints and persists tokens.
pub struct TokenIssuer {
    jwt: Arc<JwtService>,
    tokens: Arc<dyn TokenStorage>,
    codes: Arc<dyn CodeStorage>,
    access_token_lifetime: Duration,
    refresh_token_lifetime: Duration,
    storage_timeout: std::time::Duration,
}

impl TokenIssuer {
    /// Creates a new issuer.
    #[must_use]
    pub fn new(
        jwt: Arc<JwtService>,
        tokens: Arc<dyn TokenStorage>,
        codes: Arc<dyn CodeStorage>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            jwt,
            tokens,
            codes,
            access_token_lifetime: to_time_duration(config.oauth.access_token_lifetime),
            refresh_token_lifetime: to_time_duration(config.oauth.refresh_token_lifetime),
            storage_timeout: config.oauth.storage_timeout,
        }
    }

    /// Issues tokens and records them.
    ///
    /// # Arguments
    ///
    /// * `client` - The client the tokens are issued to
    /// * `subject` - The resource owner, `None` for client credentials
    /// * `scope` - The granted scope
    /// * `with_refresh` - Start a refresh token family
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the grant could not be recorded. No
    /// token value is returned in that case.
    pub async fn issue(
        &self,
        client: &Client,
        subject: Option<&str>,
        scope: &Scope,
        with_refresh: bool,
    ) -> AuthResult<IssuedTokens> {
        let refresh = if with_refresh {
            RefreshIssue::NewFamily
        } else {
            RefreshIssue::None
        };
        let minted = self.mint(client, subject, scope, refresh, OffsetDateTime::now_utc())?;

        with_timeout(
            self.storage_timeout,
            "store_grant",
            self.tokens.store_grant(&minted.records),
        )
        .await?;

        self.log_issued(client, &minted);
        Ok(minted.tokens)
    }

    /// Issues tokens for an authorization code, consuming it in the same step.
    ///
    /// # Errors
    ///
    /// Returns `invalid_grant` if the code was consumed or expired between
    /// lookup and redemption.
    pub async fn issue_for_code(
        &self,
        code: &AuthorizationCode,
        client: &Client,
        with_refresh: bool,
        now: OffsetDateTime,
    ) -> AuthResult<IssuedTokens> {
        let refresh = if with_refresh {
            RefreshIssue::NewFamily
        } else {
            RefreshIssue::None
        };
        let minted = self.mint(client, Some(&code.subject), &code.scope, refresh, now)?;

        let redeemed = with_timeout(
            self.storage_timeout,
            "redeem_code",
            self.codes.redeem(&code.code, now, &minted.records),
        )
        .await?;

        if !redeemed {
            tracing::warn!(
                client_id = %client.client_id,
                "Authorization code redemption lost to a concurrent or expired use"
            );
            return Err(AuthError::invalid_grant(
                "Authorization code is invalid, expired, or already used",
            ));
        }

        self.log_issued(client, &minted);
        Ok(minted.tokens)
    }

    /// Rotates a refresh token into a new one of the same family.
    ///
    /// `scope` applies to the access token only. The successor keeps the
    /// scope of the presented token.
    ///
    /// # Errors
    ///
    /// Returns `invalid_grant` if the presented token is no longer current.
    /// When it was already rotated away the family is revoked by the port.
    pub async fn issue_rotated(
        &self,
        presented: &RefreshToken,
        client: &Client,
        scope: &Scope,
        now: OffsetDateTime,
    ) -> AuthResult<IssuedTokens> {
        let refresh = RefreshIssue::Rotate {
            family_id: presented.family_id,
            expires_at: presented.expires_at,
            grant_scope: presented.scope.clone(),
        };
        let minted = self.mint(client, presented.subject.as_deref(), scope, refresh, now)?;

        let outcome = with_timeout(
            self.storage_timeout,
            "rotate_refresh_token",
            self.tokens
                .rotate_refresh_token(&presented.token_hash, now, &minted.records),
        )
        .await?;

        match outcome {
            RotationOutcome::Rotated => {
                self.log_issued(client, &minted);
                Ok(minted.tokens)
            }
            RotationOutcome::Replayed { family_id } => {
                tracing::warn!(
                    client_id = %client.client_id,
                    family_id = %family_id,
                    "Refresh token replay detected, token family revoked"
                );
                Err(AuthError::invalid_grant("Refresh token has been revoked"))
            }
            RotationOutcome::Rejected => {
                Err(AuthError::invalid_grant("Refresh token is invalid or expired"))
            }
        }
    }

    /// Mints a new access token into the family of a refresh token that
    /// stays valid.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the access token could not be recorded.
    pub async fn issue_access_only(
        &self,
        presented: &RefreshToken,
        client: &Client,
        scope: &Scope,
    ) -> AuthResult<IssuedTokens> {
        let refresh = RefreshIssue::AccessOnly {
            family_id: presented.family_id,
        };
        let minted = self.mint(
            client,
            presented.subject.as_deref(),
            scope,
            refresh,
            OffsetDateTime::now_utc(),
        )?;

        with_timeout(
            self.storage_timeout,
            "store_grant",
            self.tokens.store_grant(&minted.records),
        )
        .await?;

        self.log_issued(client, &minted);
        Ok(minted.tokens)
    }

    /// Returns the JWT service used for signing.
    #[must_use]
    pub fn jwt_service(&self) -> &Arc<JwtService> {
        &self.jwt
    }

    fn mint(
        &self,
        client: &Client,
        subject: Option<&str>,
        scope: &Scope,
        refresh: RefreshIssue,
        now: OffsetDateTime,
    ) -> AuthResult<MintedGrant> {
        let lifetime = client
            .access_token_lifetime()
            .unwrap_or(self.access_token_lifetime);
        let access_expires_at = expiry(now, lifetime, "access token")?;
        let jti = Uuid::new_v4();

        // 1. Refresh token, if any
        let (family_id, refresh_token) = match refresh {
            RefreshIssue::None => (None, None),
            RefreshIssue::AccessOnly { family_id } => (Some(family_id), None),
            RefreshIssue::NewFamily => {
                let family_id = Uuid::new_v4();
                let expires_at = expiry(now, self.refresh_token_lifetime, "refresh token")?;
                (
                    Some(family_id),
                    Some(new_refresh_token(client, subject, scope, family_id, now, expires_at)),
                )
            }
            RefreshIssue::Rotate {
                family_id,
                expires_at,
                grant_scope,
            } => (
                Some(family_id),
                Some(new_refresh_token(
                    client,
                    subject,
                    &grant_scope,
                    family_id,
                    now,
                    expires_at,
                )),
            ),
        };

        // 2. Signed access token
        let claims = AccessTokenClaims {
            iss: self.jwt.issuer().to_string(),
            sub: subject.unwrap_or(&client.client_id).to_string(),
            aud: self.jwt.audience().map(str::to_string),
            exp: access_expires_at.unix_timestamp(),
            iat: now.unix_timestamp(),
            jti: jti.to_string(),
            scope: scope.to_string(),
            client_id: client.client_id.clone(),
        };
        let access_value = self.jwt.encode(&claims)?;

        let access_record = AccessToken {
            id: jti,
            token_hash: hash_token(&access_value),
            client_id: client.client_id.clone(),
            subject: subject.map(str::to_string),
            scope: scope.clone(),
            family_id,
            issued_at: now,
            expires_at: access_expires_at,
            revoked_at: None,
        };

        let (refresh_value, refresh_record) = match refresh_token {
            Some((value, record)) => (Some(value), Some(record)),
            None => (None, None),
        };

        Ok(MintedGrant {
            tokens: IssuedTokens {
                access_token: access_value,
                refresh_token: refresh_value,
                expires_in: u64::try_from(lifetime.whole_seconds()).unwrap_or(0),
                scope: scope.clone(),
            },
            records: GrantRecords {
                access_token: access_record,
                refresh_token: refresh_record,
            },
        })
    }

    fn log_issued(&self, client: &Client, minted: &MintedGrant) {
        let record = &minted.records.access_token;
        tracing::info!(
            client_id = %client.client_id,
            jti = %record.id,
            scope = %record.scope,
            refresh = minted.records.refresh_token.is_some(),
            "Tokens issued"
        );
    }
}

fn expiry(now: OffsetDateTime, lifetime: Duration, what: &str) -> AuthResult<OffsetDateTime> {
    now.checked_add(lifetime)
        .ok_or_else(|| AuthError::internal(format!("{what} lifetime overflows")))
}

fn new_refresh_token(
    client: &Client,
    subject: Option<&str>,
    scope: &Scope,
    family_id: Uuid,
    now: OffsetDateTime,
    expires_at: OffsetDateTime,
) -> (String, RefreshToken) {
    let value = RefreshToken::generate_token();
    let record = RefreshToken {
        id: Uuid::new_v4(),
        token_hash: hash_token(&value),
        family_id,
        client_id: client.client_id.clone(),
        subject: subject.map(str::to_string),
        scope: scope.clone(),
        issued_at: now,
        expires_at,
        revoked_at: None,
    };
    (value, record)
}
