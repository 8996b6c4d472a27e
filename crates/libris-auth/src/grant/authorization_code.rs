//! Authorization code grant (RFC 6749 §4.1.3, RFC 7636 §4.6).

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::config::{AuthConfig, PkceFailurePolicy};
use crate::error::AuthError;
use crate::grant::GrantHandler;
use crate::oauth::client_auth::AuthenticatedClient;
use crate::oauth::pkce::{PkceChallenge, PkcePolicy, PkceVerifier};
use crate::oauth::token::TokenRequest;
use crate::storage::{CodeStorage, with_timeout};
use crate::token::issuer::{IssuedTokens, TokenIssuer};
use crate::types::{AuthorizationCode, GrantType};

/// Exchanges an authorization code and its PKCE verifier for tokens.
pub struct AuthorizationCodeGrant {
    codes: Arc<dyn CodeStorage>,
    issuer: Arc<TokenIssuer>,
    pkce: PkcePolicy,
    failure_policy: PkceFailurePolicy,
    refresh_enabled: bool,
    storage_timeout: std::time::Duration,
}

impl AuthorizationCodeGrant {
    /// Creates the handler.
    #[must_use]
    pub fn new(codes: Arc<dyn CodeStorage>, issuer: Arc<TokenIssuer>, config: &AuthConfig) -> Self {
        Self {
            codes,
            issuer,
            pkce: PkcePolicy::from(&config.oauth),
            failure_policy: config.oauth.pkce_failure_policy,
            refresh_enabled: config
                .oauth
                .enabled_grant_types()
                .contains(&GrantType::RefreshToken),
            storage_timeout: config.oauth.storage_timeout,
        }
    }

    fn verify_pkce(&self, code: &AuthorizationCode, verifier: &str) -> AuthResult<()> {
        let verifier = PkceVerifier::new(verifier, &self.pkce)
            .map_err(|e| AuthError::invalid_grant(e.to_string()))?;
        PkceChallenge::from_stored(code.code_challenge.as_str())
            .verify(&verifier, code.code_challenge_method)
            .map_err(|e| AuthError::invalid_grant(e.to_string()))
    }
}

#[async_trait]
impl GrantHandler for AuthorizationCodeGrant {
    fn grant_type(&self) -> GrantType {
        GrantType::AuthorizationCode
    }

    async fn handle(
        &self,
        request: &TokenRequest,
        client: &AuthenticatedClient,
    ) -> AuthResult<IssuedTokens> {
        let client = &client.client;

        // 1. Extract required fields
        let code_value = request
            .code
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing required parameter: code"))?;
        let redirect_uri = request.redirect_uri.as_deref().ok_or_else(|| {
            AuthError::invalid_request("Missing required parameter: redirect_uri")
        })?;
        let code_verifier = request.code_verifier.as_deref().ok_or_else(|| {
            AuthError::invalid_request("Missing required parameter: code_verifier")
        })?;

        // 2. Look up the code
        let now = OffsetDateTime::now_utc();
        let code = with_timeout(
            self.storage_timeout,
            "find_by_code",
            self.codes.find_by_code(code_value),
        )
        .await?
        .ok_or_else(|| AuthError::invalid_grant("Authorization code is invalid"))?;

        if code.is_consumed() {
            tracing::warn!(client_id = %client.client_id, "Authorization code replay attempt");
            return Err(AuthError::invalid_grant("Authorization code has already been used"));
        }
        if code.is_expired(now) {
            return Err(AuthError::invalid_grant("Authorization code has expired"));
        }

        // 3. Validate client ID matches
        if code.client_id != client.client_id {
            tracing::warn!(
                client_id = %client.client_id,
                "Authorization code presented by a different client"
            );
            return Err(AuthError::invalid_grant("Authorization code was issued to another client"));
        }

        // 4. Validate redirect URI matches exactly
        if code.redirect_uri != redirect_uri {
            return Err(AuthError::invalid_grant("redirect_uri does not match"));
        }

        // 5. Verify PKCE
        if let Err(e) = self.verify_pkce(&code, code_verifier) {
            tracing::warn!(
                client_id = %client.client_id,
                policy = ?self.failure_policy,
                "PKCE verification failed"
            );
            if self.failure_policy == PkceFailurePolicy::Invalidate {
                with_timeout(
                    self.storage_timeout,
                    "discard_code",
                    self.codes.discard(&code.code, now),
                )
                .await?;
            }
            return Err(e);
        }

        // 6. Consume the code and issue in one step
        let with_refresh =
            self.refresh_enabled && client.is_grant_type_allowed(GrantType::RefreshToken);
        self.issuer
            .issue_for_code(&code, client, with_refresh, now)
            .await
    }
}
