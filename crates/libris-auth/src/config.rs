//! Authorization server configuration.
//!
//! Every field has a default so that a partial TOML section deserializes.
//! Defaults that cannot be safe in production (the signing secret) are left
//! empty and rejected by [`AuthConfig::validate`].

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::token::jwt::SigningAlgorithm;
use crate::types::GrantType;

/// Minimum length of the HMAC signing secret in bytes.
pub const MIN_SIGNING_SECRET_LEN: usize = 32;

/// Upper bound for `oauth.authorization_code_lifetime`.
pub const MAX_CODE_LIFETIME: Duration = Duration::from_secs(3600);

/// Upper bound for `oauth.access_token_lifetime` (one day).
pub const MAX_ACCESS_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 3600);

/// Upper bound for `oauth.refresh_token_lifetime` (one year).
pub const MAX_REFRESH_TOKEN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 3600);

/// Upper bound for `oauth.storage_timeout`.
pub const MAX_STORAGE_TIMEOUT: Duration = Duration::from_secs(300);

/// Root authorization server configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "https://auth.libris.example"
///
/// [auth.signing]
/// secret = "change-me-to-at-least-32-bytes-of-entropy"
///
/// [auth.oauth]
/// access_token_lifetime = "1h"
/// refresh_token_lifetime = "30d"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer identifier (used as the `iss` claim and as the base of endpoint URLs).
    pub issuer: String,

    /// Audience placed in the `aud` claim of access tokens.
    pub audience: Option<String>,

    /// Token signing configuration.
    pub signing: SigningConfig,

    /// OAuth 2.0 protocol configuration.
    pub oauth: OAuthConfig,

    /// Extra values advertised in the discovery document.
    pub discovery: DiscoveryConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            audience: None,
            signing: SigningConfig::default(),
            oauth: OAuthConfig::default(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// HMAC algorithm: `HS256`, `HS384` or `HS512`.
    pub algorithm: String,

    /// Shared signing secret. Required.
    pub secret: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: "HS256".to_string(),
            secret: String::new(),
        }
    }
}

/// What happens to an authorization code after a failed PKCE verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PkceFailurePolicy {
    /// Leave the code redeemable until it expires.
    #[default]
    Retain,
    /// Consume the code so no further attempt can succeed.
    Invalidate,
}

/// OAuth 2.0 protocol configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization code lifetime.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Default access token lifetime. Clients may override it.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime, measured from the start of the token family.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Rotate refresh tokens on every use.
    pub refresh_token_rotation: bool,

    /// Revoking a refresh token revokes its whole family.
    pub revoke_family_on_refresh_revocation: bool,

    /// Accept `code_challenge_method=plain`.
    pub allow_plain_pkce: bool,

    /// Minimum accepted `code_verifier` length.
    pub pkce_min_verifier_length: usize,

    /// Behavior after a PKCE mismatch.
    pub pkce_failure_policy: PkceFailurePolicy,

    /// Grant types enabled on this server.
    pub grant_types: Vec<String>,

    /// Scopes advertised in discovery.
    pub scopes_supported: Vec<String>,

    /// Upper bound for a single call into the persistence layer.
    #[serde(with = "humantime_serde")]
    pub storage_timeout: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(600),
            access_token_lifetime: Duration::from_secs(3600),
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600),
            refresh_token_rotation: true,
            revoke_family_on_refresh_revocation: true,
            allow_plain_pkce: false,
            pkce_min_verifier_length: 43,
            pkce_failure_policy: PkceFailurePolicy::Retain,
            grant_types: vec![
                "authorization_code".to_string(),
                "client_credentials".to_string(),
                "refresh_token".to_string(),
            ],
            scopes_supported: vec![
                "openid".to_string(),
                "profile".to_string(),
                "email".to_string(),
                "catalog:read".to_string(),
                "catalog:write".to_string(),
            ],
            storage_timeout: Duration::from_secs(5),
        }
    }
}

impl OAuthConfig {
    /// Returns the enabled grant types, skipping unknown names.
    #[must_use]
    pub fn enabled_grant_types(&self) -> Vec<GrantType> {
        self.grant_types
            .iter()
            .filter_map(|g| GrantType::parse(g))
            .collect()
    }
}

/// Optional discovery document fields.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// JWKS location, advertised when keys are published elsewhere.
    pub jwks_uri: Option<String>,

    /// Human-readable documentation URL.
    pub service_documentation: Option<String>,
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::Missing("issuer".to_string()));
        }

        let issuer = Url::parse(&self.issuer)
            .map_err(|e| ConfigError::InvalidValue(format!("issuer is not a valid URL: {e}")))?;
        let local = matches!(issuer.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));
        if issuer.scheme() != "https" && !(issuer.scheme() == "http" && local) {
            return Err(ConfigError::InvalidValue(
                "issuer must use https (http is only allowed for localhost)".to_string(),
            ));
        }
        if issuer.query().is_some() || issuer.fragment().is_some() {
            return Err(ConfigError::InvalidValue(
                "issuer must not contain a query or fragment".to_string(),
            ));
        }

        if SigningAlgorithm::parse(&self.signing.algorithm).is_none() {
            return Err(ConfigError::InvalidValue(format!(
                "Invalid signing algorithm: '{}'. Must be HS256, HS384, or HS512",
                self.signing.algorithm
            )));
        }

        if self.signing.secret.is_empty() {
            return Err(ConfigError::Missing("signing.secret".to_string()));
        }
        if self.signing.secret.len() < MIN_SIGNING_SECRET_LEN {
            return Err(ConfigError::InvalidValue(format!(
                "signing.secret must be at least {MIN_SIGNING_SECRET_LEN} bytes"
            )));
        }

        if self.oauth.grant_types.is_empty() {
            return Err(ConfigError::Missing("oauth.grant_types".to_string()));
        }
        for grant in &self.oauth.grant_types {
            if GrantType::parse(grant).is_none() {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid grant type: '{grant}'. Must be authorization_code, client_credentials, or refresh_token"
                )));
            }
        }

        if !(1..=128).contains(&self.oauth.pkce_min_verifier_length) {
            return Err(ConfigError::InvalidValue(
                "oauth.pkce_min_verifier_length must be between 1 and 128".to_string(),
            ));
        }

        for (name, value, max) in [
            (
                "oauth.authorization_code_lifetime",
                self.oauth.authorization_code_lifetime,
                MAX_CODE_LIFETIME,
            ),
            (
                "oauth.access_token_lifetime",
                self.oauth.access_token_lifetime,
                MAX_ACCESS_TOKEN_LIFETIME,
            ),
            (
                "oauth.refresh_token_lifetime",
                self.oauth.refresh_token_lifetime,
                MAX_REFRESH_TOKEN_LIFETIME,
            ),
            ("oauth.storage_timeout", self.oauth.storage_timeout, MAX_STORAGE_TIMEOUT),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue(format!("{name} must be > 0")));
            }
            if value > max {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} must be at most {}s",
                    max.as_secs()
                )));
            }
        }

        if let Some(jwks_uri) = &self.discovery.jwks_uri {
            Url::parse(jwks_uri).map_err(|e| {
                ConfigError::InvalidValue(format!("discovery.jwks_uri is not a valid URL: {e}"))
            })?;
        }

        Ok(())
    }

    /// Returns the issuer without a trailing slash.
    #[must_use]
    pub fn issuer_base(&self) -> &str {
        self.issuer.trim_end_matches('/')
    }
}

/// Errors produced while validating configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// A value is present but invalid.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required value is absent.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}
