//! OAuth 2.0 client registrations.
//!
//! A [`Client`] is read-only from the point of view of this crate. Creating
//! or updating registrations happens through an administrative path elsewhere.

use serde::{Deserialize, Serialize};

use crate::types::Scope;

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow with PKCE.
    AuthorizationCode,
    /// Client Credentials flow (confidential clients only).
    ClientCredentials,
    /// Refresh Token flow.
    RefreshToken,
}

impl GrantType {
    /// Returns the OAuth 2.0 `grant_type` parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Parses a `grant_type` parameter value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "client_credentials" => Some(Self::ClientCredentials),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client Type / Auth Method
// =============================================================================

/// Confidentiality class of a client (RFC 6749 §2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    /// Cannot keep a secret. Authenticates only through PKCE possession.
    Public,
    /// Holds a secret that is verified at the token endpoint.
    Confidential,
}

/// Token endpoint authentication methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEndpointAuthMethod {
    /// No client authentication (public clients).
    None,
    /// Client secret via HTTP Basic Auth.
    ClientSecretBasic,
    /// Client secret in the request body.
    ClientSecretPost,
}

impl TokenEndpointAuthMethod {
    /// Returns the registered method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
        }
    }
}

impl std::fmt::Display for TokenEndpointAuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client
// =============================================================================

/// A registered OAuth 2.0 client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier.
    pub client_id: String,

    /// Human-readable display name.
    pub name: String,

    /// Confidentiality class.
    pub client_type: ClientType,

    /// Argon2id PHC hash of the client secret (confidential clients only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_hash: Option<String>,

    /// Registered redirect URIs, compared by exact string match.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Grant types this client may use.
    pub grant_types: Vec<GrantType>,

    /// Scopes this client may request.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Registered token endpoint authentication method.
    pub token_endpoint_auth_method: TokenEndpointAuthMethod,

    /// Inactive clients cannot authenticate.
    #[serde(default = "default_active")]
    pub active: bool,

    /// Access token lifetime override in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_lifetime: Option<i64>,
}

fn default_active() -> bool {
    true
}

impl Client {
    /// Validates the registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration is internally inconsistent.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.grant_types.is_empty() {
            return Err(ClientValidationError::NoGrantTypes);
        }

        match self.client_type {
            ClientType::Public => {
                if self.grant_types.contains(&GrantType::ClientCredentials) {
                    return Err(ClientValidationError::PublicClientCredentials);
                }
                if self.client_secret_hash.is_some()
                    || self.token_endpoint_auth_method != TokenEndpointAuthMethod::None
                {
                    return Err(ClientValidationError::PublicClientSecret);
                }
            }
            ClientType::Confidential => {
                if self.client_secret_hash.is_none() {
                    return Err(ClientValidationError::MissingSecret);
                }
                if self.token_endpoint_auth_method == TokenEndpointAuthMethod::None {
                    return Err(ClientValidationError::MissingAuthMethod);
                }
            }
        }

        if self.grant_types.contains(&GrantType::AuthorizationCode) && self.redirect_uris.is_empty()
        {
            return Err(ClientValidationError::NoRedirectUris);
        }

        if let Some(uri) = self
            .redirect_uris
            .iter()
            .find(|uri| url::Url::parse(uri).map(|u| u.fragment().is_some()).unwrap_or(true))
        {
            return Err(ClientValidationError::InvalidRedirectUri(uri.clone()));
        }

        let max_lifetime = crate::config::MAX_ACCESS_TOKEN_LIFETIME.as_secs();
        if let Some(secs) = self.access_token_lifetime {
            if u64::try_from(secs).is_ok_and(|secs| secs > max_lifetime) {
                return Err(ClientValidationError::AccessTokenLifetime(secs));
            }
        }

        Ok(())
    }

    /// Returns `true` for confidential clients.
    #[must_use]
    pub fn is_confidential(&self) -> bool {
        self.client_type == ClientType::Confidential
    }

    /// Checks the redirect URI against the registered set by exact match.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Checks if the given grant type is allowed for this client.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    /// Returns the full set of scopes the client may request.
    #[must_use]
    pub fn allowed_scope(&self) -> Scope {
        Scope::from_iter(self.scopes.iter().cloned())
    }

    /// Checks that every requested scope is permitted for this client.
    #[must_use]
    pub fn permits_scope(&self, requested: &Scope) -> bool {
        requested.is_subset_of(&self.allowed_scope())
    }

    /// Returns the access token lifetime override, if any.
    #[must_use]
    pub fn access_token_lifetime(&self) -> Option<time::Duration> {
        self.access_token_lifetime
            .filter(|secs| *secs > 0)
            .map(time::Duration::seconds)
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Errors that can occur during client validation.
#[derive(Debug, thiserror::Error)]
pub enum ClientValidationError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty")]
    EmptyClientId,

    /// At least one grant type is required.
    #[error("At least one grant type is required")]
    NoGrantTypes,

    /// Public clients cannot use client_credentials grant.
    #[error("Public clients cannot use client_credentials grant")]
    PublicClientCredentials,

    /// Public clients cannot hold a secret.
    #[error("Public clients cannot have a client secret or secret-based auth method")]
    PublicClientSecret,

    /// Authorization code flow requires redirect URIs.
    #[error("Authorization code flow requires redirect URIs")]
    NoRedirectUris,

    /// Redirect URIs must be absolute and carry no fragment.
    #[error("Invalid redirect URI: {0}")]
    InvalidRedirectUri(String),

    /// Confidential clients require a client secret.
    #[error("Confidential clients require a client secret")]
    MissingSecret,

    /// Confidential clients require a secret-based auth method.
    #[error("Confidential clients require client_secret_basic or client_secret_post")]
    MissingAuthMethod,

    /// The access token lifetime override exceeds the server maximum.
    #[error("Access token lifetime override of {0}s exceeds the maximum")]
    AccessTokenLifetime(i64),
}
