//! Client Registry.
//!
//! Resolves client registrations and authenticates clients at the token,
//! introspection and revocation endpoints.
//!
//! # Authentication Methods
//!
//! - `none` - Public clients, identified by `client_id` only
//! - `client_secret_basic` - HTTP Basic Auth with client_id:client_secret
//! - `client_secret_post` - client_id and client_secret in request body
//!
//! # Authentication Priority
//!
//! When credentials arrive through several channels they are resolved in order:
//! 1. HTTP Basic Auth header
//! 2. client_secret_post (body parameters)
//! 3. Public client (client_id only)

use std::sync::Arc;
use std::time::Duration;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::secret;
use crate::storage::{ClientStorage, with_timeout};
use crate::types::{Client, TokenEndpointAuthMethod};

/// Result of successful client authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    /// The authenticated client.
    pub client: Client,

    /// The authentication method used.
    pub auth_method: TokenEndpointAuthMethod,
}

impl AuthenticatedClient {
    /// Returns `true` if the client proved possession of its secret.
    #[must_use]
    pub fn is_secret_authenticated(&self) -> bool {
        self.auth_method != TokenEndpointAuthMethod::None
    }
}

/// Client credentials as presented on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCredentials {
    /// `Authorization: Basic` header.
    Basic {
        /// Client identifier.
        client_id: String,
        /// Client secret.
        client_secret: String,
    },
    /// `client_id` and `client_secret` form parameters.
    Post {
        /// Client identifier.
        client_id: String,
        /// Client secret.
        client_secret: String,
    },
    /// `client_id` form parameter only.
    Public {
        /// Client identifier.
        client_id: String,
    },
    /// Nothing identifying the client.
    Missing,
}

impl ClientCredentials {
    /// Resolves the credentials of a request.
    ///
    /// # Arguments
    ///
    /// * `basic` - Decoded HTTP Basic credentials, if the header was present
    /// * `client_id` - `client_id` form parameter
    /// * `client_secret` - `client_secret` form parameter
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` if the Basic header and the body disagree on
    /// the client ID, or if both carry a secret.
    pub fn resolve(
        basic: Option<(String, String)>,
        client_id: Option<&str>,
        client_secret: Option<&str>,
    ) -> AuthResult<Self> {
        if let Some((basic_id, basic_secret)) = basic {
            if client_id.is_some_and(|id| id != basic_id) {
                return Err(AuthError::invalid_request(
                    "client_id does not match the Authorization header",
                ));
            }
            if client_secret.is_some() {
                return Err(AuthError::invalid_request(
                    "Multiple client authentication methods used",
                ));
            }
            return Ok(Self::Basic {
                client_id: basic_id,
                client_secret: basic_secret,
            });
        }

        Ok(match (client_id, client_secret) {
            (Some(id), Some(secret)) => Self::Post {
                client_id: id.to_string(),
                client_secret: secret.to_string(),
            },
            (Some(id), None) => Self::Public {
                client_id: id.to_string(),
            },
            _ => Self::Missing,
        })
    }

    /// Returns the client ID, if any was presented.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        match self {
            Self::Basic { client_id, .. }
            | Self::Post { client_id, .. }
            | Self::Public { client_id } => Some(client_id),
            Self::Missing => None,
        }
    }
}

/// Read-only view over client registrations.
pub struct ClientRegistry {
    storage: Arc<dyn ClientStorage>,
    storage_timeout: Duration,
}

impl ClientRegistry {
    /// Creates a new registry.
    #[must_use]
    pub fn new(storage: Arc<dyn ClientStorage>, storage_timeout: Duration) -> Self {
        Self {
            storage,
            storage_timeout,
        }
    }

    /// Loads a client registration.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if no client is registered under `client_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the lookup fails or times out.
    pub async fn load_client(&self, client_id: &str) -> AuthResult<Option<Client>> {
        with_timeout(
            self.storage_timeout,
            "find_by_client_id",
            self.storage.find_by_client_id(client_id),
        )
        .await
    }

    /// Authenticates a client.
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` if:
    /// - No client credentials are provided
    /// - The client is not found or is inactive
    /// - A confidential client presents no secret or a wrong one
    /// - A public client presents a secret
    pub async fn authenticate_client(
        &self,
        credentials: &ClientCredentials,
    ) -> AuthResult<AuthenticatedClient> {
        match credentials {
            ClientCredentials::Basic {
                client_id,
                client_secret,
            } => {
                self.authenticate_secret(
                    client_id,
                    client_secret,
                    TokenEndpointAuthMethod::ClientSecretBasic,
                )
                .await
            }
            ClientCredentials::Post {
                client_id,
                client_secret,
            } => {
                self.authenticate_secret(
                    client_id,
                    client_secret,
                    TokenEndpointAuthMethod::ClientSecretPost,
                )
                .await
            }
            ClientCredentials::Public { client_id } => self.authenticate_public(client_id).await,
            ClientCredentials::Missing => {
                Err(AuthError::invalid_client("No client credentials provided"))
            }
        }
    }

    async fn authenticate_secret(
        &self,
        client_id: &str,
        client_secret: &str,
        method: TokenEndpointAuthMethod,
    ) -> AuthResult<AuthenticatedClient> {
        let Some(client) = self.load_client(client_id).await? else {
            verify_off_thread(client_secret.to_string(), None).await?;
            tracing::warn!(client_id = %client_id, "Authentication attempt for unknown client");
            return Err(AuthError::invalid_client("Client authentication failed"));
        };

        if !client.active {
            return Err(AuthError::invalid_client("Client is inactive"));
        }

        // Public clients authenticate by PKCE possession only
        if !client.is_confidential() {
            return Err(AuthError::invalid_client(format!(
                "Public clients cannot use {method} authentication"
            )));
        }

        let verified =
            verify_off_thread(client_secret.to_string(), client.client_secret_hash.clone()).await?;
        if !verified {
            tracing::warn!(
                client_id = %client_id,
                auth_method = %method,
                "Client secret verification failed"
            );
            return Err(AuthError::invalid_client("Client authentication failed"));
        }

        if client.token_endpoint_auth_method != method {
            tracing::warn!(
                client_id = %client_id,
                registered = %client.token_endpoint_auth_method,
                auth_method = %method,
                "Client used an unregistered authentication method"
            );
            return Err(AuthError::invalid_client(format!(
                "Client is not registered for {method} authentication"
            )));
        }

        Ok(AuthenticatedClient {
            client,
            auth_method: method,
        })
    }

    async fn authenticate_public(&self, client_id: &str) -> AuthResult<AuthenticatedClient> {
        let client = self
            .load_client(client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client("Client authentication failed"))?;

        if !client.active {
            return Err(AuthError::invalid_client("Client is inactive"));
        }

        if client.is_confidential() {
            return Err(AuthError::invalid_client(
                "Confidential clients must provide client credentials",
            ));
        }

        Ok(AuthenticatedClient {
            client,
            auth_method: TokenEndpointAuthMethod::None,
        })
    }
}

/// Runs the Argon2 verification on the blocking pool.
///
/// With no stored hash a dummy verification runs and `false` is returned.
async fn verify_off_thread(secret: String, hash: Option<String>) -> AuthResult<bool> {
    let result = tokio::task::spawn_blocking(move || match hash {
        Some(hash) => secret::verify_client_secret(&secret, &hash).map_err(|e| e.to_string()),
        None => {
            secret::verify_dummy(&secret);
            Ok(false)
        }
    })
    .await
    .map_err(|e| AuthError::internal(format!("Secret verification task failed: {e}")))?;

    result.map_err(|e| {
        tracing::error!(error = %e, "Stored client secret hash is malformed");
        AuthError::internal("Stored client secret hash is malformed")
    })
}

/// Parses an HTTP Basic Auth header value.
///
/// # Returns
///
/// `Some((client_id, client_secret))` if well-formed, `None` otherwise.
#[must_use]
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header_value.trim().strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    // Split on first colon (secret may contain colons)
    let (client_id, client_secret) = credentials.split_once(':')?;
    if client_id.is_empty() {
        return None;
    }

    Some((client_id.to_string(), client_secret.to_string()))
}
