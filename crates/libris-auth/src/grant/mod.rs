//! Grant Dispatcher and grant handlers.
//!
//! The dispatcher authenticates the client, checks that the requested grant
//! type is enabled on the server and declared by the client, then hands the
//! request to the matching [`GrantHandler`].
//!
//! # Supported Grant Types
//!
//! - [`AuthorizationCodeGrant`] - code exchange with PKCE verification
//! - [`ClientCredentialsGrant`] - confidential clients acting on their own behalf
//! - [`RefreshTokenGrant`] - refresh with rotation and replay detection

pub mod authorization_code;
pub mod client_credentials;
pub mod refresh_token;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

pub use authorization_code::AuthorizationCodeGrant;
pub use client_credentials::ClientCredentialsGrant;
pub use refresh_token::RefreshTokenGrant;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::client_auth::{AuthenticatedClient, ClientCredentials, ClientRegistry};
use crate::oauth::token::{TokenRequest, TokenResponse};
use crate::token::issuer::IssuedTokens;
use crate::types::GrantType;

/// A grant-specific token request handler.
#[async_trait]
pub trait GrantHandler: Send + Sync {
    /// The grant type this handler serves.
    fn grant_type(&self) -> GrantType;

    /// Executes the grant for an authenticated client.
    ///
    /// # Errors
    ///
    /// Returns the OAuth error for the failed step.
    async fn handle(
        &self,
        request: &TokenRequest,
        client: &AuthenticatedClient,
    ) -> AuthResult<IssuedTokens>;
}

/// Routes token requests to grant handlers.
pub struct GrantDispatcher {
    clients: Arc<ClientRegistry>,
    handlers: HashMap<GrantType, Arc<dyn GrantHandler>>,
}

impl GrantDispatcher {
    /// Creates a dispatcher with no grants enabled.
    #[must_use]
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self {
            clients,
            handlers: HashMap::new(),
        }
    }

    /// Enables a grant.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn GrantHandler>) -> Self {
        self.handlers.insert(handler.grant_type(), handler);
        self
    }

    /// Returns `true` if the grant type is enabled.
    #[must_use]
    pub fn is_enabled(&self, grant_type: GrantType) -> bool {
        self.handlers.contains_key(&grant_type)
    }

    /// Handles a token request.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `invalid_request` if `grant_type` is missing
    /// - `unsupported_grant_type` if the grant is unknown, not enabled, or
    ///   not declared by the client
    /// - `invalid_client` if client authentication fails
    /// - whatever the grant handler returns
    pub async fn dispatch(
        &self,
        request: &TokenRequest,
        credentials: &ClientCredentials,
    ) -> AuthResult<TokenResponse> {
        // 1. Resolve the grant type
        let raw = request
            .grant_type
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing required parameter: grant_type"))?;
        let handler = GrantType::parse(raw)
            .and_then(|grant_type| self.handlers.get(&grant_type))
            .ok_or_else(|| AuthError::unsupported_grant_type(raw))?;

        // 2. Authenticate the client
        let client = self.clients.authenticate_client(credentials).await?;

        // 3. The client must have declared this grant
        let grant_type = handler.grant_type();
        if !client.client.is_grant_type_allowed(grant_type) {
            tracing::debug!(
                client_id = %client.client.client_id,
                grant_type = %grant_type,
                "Grant type not declared by client"
            );
            return Err(AuthError::unsupported_grant_type(raw));
        }

        tracing::debug!(
            client_id = %client.client.client_id,
            grant_type = %grant_type,
            auth_method = %client.auth_method,
            "Dispatching token request"
        );

        // 4. Delegate
        let issued = handler.handle(request, &client).await?;
        Ok(issued.into_response())
    }
}
