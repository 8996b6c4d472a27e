//! Client credentials grant (RFC 6749 §4.4).
//!
//! No resource owner is involved and no refresh token is issued: the client
//! can always authenticate again.

use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::error::AuthError;
use crate::grant::GrantHandler;
use crate::oauth::client_auth::AuthenticatedClient;
use crate::oauth::token::TokenRequest;
use crate::token::issuer::{IssuedTokens, TokenIssuer};
use crate::types::{GrantType, Scope};

/// Issues access tokens to confidential clients acting on their own behalf.
pub struct ClientCredentialsGrant {
    issuer: Arc<TokenIssuer>,
}

impl ClientCredentialsGrant {
    /// Creates the handler.
    #[must_use]
    pub fn new(issuer: Arc<TokenIssuer>) -> Self {
        Self { issuer }
    }
}

/// Computes the granted scope.
///
/// An omitted or empty request grants everything the client may use. A
/// request with no overlap with the client's set is `invalid_scope`.
fn granted_scope(requested: Option<&str>, permitted: &Scope) -> AuthResult<Scope> {
    let requested = match requested.map(Scope::parse) {
        Some(scope) if !scope.is_empty() => scope,
        _ => return Ok(permitted.clone()),
    };

    let granted = requested.intersection(permitted);
    if granted.is_empty() {
        return Err(AuthError::invalid_scope(
            "None of the requested scopes are permitted for this client",
        ));
    }
    Ok(granted)
}

#[async_trait]
impl GrantHandler for ClientCredentialsGrant {
    fn grant_type(&self) -> GrantType {
        GrantType::ClientCredentials
    }

    async fn handle(
        &self,
        request: &TokenRequest,
        client: &AuthenticatedClient,
    ) -> AuthResult<IssuedTokens> {
        // 1. Require a confidential client that proved its secret
        if !client.client.is_confidential() || !client.is_secret_authenticated() {
            return Err(AuthError::invalid_client(
                "client_credentials requires confidential client authentication",
            ));
        }

        // 2. Determine scope
        let scope = granted_scope(request.scope.as_deref(), &client.client.allowed_scope())?;

        // 3. Issue an access token with no resource owner
        self.issuer.issue(&client.client, None, &scope, false).await
    }
}
