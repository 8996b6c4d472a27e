//! Authorization Request Handler.
//!
//! Validates `/authorize` requests and creates single-use authorization
//! codes bound to a PKCE challenge.
//!
//! # Validation Order
//!
//! Errors found before the redirect URI is trusted are rendered directly to
//! the resource owner. Everything after goes back to the client through the
//! redirect URI.
//!
//! 1. Client
//! 2. Redirect URI (exact match)
//! 3. Response type and client eligibility
//! 4. Scope
//! 5. PKCE challenge
//! 6. Resource owner
//!
//! # Usage
//!
//! ```ignore
//! let service = AuthorizationService::new(registry, codes, &config);
//! match service.authorize(&request, Some("reader-42")).await {
//!     Ok(response) => redirect(response.to_redirect_url()?),
//!     Err(error) => render_or_redirect(error),
//! }
//! ```

use std::sync::Arc;

use time::OffsetDateTime;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::authorize::{
    AuthorizationError, AuthorizationErrorCode, AuthorizationRequest, AuthorizationResponse,
};
use crate::oauth::client_auth::ClientRegistry;
use crate::oauth::pkce::{PkceChallenge, PkceChallengeMethod, PkcePolicy};
use crate::storage::{CodeStorage, with_timeout};
use crate::types::{AuthorizationCode, GrantType, Scope};

/// Authorization service for handling OAuth 2.0 authorization requests.
pub struct AuthorizationService {
    clients: Arc<ClientRegistry>,
    codes: Arc<dyn CodeStorage>,
    code_lifetime: time::Duration,
    pkce: PkcePolicy,
    storage_timeout: std::time::Duration,
}

impl AuthorizationService {
    /// Creates a new authorization service.
    ///
    /// # Arguments
    ///
    /// * `clients` - Registry for looking up registered clients
    /// * `codes` - Storage for authorization codes
    /// * `config` - Validated server configuration
    #[must_use]
    pub fn new(
        clients: Arc<ClientRegistry>,
        codes: Arc<dyn CodeStorage>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            clients,
            codes,
            code_lifetime: to_time_duration(config.oauth.authorization_code_lifetime),
            pkce: PkcePolicy::from(&config.oauth),
            storage_timeout: config.oauth.storage_timeout,
        }
    }

    /// Processes an authorization request.
    ///
    /// # Arguments
    ///
    /// * `request` - The authorization request to process
    /// * `subject` - The authenticated resource owner, if any
    ///
    /// # Returns
    ///
    /// The response carrying the persisted code and the redirect URI.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthorizationError`]. It is redirectable once the
    /// redirect URI has been validated. No code is persisted on any error path.
    pub async fn authorize(
        &self,
        request: &AuthorizationRequest,
        subject: Option<&str>,
    ) -> Result<AuthorizationResponse, AuthorizationError> {
        // 1. Resolve client
        let client_id = request.client_id.as_deref().ok_or_else(|| {
            AuthorizationError::direct(
                AuthorizationErrorCode::InvalidRequest,
                "Missing required parameter: client_id",
            )
        })?;

        let client = match self.clients.load_client(client_id).await {
            Ok(Some(client)) if client.active => client,
            Ok(_) => {
                tracing::warn!(client_id = %client_id, "Authorization request for unknown client");
                return Err(AuthorizationError::direct(
                    AuthorizationErrorCode::InvalidClient,
                    "Unknown client",
                ));
            }
            Err(e) => {
                return Err(AuthorizationError::direct(
                    AuthorizationErrorCode::from(&e),
                    e.public_description(),
                ));
            }
        };

        // 2. Validate redirect_uri
        let redirect_uri = request.redirect_uri.as_deref().ok_or_else(|| {
            AuthorizationError::direct(
                AuthorizationErrorCode::InvalidRequest,
                "Missing required parameter: redirect_uri",
            )
        })?;
        if !client.is_redirect_uri_allowed(redirect_uri) {
            tracing::warn!(client_id = %client_id, "Redirect URI is not registered");
            return Err(AuthorizationError::direct(
                AuthorizationErrorCode::InvalidRequest,
                "redirect_uri does not match a registered redirect URI",
            ));
        }

        // From here on errors are delivered to the client
        let state = request.state.clone();
        let reject = |code: AuthorizationErrorCode, description: String| {
            AuthorizationError::redirect(code, description, redirect_uri, state.clone())
        };

        // 3. Validate response_type
        match request.response_type.as_deref() {
            None => {
                return Err(reject(
                    AuthorizationErrorCode::InvalidRequest,
                    "Missing required parameter: response_type".to_string(),
                ));
            }
            Some("code") => {}
            Some(other) => {
                return Err(reject(
                    AuthorizationErrorCode::UnsupportedResponseType,
                    format!("Response type '{other}' is not supported"),
                ));
            }
        }
        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Err(reject(
                AuthorizationErrorCode::UnauthorizedClient,
                "Client is not authorized for the authorization_code grant".to_string(),
            ));
        }

        // 4. Validate scopes
        let scope = match request.scope.as_deref().map(Scope::parse) {
            Some(requested) if !requested.is_empty() => {
                if !client.permits_scope(&requested) {
                    return Err(reject(
                        AuthorizationErrorCode::InvalidScope,
                        "Requested scope exceeds the scopes permitted for this client".to_string(),
                    ));
                }
                requested
            }
            _ => client.allowed_scope(),
        };

        // 5. Validate PKCE
        let Some(challenge) = request.code_challenge.as_deref() else {
            return Err(reject(
                AuthorizationErrorCode::InvalidRequest,
                "code_challenge is required".to_string(),
            ));
        };
        let method = PkceChallengeMethod::parse(request.code_challenge_method.as_deref(), &self.pkce)
            .map_err(|e| reject(AuthorizationErrorCode::InvalidRequest, e.to_string()))?;
        let challenge = PkceChallenge::new(challenge, method, &self.pkce)
            .map_err(|e| reject(AuthorizationErrorCode::InvalidRequest, e.to_string()))?;

        // 6. Require an authenticated resource owner
        let Some(subject) = subject else {
            return Err(reject(
                AuthorizationErrorCode::AccessDenied,
                "The resource owner is not authenticated".to_string(),
            ));
        };

        // 7. Persist the code
        let now = OffsetDateTime::now_utc();
        let expires_at = now.checked_add(self.code_lifetime).ok_or_else(|| {
            let e = AuthError::internal("authorization code lifetime overflows");
            reject(AuthorizationErrorCode::from(&e), e.public_description())
        })?;
        let code = AuthorizationCode {
            code: AuthorizationCode::generate_code(),
            client_id: client.client_id.clone(),
            subject: subject.to_string(),
            redirect_uri: redirect_uri.to_string(),
            scope,
            code_challenge: challenge.into_inner(),
            code_challenge_method: method,
            created_at: now,
            expires_at,
            consumed_at: None,
        };

        with_timeout(self.storage_timeout, "create_code", self.codes.create(&code))
            .await
            .map_err(|e| reject(AuthorizationErrorCode::from(&e), e.public_description()))?;

        tracing::info!(
            client_id = %code.client_id,
            scope = %code.scope,
            method = %method,
            "Authorization code issued"
        );

        Ok(AuthorizationResponse {
            code: code.code,
            state: request.state.clone(),
            redirect_uri: redirect_uri.to_string(),
        })
    }
}

/// Converts a configured lifetime to a `time::Duration`, saturating.
pub(crate) fn to_time_duration(duration: std::time::Duration) -> time::Duration {
    time::Duration::try_from(duration).unwrap_or(time::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthResult;
    use crate::oauth::pkce::PkceVerifier;
    use crate::storage::ClientStorage;
    use crate::types::{Client, ClientType, GrantRecords, TokenEndpointAuthMethod};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::RwLock;

    #[derive(Default)]
    struct MockStorage {
        clients: RwLock<HashMap<String, Client>>,
        codes: RwLock<HashMap<String, AuthorizationCode>>,
    }

    #[async_trait]
    impl ClientStorage for MockStorage {
        async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
            Ok(self.clients.read().unwrap().get(client_id).cloned())
        }
    }

    #[async_trait]
    impl CodeStorage for MockStorage {
        async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
            self.codes
                .write()
                .unwrap()
                .insert(code.code.clone(), code.clone());
            Ok(())
        }

        async fn find_by_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
            Ok(self.codes.read().unwrap().get(code).cloned())
        }

        async fn redeem(&self, _: &str, _: OffsetDateTime, _: &GrantRecords) -> AuthResult<bool> {
            Ok(false)
        }

        async fn discard(&self, _: &str, _: OffsetDateTime) -> AuthResult<bool> {
            Ok(false)
        }
    }

    fn client() -> Client {
        Client {
            client_id: "c1".to_string(),
            name: "Catalog SPA".to_string(),
            client_type: ClientType::Public,
            client_secret_hash: None,
            redirect_uris: vec!["https://app.example/cb".to_string()],
            grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            scopes: vec!["openid".to_string(), "email".to_string()],
            token_endpoint_auth_method: TokenEndpointAuthMethod::None,
            active: true,
            access_token_lifetime: None,
        }
    }

    fn setup(config: &AuthConfig) -> (AuthorizationService, Arc<MockStorage>) {
        let storage = Arc::new(MockStorage::default());
        storage
            .clients
            .write()
            .unwrap()
            .insert("c1".to_string(), client());
        let registry = Arc::new(ClientRegistry::new(
            storage.clone(),
            config.oauth.storage_timeout,
        ));
        (
            AuthorizationService::new(registry, storage.clone(), config),
            storage,
        )
    }

    fn valid_request() -> AuthorizationRequest {
        let verifier = PkceVerifier::generate();
        AuthorizationRequest {
            response_type: Some("code".to_string()),
            client_id: Some("c1".to_string()),
            redirect_uri: Some("https://app.example/cb".to_string()),
            scope: Some("openid email".to_string()),
            state: Some("xyz".to_string()),
            code_challenge: Some(PkceChallenge::from_verifier(&verifier).into_inner()),
            code_challenge_method: Some("S256".to_string()),
        }
    }

    #[tokio::test]
    async fn test_authorize_success_persists_code() {
        let (service, storage) = setup(&AuthConfig::default());
        let response = service
            .authorize(&valid_request(), Some("reader-42"))
            .await
            .unwrap();

        let stored = storage.codes.read().unwrap().get(&response.code).cloned().unwrap();
        assert_eq!(stored.client_id, "c1");
        assert_eq!(stored.subject, "reader-42");
        assert_eq!(stored.scope.to_string(), "openid email");
        assert_eq!(stored.code_challenge_method, PkceChallengeMethod::S256);
        assert_eq!((stored.expires_at - stored.created_at).whole_seconds(), 600);

        let url = response.to_redirect_url().unwrap();
        assert!(url.starts_with("https://app.example/cb?code="));
        assert!(url.ends_with("&state=xyz"));
    }

    #[tokio::test]
    async fn test_unknown_client_is_direct_error() {
        let (service, _) = setup(&AuthConfig::default());
        let mut request = valid_request();
        request.client_id = Some("nope".to_string());
        let err = service.authorize(&request, Some("u")).await.unwrap_err();
        assert!(!err.is_redirectable());
        assert_eq!(err.error, AuthorizationErrorCode::InvalidClient);
    }

    #[tokio::test]
    async fn test_unregistered_redirect_uri_is_direct_error() {
        let (service, _) = setup(&AuthConfig::default());
        for uri in ["https://app.example/cb/", "https://app.example/cb?x=1", "https://evil.example/cb"] {
            let mut request = valid_request();
            request.redirect_uri = Some(uri.to_string());
            let err = service.authorize(&request, Some("u")).await.unwrap_err();
            assert!(!err.is_redirectable(), "{uri} must not be trusted");
        }
    }

    #[tokio::test]
    async fn test_unsupported_response_type_redirects() {
        let (service, storage) = setup(&AuthConfig::default());
        let mut request = valid_request();
        request.response_type = Some("token".to_string());
        let err = service.authorize(&request, Some("u")).await.unwrap_err();
        assert_eq!(err.error, AuthorizationErrorCode::UnsupportedResponseType);
        assert_eq!(err.state.as_deref(), Some("xyz"));
        assert!(err.to_redirect_url().unwrap().starts_with("https://app.example/cb?error="));
        assert!(storage.codes.read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scope_outside_client_set_rejected() {
        let (service, _) = setup(&AuthConfig::default());
        let mut request = valid_request();
        request.scope = Some("openid catalog:write".to_string());
        let err = service.authorize(&request, Some("u")).await.unwrap_err();
        assert_eq!(err.error, AuthorizationErrorCode::InvalidScope);
        assert!(err.is_redirectable());
    }

    #[tokio::test]
    async fn test_omitted_scope_defaults_to_client_scopes() {
        let (service, storage) = setup(&AuthConfig::default());
        let mut request = valid_request();
        request.scope = None;
        let response = service.authorize(&request, Some("u")).await.unwrap();
        let stored = storage.codes.read().unwrap().get(&response.code).cloned().unwrap();
        assert_eq!(stored.scope.to_string(), "openid email");
    }

    #[tokio::test]
    async fn test_missing_challenge_rejected() {
        let (service, _) = setup(&AuthConfig::default());
        let mut request = valid_request();
        request.code_challenge = None;
        let err = service.authorize(&request, Some("u")).await.unwrap_err();
        assert_eq!(err.error, AuthorizationErrorCode::InvalidRequest);
        assert!(err.is_redirectable());
    }

    #[tokio::test]
    async fn test_plain_rejected_unless_allowed() {
        let (service, _) = setup(&AuthConfig::default());
        let mut request = valid_request();
        request.code_challenge = Some("verifier123".to_string());
        request.code_challenge_method = Some("plain".to_string());
        let err = service.authorize(&request, Some("u")).await.unwrap_err();
        assert_eq!(err.error, AuthorizationErrorCode::InvalidRequest);

        // Omitted method means plain
        request.code_challenge_method = None;
        assert!(service.authorize(&request, Some("u")).await.is_err());

        let mut config = AuthConfig::default();
        config.oauth.allow_plain_pkce = true;
        config.oauth.pkce_min_verifier_length = 8;
        let (service, _) = setup(&config);
        request.code_challenge_method = Some("plain".to_string());
        assert!(service.authorize(&request, Some("u")).await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_s256_challenge_rejected() {
        let (service, _) = setup(&AuthConfig::default());
        let mut request = valid_request();
        request.code_challenge = Some("short".to_string());
        let err = service.authorize(&request, Some("u")).await.unwrap_err();
        assert_eq!(err.error, AuthorizationErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn test_unauthenticated_owner_is_access_denied() {
        let (service, storage) = setup(&AuthConfig::default());
        let err = service.authorize(&valid_request(), None).await.unwrap_err();
        assert_eq!(err.error, AuthorizationErrorCode::AccessDenied);
        assert!(err.is_redirectable());
        assert!(storage.codes.read().unwrap().is_empty());
    }
}
