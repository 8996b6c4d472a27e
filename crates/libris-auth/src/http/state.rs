//! Shared state of the HTTP handlers.

use std::sync::Arc;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::discovery::ServerMetadata;
use crate::error::AuthError;
use crate::grant::{
    AuthorizationCodeGrant, ClientCredentialsGrant, GrantDispatcher, RefreshTokenGrant,
};
use crate::http::owner::ResourceOwnerResolver;
use crate::oauth::client_auth::ClientRegistry;
use crate::oauth::service::AuthorizationService;
use crate::storage::StoragePorts;
use crate::token::introspection::IntrospectionService;
use crate::token::issuer::TokenIssuer;
use crate::token::jwt::JwtService;
use crate::token::revocation::RevocationService;
use crate::token::userinfo::UserInfoService;
use crate::types::GrantType;

/// Everything the endpoints need, cheap to clone.
#[derive(Clone)]
pub struct AuthState {
    pub authorization: Arc<AuthorizationService>,
    pub dispatcher: Arc<GrantDispatcher>,
    pub clients: Arc<ClientRegistry>,
    pub introspection: Arc<IntrospectionService>,
    pub revocation: Arc<RevocationService>,
    pub userinfo: Arc<UserInfoService>,
    pub metadata: Arc<ServerMetadata>,
    pub resource_owner: Arc<dyn ResourceOwnerResolver>,
}

impl AuthState {
    /// Wires the services from configuration and storage ports.
    ///
    /// Only the grants enabled in `oauth.grant_types` get a handler.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the configuration is invalid.
    pub fn new(
        config: &AuthConfig,
        storage: StoragePorts,
        resource_owner: Arc<dyn ResourceOwnerResolver>,
    ) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let timeout = config.oauth.storage_timeout;
        let jwt = Arc::new(JwtService::from_config(config)?);
        let clients = Arc::new(ClientRegistry::new(storage.clients.clone(), timeout));
        let issuer = Arc::new(TokenIssuer::new(
            jwt.clone(),
            storage.tokens.clone(),
            storage.codes.clone(),
            config,
        ));

        let mut dispatcher = GrantDispatcher::new(clients.clone());
        for grant in config.oauth.enabled_grant_types() {
            dispatcher = match grant {
                GrantType::AuthorizationCode => dispatcher.with_handler(Arc::new(
                    AuthorizationCodeGrant::new(storage.codes.clone(), issuer.clone(), config),
                )),
                GrantType::ClientCredentials => {
                    dispatcher.with_handler(Arc::new(ClientCredentialsGrant::new(issuer.clone())))
                }
                GrantType::RefreshToken => dispatcher.with_handler(Arc::new(
                    RefreshTokenGrant::new(storage.tokens.clone(), issuer.clone(), config),
                )),
            };
        }

        Ok(Self {
            authorization: Arc::new(AuthorizationService::new(
                clients.clone(),
                storage.codes.clone(),
                config,
            )),
            dispatcher: Arc::new(dispatcher),
            clients,
            introspection: Arc::new(IntrospectionService::new(storage.tokens.clone(), config)),
            revocation: Arc::new(RevocationService::new(storage.tokens.clone(), config)),
            userinfo: Arc::new(UserInfoService::new(jwt, storage.tokens, storage.users, config)),
            metadata: Arc::new(ServerMetadata::build(config)),
            resource_owner,
        })
    }
}
