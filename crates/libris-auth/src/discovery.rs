//! Authorization server metadata (RFC 8414).
//!
//! The document is a pure function of configuration. It is built once at
//! startup and served unchanged for the lifetime of the process.
//!
//! # References
//!
//! - [RFC 8414 - OAuth 2.0 Authorization Server Metadata](https://tools.ietf.org/html/rfc8414)

use serde::Serialize;

use crate::config::AuthConfig;
use crate::oauth::pkce::PkceChallengeMethod;
use crate::types::TokenEndpointAuthMethod;

/// Endpoint paths, relative to the issuer.
pub mod paths {
    /// Authorization endpoint.
    pub const AUTHORIZE: &str = "/authorize";
    /// Token endpoint.
    pub const TOKEN: &str = "/token";
    /// Introspection endpoint.
    pub const INTROSPECT: &str = "/introspect";
    /// Revocation endpoint.
    pub const REVOKE: &str = "/revoke";
    /// UserInfo endpoint.
    pub const USERINFO: &str = "/userinfo";
    /// Metadata document.
    pub const METADATA: &str = "/.well-known/oauth-authorization-server";
    /// OpenID Connect alias of the metadata document.
    pub const OPENID_CONFIGURATION: &str = "/.well-known/openid-configuration";
}

/// Authorization server metadata document.
///
/// # Example Response
///
/// ```json
/// {
///   "issuer": "https://auth.example.com",
///   "authorization_endpoint": "https://auth.example.com/authorize",
///   "token_endpoint": "https://auth.example.com/token",
///   "grant_types_supported": ["authorization_code", "refresh_token"],
///   "code_challenge_methods_supported": ["S256"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerMetadata {
    /// Issuer identifier. Matches the `iss` claim of access tokens.
    pub issuer: String,

    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub introspection_endpoint: String,
    pub revocation_endpoint: String,
    pub userinfo_endpoint: String,

    /// Published only when keys are served elsewhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,

    pub scopes_supported: Vec<String>,
    pub response_types_supported: Vec<String>,
    pub response_modes_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub introspection_endpoint_auth_methods_supported: Vec<String>,
    pub revocation_endpoint_auth_methods_supported: Vec<String>,
    pub code_challenge_methods_supported: Vec<String>,
    pub access_token_signing_alg_values_supported: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_documentation: Option<String>,
}

impl ServerMetadata {
    /// Builds the metadata document from configuration.
    #[must_use]
    pub fn build(config: &AuthConfig) -> Self {
        let base = config.issuer_base();
        let endpoint = |path: &str| format!("{base}{path}");

        let secret_methods = [
            TokenEndpointAuthMethod::ClientSecretBasic,
            TokenEndpointAuthMethod::ClientSecretPost,
        ];
        let to_strings = |methods: &[TokenEndpointAuthMethod]| {
            methods.iter().map(|m| m.as_str().to_string()).collect::<Vec<_>>()
        };
        let mut with_public = secret_methods.to_vec();
        with_public.push(TokenEndpointAuthMethod::None);

        let mut challenge_methods = vec![PkceChallengeMethod::S256.as_str().to_string()];
        if config.oauth.allow_plain_pkce {
            challenge_methods.push(PkceChallengeMethod::Plain.as_str().to_string());
        }

        Self {
            issuer: config.issuer.clone(),
            authorization_endpoint: endpoint(paths::AUTHORIZE),
            token_endpoint: endpoint(paths::TOKEN),
            introspection_endpoint: endpoint(paths::INTROSPECT),
            revocation_endpoint: endpoint(paths::REVOKE),
            userinfo_endpoint: endpoint(paths::USERINFO),
            jwks_uri: config.discovery.jwks_uri.clone(),
            scopes_supported: config.oauth.scopes_supported.clone(),
            response_types_supported: vec!["code".to_string()],
            response_modes_supported: vec!["query".to_string()],
            grant_types_supported: config
                .oauth
                .enabled_grant_types()
                .iter()
                .map(|g| g.as_str().to_string())
                .collect(),
            token_endpoint_auth_methods_supported: to_strings(&with_public),
            introspection_endpoint_auth_methods_supported: to_strings(&secret_methods),
            revocation_endpoint_auth_methods_supported: to_strings(&with_public),
            code_challenge_methods_supported: challenge_methods,
            access_token_signing_alg_values_supported: vec![config.signing.algorithm.clone()],
            service_documentation: config.discovery.service_documentation.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        let mut config = AuthConfig::default();
        config.issuer = "https://auth.example.com/".to_string();
        config
    }

    #[test]
    fn test_endpoints_join_issuer() {
        let metadata = ServerMetadata::build(&config());
        assert_eq!(metadata.issuer, "https://auth.example.com/");
        assert_eq!(metadata.token_endpoint, "https://auth.example.com/token");
        assert_eq!(metadata.userinfo_endpoint, "https://auth.example.com/userinfo");
        assert_eq!(metadata.response_types_supported, vec!["code"]);
    }

    #[test]
    fn test_grants_follow_configuration() {
        let mut config = config();
        config.oauth.grant_types = vec!["client_credentials".to_string()];
        let metadata = ServerMetadata::build(&config);
        assert_eq!(metadata.grant_types_supported, vec!["client_credentials"]);
    }

    #[test]
    fn test_plain_pkce_advertised_only_when_allowed() {
        let mut config = config();
        assert_eq!(
            ServerMetadata::build(&config).code_challenge_methods_supported,
            vec!["S256"]
        );
        config.oauth.allow_plain_pkce = true;
        assert_eq!(
            ServerMetadata::build(&config).code_challenge_methods_supported,
            vec!["S256", "plain"]
        );
    }

    #[test]
    fn test_optional_fields_omitted() {
        let json = serde_json::to_value(ServerMetadata::build(&config())).unwrap();
        assert!(json.get("jwks_uri").is_none());
        assert!(json.get("service_documentation").is_none());
        assert_eq!(
            json["introspection_endpoint_auth_methods_supported"],
            serde_json::json!(["client_secret_basic", "client_secret_post"])
        );
    }
}
