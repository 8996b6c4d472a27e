//! OAuth 2.0 protocol building blocks.
//!
//! - [`pkce`] - Proof Key for Code Exchange (RFC 7636)
//! - [`secret`] - Client secret hashing
//! - [`client_auth`] - Client Registry and token endpoint authentication
//! - [`authorize`] / [`service`] - Authorization endpoint
//! - [`token`] - Token endpoint request and response types

pub mod authorize;
pub mod client_auth;
pub mod pkce;
pub mod secret;
pub mod service;
pub mod token;

pub use authorize::{
    AuthorizationError, AuthorizationErrorCode, AuthorizationRequest, AuthorizationResponse,
};
pub use client_auth::{AuthenticatedClient, ClientCredentials, ClientRegistry, parse_basic_auth};
pub use pkce::{PkceChallenge, PkceChallengeMethod, PkceError, PkcePolicy, PkceVerifier};
pub use service::AuthorizationService;
pub use token::{TokenError, TokenRequest, TokenResponse};
