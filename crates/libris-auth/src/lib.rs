//! # libris-auth
//!
//! Embedded OAuth 2.0 authorization server core for Libris.
//!
//! This crate provides:
//! - Authorization code grant with mandatory PKCE
//! - Client credentials and refresh token grants, with refresh rotation and
//!   token family revocation on replay
//! - Token introspection, revocation and OpenID Connect UserInfo
//! - Authorization server metadata
//!
//! ## Overview
//!
//! Every piece of state goes through the Persistence Port in [`storage`].
//! Its traits expose atomic single-key operations so that concurrent code
//! redemption and refresh rotation are decided by the backend, never by a
//! read-then-write race in the handlers.
//!
//! ## Modules
//!
//! - [`config`] - Server configuration and validation
//! - [`types`] - Clients, codes, tokens, scopes and identity claims
//! - [`storage`] - Persistence Port traits
//! - [`oauth`] - PKCE, client authentication and the authorization endpoint
//! - [`grant`] - Grant Dispatcher and grant handlers
//! - [`token`] - Token Issuer, JWTs, introspection, revocation, UserInfo
//! - [`discovery`] - Server metadata document
//! - [`http`] - Axum handlers and router

pub mod config;
pub mod discovery;
pub mod error;
pub mod grant;
pub mod http;
pub mod oauth;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError, OAuthConfig, PkceFailurePolicy};
pub use discovery::ServerMetadata;
pub use error::{AuthError, ErrorCategory};
pub use grant::{GrantDispatcher, GrantHandler};
pub use http::{AuthState, HeaderResourceOwner, ResourceOwnerResolver, router};
pub use oauth::{ClientCredentials, ClientRegistry, PkceChallengeMethod};
pub use storage::{
    ClientStorage, CodeStorage, RevocationScope, RotationOutcome, StoragePorts, TokenStorage,
    UserInfoStorage,
};
pub use token::{JwtService, TokenIssuer, TokenTypeHint};
pub use types::{
    AccessToken, AuthorizationCode, Client, ClientType, GrantRecords, GrantType, RefreshToken,
    Scope, TokenEndpointAuthMethod, TokenRecord, UserInfo,
};

/// Type alias for authorization server results.
pub type AuthResult<T> = Result<T, AuthError>;
