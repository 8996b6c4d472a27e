//! Token minting, validation and lifecycle.
//!
//! - [`jwt`] signs and verifies access tokens
//! - [`issuer`] mints grants and records them through the Persistence Port
//! - [`introspection`] and [`revocation`] implement RFC 7662 and RFC 7009
//! - [`userinfo`] resolves bearer tokens into scope-filtered identity claims

pub mod introspection;
pub mod issuer;
pub mod jwt;
pub mod revocation;
pub mod userinfo;

pub use introspection::{IntrospectionRequest, IntrospectionResponse, IntrospectionService};
pub use issuer::{IssuedTokens, TokenIssuer};
pub use jwt::{AccessTokenClaims, JwtError, JwtService, SigningAlgorithm};
pub use revocation::{RevocationRequest, RevocationService, TokenTypeHint};
pub use userinfo::{UserInfoService, filter_claims};
