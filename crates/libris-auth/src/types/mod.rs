//! Domain types for the authorization server.

pub mod client;
pub mod code;
pub mod scope;
pub mod token;
pub mod user;

pub use client::{Client, ClientType, ClientValidationError, GrantType, TokenEndpointAuthMethod};
pub use code::AuthorizationCode;
pub use scope::Scope;
pub use token::{AccessToken, GrantRecords, RefreshToken, TokenRecord, hash_token};
pub use user::{Address, UserInfo};
