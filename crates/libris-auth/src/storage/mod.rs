//! Persistence Port.
//!
//! These traits are the only way the authorization server touches state.
//! They expose single-key atomic operations instead of generic reads and
//! writes so that any backing store can uphold the concurrency invariants:
//!
//! - [`CodeStorage::redeem`] consumes a code and records the resulting grant
//!   in one compare-and-set, so two concurrent redemptions yield exactly one
//!   success.
//! - [`TokenStorage::rotate_refresh_token`] swaps the current refresh token of
//!   a family in one compare-and-set, so a replayed token is detected.
//! - [`TokenStorage::revoke`] is idempotent and monotonic.
//!
//! # Implementations
//!
//! - `libris-auth-memory` - in-process backend, also used as the test double

pub mod client;
pub mod code;
pub mod token;
pub mod user;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use client::ClientStorage;
pub use code::CodeStorage;
pub use token::{RevocationScope, RotationOutcome, TokenStorage};
pub use user::UserInfoStorage;

use crate::AuthResult;
use crate::error::AuthError;

/// The ports the authorization server is wired with.
#[derive(Clone)]
pub struct StoragePorts {
    pub clients: Arc<dyn ClientStorage>,
    pub codes: Arc<dyn CodeStorage>,
    pub tokens: Arc<dyn TokenStorage>,
    pub users: Arc<dyn UserInfoStorage>,
}

impl StoragePorts {
    /// Uses one backend for every port.
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: ClientStorage + CodeStorage + TokenStorage + UserInfoStorage + 'static,
    {
        Self {
            clients: backend.clone(),
            codes: backend.clone(),
            tokens: backend.clone(),
            users: backend,
        }
    }
}

/// Runs a persistence call with an upper time bound.
///
/// An elapsed timeout is reported as [`AuthError::Storage`] so it surfaces as
/// `server_error`. Dropping the inner future must not leave a partial write,
/// which every port implementation guarantees by making each call atomic.
pub async fn with_timeout<T, F>(limit: Duration, operation: &'static str, fut: F) -> AuthResult<T>
where
    F: Future<Output = AuthResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(operation, timeout_ms = limit.as_millis() as u64, "Storage call timed out");
            Err(AuthError::storage(format!("{operation} timed out")))
        }
    }
}
