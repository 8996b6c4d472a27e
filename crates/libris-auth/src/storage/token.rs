//! Access and refresh token storage.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::token::revocation::TokenTypeHint;
use crate::types::{GrantRecords, TokenRecord};

/// What a revocation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationScope {
    /// The single token stored under this hash.
    Token {
        /// SHA-256 hash of the token value.
        token_hash: String,
    },
    /// Every access and refresh token of a family.
    Family {
        /// The family identifier.
        family_id: Uuid,
    },
}

/// Result of an atomic refresh token rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// The presented token was current. It is now revoked and the new grant
    /// is recorded.
    Rotated,
    /// The presented token was already revoked. The whole family has been
    /// revoked as part of the same step.
    Replayed {
        /// The family that was revoked.
        family_id: Uuid,
    },
    /// The presented token is unknown or expired. Nothing was written.
    Rejected,
}

/// Storage for issued tokens.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Records a newly issued grant.
    ///
    /// # Atomicity
    ///
    /// The access token and the optional refresh token are written together
    /// or not at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn store_grant(&self, grant: &GrantRecords) -> AuthResult<()>;

    /// Loads a token by the hash of its value.
    ///
    /// The hint only decides which kind is looked up first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn load_token_info(
        &self,
        token_hash: &str,
        hint: Option<TokenTypeHint>,
    ) -> AuthResult<Option<TokenRecord>>;

    /// Rotates a refresh token.
    ///
    /// # Atomicity
    ///
    /// In one isolated step: if the token stored under `presented_hash` is
    /// unrevoked and unexpired at `now`, revoke it and record `grant`
    /// ([`RotationOutcome::Rotated`]). If it is already revoked, revoke every
    /// token in its family ([`RotationOutcome::Replayed`]). Otherwise write
    /// nothing ([`RotationOutcome::Rejected`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn rotate_refresh_token(
        &self,
        presented_hash: &str,
        now: OffsetDateTime,
        grant: &GrantRecords,
    ) -> AuthResult<RotationOutcome>;

    /// Revokes a token or a whole family.
    ///
    /// # Returns
    ///
    /// The number of records that went from active to revoked. Revoking an
    /// already revoked or unknown token returns `0`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, scope: RevocationScope, now: OffsetDateTime) -> AuthResult<u64>;
}
