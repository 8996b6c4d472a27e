//! Authorization code storage.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::types::{AuthorizationCode, GrantRecords};

/// Storage for single-use authorization codes.
#[async_trait]
pub trait CodeStorage: Send + Sync {
    /// Persists a freshly issued authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code already exists or the storage operation fails.
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()>;

    /// Finds an authorization code by value, whatever its state.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;

    /// Consumes a code and records the tokens issued for it.
    ///
    /// # Returns
    ///
    /// `true` if the code was redeemable at `now` and is now consumed with the
    /// grant recorded. `false` if the code is unknown, already consumed, or
    /// expired. Nothing is written in that case.
    ///
    /// # Atomicity
    ///
    /// Marking the code consumed and writing `grant` form one isolated step:
    /// either both happen or neither does. Two concurrent calls for the same
    /// code return `true` at most once. A relational backend would run, in one
    /// transaction:
    ///
    /// ```sql
    /// UPDATE authorization_codes
    /// SET consumed_at = $2
    /// WHERE code = $1 AND consumed_at IS NULL AND expires_at > $2;
    /// -- if one row was updated:
    /// INSERT INTO access_tokens ...; INSERT INTO refresh_tokens ...;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn redeem(
        &self,
        code: &str,
        now: OffsetDateTime,
        grant: &GrantRecords,
    ) -> AuthResult<bool>;

    /// Consumes a code without issuing anything.
    ///
    /// # Returns
    ///
    /// `true` if the code was redeemable and is now consumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn discard(&self, code: &str, now: OffsetDateTime) -> AuthResult<bool>;
}
