//! Resource owner claim lookup.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::UserInfo;

/// Read access to resource owner identity claims.
#[async_trait]
pub trait UserInfoStorage: Send + Sync {
    /// Loads the claims of a resource owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn load_user_info(&self, subject: &str) -> AuthResult<Option<UserInfo>>;
}
