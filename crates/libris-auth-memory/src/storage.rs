use std::collections::HashMap;

use async_trait::async_trait;
use libris_auth::AuthResult;
use libris_auth::storage::{
    ClientStorage, CodeStorage, RevocationScope, RotationOutcome, TokenStorage, UserInfoStorage,
};
use libris_auth::token::TokenTypeHint;
use libris_auth::types::{
    AccessToken, AuthorizationCode, Client, ClientValidationError, GrantRecords, RefreshToken,
    TokenRecord, UserInfo,
};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    clients: HashMap<String, Client>,
    codes: HashMap<String, AuthorizationCode>,
    /// Keyed by token hash.
    access_tokens: HashMap<String, AccessToken>,
    /// Keyed by token hash.
    refresh_tokens: HashMap<String, RefreshToken>,
    users: HashMap<String, UserInfo>,
}

impl Tables {
    fn put_grant(&mut self, grant: &GrantRecords) {
        self.access_tokens.insert(
            grant.access_token.token_hash.clone(),
            grant.access_token.clone(),
        );
        if let Some(rt) = &grant.refresh_token {
            self.refresh_tokens.insert(rt.token_hash.clone(), rt.clone());
        }
    }

    fn revoke_family(&mut self, family_id: Uuid, now: OffsetDateTime) -> u64 {
        let mut revoked = 0;
        for token in self.access_tokens.values_mut() {
            if token.family_id == Some(family_id) && token.revoked_at.is_none() {
                token.revoked_at = Some(now);
                revoked += 1;
            }
        }
        for token in self.refresh_tokens.values_mut() {
            if token.family_id == family_id && token.revoked_at.is_none() {
                token.revoked_at = Some(now);
                revoked += 1;
            }
        }
        revoked
    }

    fn revoke_single(&mut self, token_hash: &str, now: OffsetDateTime) -> u64 {
        let slot = match self.access_tokens.get_mut(token_hash) {
            Some(token) => &mut token.revoked_at,
            None => match self.refresh_tokens.get_mut(token_hash) {
                Some(token) => &mut token.revoked_at,
                None => return 0,
            },
        };
        if slot.is_some() {
            return 0;
        }
        *slot = Some(now);
        1
    }
}

/// In-memory Persistence Port backend.
///
/// All tables sit behind one lock, and every port call takes it exactly once
/// without awaiting while it is held. That makes each call a single isolated
/// step, which is what [`CodeStorage::redeem`] and
/// [`TokenStorage::rotate_refresh_token`] require.
#[derive(Debug, Default)]
pub struct InMemoryAuthStorage {
    tables: RwLock<Tables>,
}

impl InMemoryAuthStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client, replacing any client with the same ID.
    ///
    /// # Errors
    ///
    /// Returns the validation error if the client registration is inconsistent.
    pub async fn insert_client(&self, client: Client) -> Result<(), ClientValidationError> {
        client.validate()?;
        self.tables
            .write()
            .await
            .clients
            .insert(client.client_id.clone(), client);
        Ok(())
    }

    /// Stores identity claims for a resource owner, keyed by `sub`.
    pub async fn insert_user(&self, user: UserInfo) {
        self.tables
            .write()
            .await
            .users
            .insert(user.sub.clone(), user);
    }

    /// Number of stored access and refresh tokens.
    pub async fn token_count(&self) -> usize {
        let tables = self.tables.read().await;
        tables.access_tokens.len() + tables.refresh_tokens.len()
    }
}

#[async_trait]
impl ClientStorage for InMemoryAuthStorage {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self.tables.read().await.clients.get(client_id).cloned())
    }
}

#[async_trait]
impl CodeStorage for InMemoryAuthStorage {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        self.tables
            .write()
            .await
            .codes
            .insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn find_by_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        Ok(self.tables.read().await.codes.get(code).cloned())
    }

    async fn redeem(
        &self,
        code: &str,
        now: OffsetDateTime,
        grant: &GrantRecords,
    ) -> AuthResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.codes.get_mut(code) {
            Some(stored) if stored.is_redeemable(now) => {
                stored.consumed_at = Some(now);
                tables.put_grant(grant);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn discard(&self, code: &str, now: OffsetDateTime) -> AuthResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.codes.get_mut(code) {
            Some(stored) if stored.is_redeemable(now) => {
                stored.consumed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl TokenStorage for InMemoryAuthStorage {
    async fn store_grant(&self, grant: &GrantRecords) -> AuthResult<()> {
        self.tables.write().await.put_grant(grant);
        Ok(())
    }

    async fn load_token_info(
        &self,
        token_hash: &str,
        hint: Option<TokenTypeHint>,
    ) -> AuthResult<Option<TokenRecord>> {
        let tables = self.tables.read().await;
        let access = || {
            tables
                .access_tokens
                .get(token_hash)
                .cloned()
                .map(TokenRecord::Access)
        };
        let refresh = || {
            tables
                .refresh_tokens
                .get(token_hash)
                .cloned()
                .map(TokenRecord::Refresh)
        };
        Ok(match hint {
            Some(TokenTypeHint::RefreshToken) => refresh().or_else(access),
            _ => access().or_else(refresh),
        })
    }

    async fn rotate_refresh_token(
        &self,
        presented_hash: &str,
        now: OffsetDateTime,
        grant: &GrantRecords,
    ) -> AuthResult<RotationOutcome> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.refresh_tokens.get_mut(presented_hash) else {
            return Ok(RotationOutcome::Rejected);
        };

        if current.is_revoked() {
            let family_id = current.family_id;
            let revoked = tables.revoke_family(family_id, now);
            tracing::debug!(%family_id, revoked, "Family revoked on rotation replay");
            return Ok(RotationOutcome::Replayed { family_id });
        }
        if current.is_expired(now) {
            return Ok(RotationOutcome::Rejected);
        }

        current.revoked_at = Some(now);
        tables.put_grant(grant);
        Ok(RotationOutcome::Rotated)
    }

    async fn revoke(&self, scope: RevocationScope, now: OffsetDateTime) -> AuthResult<u64> {
        let mut tables = self.tables.write().await;
        Ok(match scope {
            RevocationScope::Token { token_hash } => tables.revoke_single(&token_hash, now),
            RevocationScope::Family { family_id } => tables.revoke_family(family_id, now),
        })
    }
}

#[async_trait]
impl UserInfoStorage for InMemoryAuthStorage {
    async fn load_user_info(&self, subject: &str) -> AuthResult<Option<UserInfo>> {
        Ok(self.tables.read().await.users.get(subject).cloned())
    }
}
