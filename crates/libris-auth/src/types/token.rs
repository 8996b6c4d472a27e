//! Access and refresh token records.
//!
//! Token values are never stored. Records are keyed by the SHA-256 hash of
//! the value handed to the client, the same way a password is stored.
//!
//! Revocation is monotonic: `revoked_at` goes from `None` to `Some` once and
//! never back.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::types::Scope;

/// Hashes a token value for storage and lookup.
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Persisted access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Token identifier, also the `jti` claim.
    pub id: Uuid,

    /// SHA-256 hash of the token value.
    pub token_hash: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// Resource owner, `None` for client credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Granted scopes.
    pub scope: Scope,

    /// Refresh-token family the token was minted from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_id: Option<Uuid>,

    /// When the token was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,

    /// When the token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the token was revoked.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl AccessToken {
    /// Returns `true` if the token is unrevoked and unexpired at `now`.
    #[must_use]
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }
}

/// Persisted refresh token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Record identifier.
    pub id: Uuid,

    /// SHA-256 hash of the token value.
    pub token_hash: String,

    /// Family this token belongs to. A family is revoked as a unit.
    pub family_id: Uuid,

    /// Client the token was issued to.
    pub client_id: String,

    /// Resource owner who authorized the original grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Scopes of the original grant.
    pub scope: Scope,

    /// When the token was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,

    /// When the token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the token was revoked or rotated away.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl RefreshToken {
    /// Generates a new refresh token value.
    #[must_use]
    pub fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns `true` once `now` is past the expiry.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Returns `true` if the token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if the token is unrevoked and unexpired at `now`.
    #[must_use]
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        !self.is_revoked() && !self.is_expired(now)
    }
}

/// The records written together when tokens are issued.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantRecords {
    /// The new access token.
    pub access_token: AccessToken,
    /// The new refresh token, if one is issued.
    pub refresh_token: Option<RefreshToken>,
}

/// A stored token of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenRecord {
    /// An access token.
    Access(AccessToken),
    /// A refresh token.
    Refresh(RefreshToken),
}

impl TokenRecord {
    /// Returns `true` if the token is unrevoked and unexpired at `now`.
    #[must_use]
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        match self {
            Self::Access(t) => t.is_active(now),
            Self::Refresh(t) => t.is_active(now),
        }
    }

    /// Client the token was issued to.
    #[must_use]
    pub fn client_id(&self) -> &str {
        match self {
            Self::Access(t) => &t.client_id,
            Self::Refresh(t) => &t.client_id,
        }
    }

    /// Family of the token, if it has one.
    #[must_use]
    pub fn family_id(&self) -> Option<Uuid> {
        match self {
            Self::Access(t) => t.family_id,
            Self::Refresh(t) => Some(t.family_id),
        }
    }

    /// Storage hash of the token.
    #[must_use]
    pub fn token_hash(&self) -> &str {
        match self {
            Self::Access(t) => &t.token_hash,
            Self::Refresh(t) => &t.token_hash,
        }
    }
}
