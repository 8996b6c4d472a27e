//! Authorization codes.
//!
//! # Lifecycle
//!
//! 1. Created by the authorization request handler after validation
//! 2. Delivered to the client through the redirect URI
//! 3. Redeemed once at the token endpoint (consumed atomically with issuance)
//!
//! A code never outlives one token-exchange round trip. Expiry is evaluated
//! lazily against the current time, there is no sweeper in this crate.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::oauth::pkce::PkceChallengeMethod;
use crate::types::Scope;

/// A single-use authorization code bound to a PKCE challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// Opaque code value, 256 random bits in base64url.
    pub code: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// Resource owner who approved the request.
    pub subject: String,

    /// Exact redirect URI used in the authorization request.
    pub redirect_uri: String,

    /// Scopes requested and approved.
    pub scope: Scope,

    /// PKCE code challenge.
    pub code_challenge: String,

    /// PKCE challenge method.
    pub code_challenge_method: PkceChallengeMethod,

    /// When the code was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the code stops being redeemable.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the code was consumed, if ever.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub consumed_at: Option<OffsetDateTime>,
}

impl AuthorizationCode {
    /// Generates a new code value.
    #[must_use]
    pub fn generate_code() -> String {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns `true` once `now` is past the expiry.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Returns `true` if the code has been consumed.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Returns `true` if the code can still be redeemed at `now`.
    #[must_use]
    pub fn is_redeemable(&self, now: OffsetDateTime) -> bool {
        !self.is_consumed() && !self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn code(now: OffsetDateTime) -> AuthorizationCode {
        AuthorizationCode {
            code: AuthorizationCode::generate_code(),
            client_id: "c1".to_string(),
            subject: "reader-42".to_string(),
            redirect_uri: "https://app.example/cb".to_string(),
            scope: Scope::parse("openid"),
            code_challenge: "challenge".to_string(),
            code_challenge_method: PkceChallengeMethod::S256,
            created_at: now,
            expires_at: now + Duration::minutes(10),
            consumed_at: None,
        }
    }

    #[test]
    fn test_generated_codes_are_unique_and_url_safe() {
        let a = AuthorizationCode::generate_code();
        let b = AuthorizationCode::generate_code();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_redeemable_window() {
        let now = OffsetDateTime::now_utc();
        let mut c = code(now);
        assert!(c.is_redeemable(now));
        assert!(!c.is_redeemable(now + Duration::minutes(10)));

        c.consumed_at = Some(now);
        assert!(!c.is_redeemable(now));
    }
}
