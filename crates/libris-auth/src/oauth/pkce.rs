//! PKCE (Proof Key for Code Exchange), RFC 7636.
//!
//! Both transforms are implemented. `plain` is only accepted when the
//! server's [`PkcePolicy`] allows it, since it offers no protection against
//! an attacker who can read the authorization request.
//!
//! # Example
//!
//! ```
//! use libris_auth::oauth::pkce::{PkceChallenge, PkceChallengeMethod, PkcePolicy, PkceVerifier};
//!
//! let policy = PkcePolicy::default();
//! let verifier = PkceVerifier::generate();
//! let challenge = PkceChallenge::from_verifier(&verifier);
//!
//! let method = PkceChallengeMethod::parse(Some("S256"), &policy).unwrap();
//! let stored = PkceChallenge::new(challenge.as_str(), method, &policy).unwrap();
//! assert!(stored.verify(&verifier, method).is_ok());
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::OAuthConfig;

/// Maximum verifier (and plain challenge) length.
pub const MAX_VERIFIER_LENGTH: usize = 128;

/// Length of a base64url-encoded SHA-256 digest without padding.
const S256_CHALLENGE_LENGTH: usize = 43;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during PKCE operations.
#[derive(Debug, thiserror::Error)]
pub enum PkceError {
    /// Verifier length or characters are invalid.
    #[error("Invalid code_verifier: {0}")]
    InvalidVerifier(String),

    /// Challenge format is invalid for its method.
    #[error("Invalid code_challenge: {0}")]
    InvalidChallenge(String),

    /// Unknown challenge method.
    #[error("Unsupported code_challenge_method: {0}")]
    UnsupportedMethod(String),

    /// `plain` was requested but is disabled.
    #[error("code_challenge_method 'plain' is not allowed")]
    PlainNotAllowed,

    /// Verifier does not match the challenge.
    #[error("PKCE verification failed: code_verifier does not match code_challenge")]
    VerificationFailed,
}

impl PkceError {
    /// Returns the OAuth error code used at the authorization endpoint.
    ///
    /// At the token endpoint every PKCE failure is `invalid_grant`.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::VerificationFailed => "invalid_grant",
            _ => "invalid_request",
        }
    }
}

// =============================================================================
// Policy
// =============================================================================

/// Server-side PKCE rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PkcePolicy {
    /// Accept the `plain` transform.
    pub allow_plain: bool,
    /// Minimum verifier length.
    pub min_verifier_length: usize,
}

impl Default for PkcePolicy {
    fn default() -> Self {
        Self {
            allow_plain: false,
            min_verifier_length: 43,
        }
    }
}

impl From<&OAuthConfig> for PkcePolicy {
    fn from(config: &OAuthConfig) -> Self {
        Self {
            allow_plain: config.allow_plain_pkce,
            min_verifier_length: config.pkce_min_verifier_length,
        }
    }
}

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

// =============================================================================
// Challenge Method
// =============================================================================

/// PKCE code challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PkceChallengeMethod {
    /// `code_challenge = code_verifier`.
    #[serde(rename = "plain")]
    Plain,
    /// `code_challenge = BASE64URL(SHA256(ASCII(code_verifier)))`.
    #[serde(rename = "S256")]
    S256,
}

impl PkceChallengeMethod {
    /// Parses the `code_challenge_method` parameter.
    ///
    /// An absent method means `plain` (RFC 7636 §4.3), so it is subject to
    /// the same policy check.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedMethod` for unknown values and `PlainNotAllowed`
    /// when `plain` is disabled.
    pub fn parse(method: Option<&str>, policy: &PkcePolicy) -> Result<Self, PkceError> {
        let method = match method {
            None | Some("plain") => Self::Plain,
            Some("S256") => Self::S256,
            Some(other) => return Err(PkceError::UnsupportedMethod(other.to_string())),
        };
        if method == Self::Plain && !policy.allow_plain {
            return Err(PkceError::PlainNotAllowed);
        }
        Ok(method)
    }

    /// Returns the parameter value for this method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::S256 => "S256",
        }
    }

    /// Applies the transform to a verifier.
    #[must_use]
    pub fn transform(&self, verifier: &PkceVerifier) -> String {
        match self {
            Self::Plain => verifier.0.clone(),
            Self::S256 => {
                let mut hasher = Sha256::new();
                hasher.update(verifier.0.as_bytes());
                URL_SAFE_NO_PAD.encode(hasher.finalize())
            }
        }
    }
}

impl std::fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// PKCE Verifier
// =============================================================================

/// PKCE code verifier.
///
/// A string of unreserved characters `[A-Za-z0-9-._~]`, between the policy
/// minimum and 128 characters long.
#[derive(Debug, Clone)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Create a verifier from the `code_verifier` parameter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidVerifier` if the length or the characters are invalid.
    pub fn new(verifier: impl Into<String>, policy: &PkcePolicy) -> Result<Self, PkceError> {
        let verifier = verifier.into();
        let len = verifier.len();

        if len < policy.min_verifier_length || len > MAX_VERIFIER_LENGTH {
            return Err(PkceError::InvalidVerifier(format!(
                "length must be {}-{MAX_VERIFIER_LENGTH} characters, got {len}",
                policy.min_verifier_length
            )));
        }

        if !verifier.chars().all(is_unreserved) {
            return Err(PkceError::InvalidVerifier(
                "must only contain [A-Za-z0-9-._~]".to_string(),
            ));
        }

        Ok(Self(verifier))
    }

    /// Generate a cryptographically random verifier (43 characters).
    #[must_use]
    pub fn generate() -> Self {
        use rand::Rng;
        let bytes: [u8; 32] = rand::thread_rng().r#gen();
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Get the verifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// PKCE Challenge
// =============================================================================

/// PKCE code challenge as received in the authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// Create the S256 challenge for a verifier.
    #[must_use]
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        Self(PkceChallengeMethod::S256.transform(verifier))
    }

    /// Validate a challenge received from a client.
    ///
    /// # Errors
    ///
    /// Returns `InvalidChallenge` if an S256 challenge is not a 43 character
    /// base64url digest, or a plain challenge is not a valid verifier.
    pub fn new(
        challenge: &str,
        method: PkceChallengeMethod,
        policy: &PkcePolicy,
    ) -> Result<Self, PkceError> {
        match method {
            PkceChallengeMethod::S256 => {
                let decoded = URL_SAFE_NO_PAD.decode(challenge).ok();
                if challenge.len() != S256_CHALLENGE_LENGTH
                    || decoded.map(|d| d.len()) != Some(32)
                {
                    return Err(PkceError::InvalidChallenge(
                        "S256 challenge must be a base64url SHA-256 digest".to_string(),
                    ));
                }
            }
            PkceChallengeMethod::Plain => {
                PkceVerifier::new(challenge, policy)
                    .map_err(|e| PkceError::InvalidChallenge(e.to_string()))?;
            }
        }
        Ok(Self(challenge.to_string()))
    }

    /// Wrap a challenge loaded from storage (already validated).
    #[must_use]
    pub fn from_stored(challenge: impl Into<String>) -> Self {
        Self(challenge.into())
    }

    /// Verify a verifier against this challenge in constant time.
    ///
    /// # Errors
    ///
    /// Returns `VerificationFailed` on mismatch.
    pub fn verify(
        &self,
        verifier: &PkceVerifier,
        method: PkceChallengeMethod,
    ) -> Result<(), PkceError> {
        let computed = method.transform(verifier);
        if bool::from(computed.as_bytes().ct_eq(self.0.as_bytes())) {
            Ok(())
        } else {
            Err(PkceError::VerificationFailed)
        }
    }

    /// Get the challenge as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the challenge and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}
