//! Client secret generation and verification.
//!
//! Secrets are 256-bit random values. Only their Argon2id PHC hash is stored
//! in a [`Client`](crate::types::Client) registration.
//!
//! # Example
//!
//! ```
//! use libris_auth::oauth::secret::{generate_client_secret, hash_client_secret, verify_client_secret};
//!
//! let secret = generate_client_secret();
//! let hash = hash_client_secret(&secret).unwrap();
//! assert!(verify_client_secret(&secret, &hash).unwrap());
//! ```

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;

/// Hash verified when a client ID is unknown, so the miss costs the same
/// time as a wrong secret.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_client_secret("libris-unknown-client").ok());

/// Generate a new client secret (64 hex characters).
#[must_use]
pub fn generate_client_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

/// Hash a client secret for storage using Argon2id.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails.
pub fn hash_client_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(secret.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a client secret against a stored Argon2 hash.
///
/// The digest comparison inside `password_hash` is constant-time.
///
/// # Returns
///
/// `Ok(true)` on match, `Ok(false)` on mismatch.
///
/// # Errors
///
/// Returns `Err` only if the stored hash is not a valid PHC string.
pub fn verify_client_secret(secret: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}

/// Burn one verification against a fixed hash. The result is discarded.
pub fn verify_dummy(secret: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_client_secret(secret, hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secret_format() {
        let secret = generate_client_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(secret, generate_client_secret());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_client_secret("s3cret").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_client_secret("s3cret", &hash).unwrap());
        assert!(!verify_client_secret("s3cret!", &hash).unwrap());
    }

    #[test]
    fn test_same_secret_different_salts() {
        let a = hash_client_secret("s3cret").unwrap();
        let b = hash_client_secret("s3cret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(verify_client_secret("s3cret", "not-a-phc-string").is_err());
    }
}
