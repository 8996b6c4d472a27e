//! JWT access token encoding and validation.
//!
//! Access tokens are compact JWTs signed with a shared HMAC secret. The token
//! store stays authoritative for revocation, the signature lets a resource
//! server reject forged or expired tokens without a round trip.
//!
//! ## Supported Algorithms
//!
//! - **HS256**: HMAC with SHA-256 (default)
//! - **HS384**: HMAC with SHA-384
//! - **HS512**: HMAC with SHA-512

use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::AuthError;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a validation error (expired, invalid signature, etc.).
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::Expired | Self::InvalidSignature | Self::InvalidClaims { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingError { message } => {
                AuthError::internal(format!("Failed to encode access token: {message}"))
            }
            JwtError::Expired => AuthError::invalid_token("Token has expired"),
            other => AuthError::invalid_token(other.to_string()),
        }
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported signing algorithms for access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256.
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    HS512,
}

impl SigningAlgorithm {
    /// Parses an algorithm name as it appears in configuration.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "HS256" => Some(Self::HS256),
            "HS384" => Some(Self::HS384),
            "HS512" => Some(Self::HS512),
            _ => None,
        }
    }

    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::HS384 => Algorithm::HS384,
            Self::HS512 => Algorithm::HS512,
        }
    }

    /// Returns the algorithm name as used in JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Token Claims
// ============================================================================

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (resource owner, or client ID for client credentials).
    pub sub: String,

    /// Audience.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// JWT ID, equal to the stored token ID.
    pub jti: String,

    /// Space-separated scopes.
    pub scope: String,

    /// OAuth client ID.
    pub client_id: String,
}

// ============================================================================
// JWT Service
// ============================================================================

/// Service for encoding and decoding access tokens.
///
/// This service is thread-safe (`Send + Sync`) and can be shared across
/// async tasks.
pub struct JwtService {
    algorithm: SigningAlgorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: Option<String>,
}

impl JwtService {
    /// Creates a new JWT service.
    ///
    /// # Arguments
    /// * `algorithm` - HMAC algorithm used for signing
    /// * `secret` - Shared signing secret
    /// * `issuer` - The issuer claim value
    /// * `audience` - The audience claim value, if any
    #[must_use]
    pub fn new(
        algorithm: SigningAlgorithm,
        secret: &[u8],
        issuer: impl Into<String>,
        audience: Option<String>,
    ) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            audience,
        }
    }

    /// Builds the service from validated configuration.
    ///
    /// # Errors
    /// Returns `AuthError::Configuration` if the algorithm or secret is unusable.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let algorithm = SigningAlgorithm::parse(&config.signing.algorithm).ok_or_else(|| {
            AuthError::configuration(format!(
                "Unsupported signing algorithm '{}'",
                config.signing.algorithm
            ))
        })?;
        if config.signing.secret.is_empty() {
            return Err(AuthError::configuration("Signing secret is not configured"));
        }
        Ok(Self::new(
            algorithm,
            config.signing.secret.as_bytes(),
            config.issuer_base(),
            config.audience.clone(),
        ))
    }

    /// Encodes claims into a JWT string.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn encode(&self, claims: &AccessTokenClaims) -> Result<String, JwtError> {
        let mut header = Header::new(self.algorithm.to_jwt_algorithm());
        header.typ = Some("at+jwt".to_string());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Decodes and validates a JWT string (signature, issuer, audience, expiry).
    ///
    /// # Errors
    /// Returns an error if decoding or validation fails.
    pub fn decode(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        let mut validation = Validation::new(self.algorithm.to_jwt_algorithm());
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = true;
        validation.leeway = 0;
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::from)
    }

    /// Returns the signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Returns the issuer URL.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the audience, if configured.
    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        self.audience.as_deref()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn service() -> JwtService {
        JwtService::new(
            SigningAlgorithm::HS256,
            SECRET,
            "https://auth.example.com",
            None,
        )
    }

    fn claims(exp_offset: i64) -> AccessTokenClaims {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        AccessTokenClaims {
            iss: "https://auth.example.com".to_string(),
            sub: "reader-42".to_string(),
            aud: None,
            exp: now + exp_offset,
            iat: now,
            jti: uuid::Uuid::new_v4().to_string(),
            scope: "openid email".to_string(),
            client_id: "c1".to_string(),
        }
    }

    #[test]
    fn test_encode_decode() {
        let service = service();
        let claims = claims(3600);
        let token = service.encode(&claims).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(service.decode(&token).unwrap(), claims);
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = service();
        let token = service.encode(&claims(-10)).unwrap();
        assert!(matches!(service.decode(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_invalid_signature_rejected() {
        let token = service().encode(&claims(3600)).unwrap();
        let other = JwtService::new(
            SigningAlgorithm::HS256,
            b"ffffffffffffffffffffffffffffffff",
            "https://auth.example.com",
            None,
        );
        assert!(matches!(other.decode(&token), Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let token = service().encode(&claims(3600)).unwrap();
        let other = JwtService::new(SigningAlgorithm::HS256, SECRET, "https://evil.example", None);
        let err = other.decode(&token).unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_audience_enforced_when_configured() {
        let service = JwtService::new(
            SigningAlgorithm::HS384,
            SECRET,
            "https://auth.example.com",
            Some("https://catalog.example.com".to_string()),
        );
        let mut c = claims(3600);
        c.aud = Some("https://catalog.example.com".to_string());
        let token = service.encode(&c).unwrap();
        assert!(service.decode(&token).is_ok());

        c.aud = Some("https://elsewhere.example.com".to_string());
        let token = service.encode(&c).unwrap();
        assert!(service.decode(&token).is_err());
    }

    #[test]
    fn test_signing_algorithm_parse() {
        assert_eq!(SigningAlgorithm::parse("HS512"), Some(SigningAlgorithm::HS512));
        assert_eq!(SigningAlgorithm::parse("none"), None);
        assert_eq!(SigningAlgorithm::HS256.to_string(), "HS256");
    }

    #[test]
    fn test_jwt_error_maps_to_invalid_token() {
        let err: AuthError = JwtError::Expired.into();
        assert!(matches!(err, AuthError::InvalidToken { .. }));
        let err: AuthError = JwtError::encoding_error("x").into();
        assert!(err.is_server_error());
    }
}
