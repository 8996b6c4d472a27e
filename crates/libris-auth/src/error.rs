//! Authorization server error types.
//!
//! [`AuthError`] is the single error type returned by every operation in this
//! crate. Each variant maps onto an RFC 6749 §5.2 error code (or the RFC 6750
//! bearer codes for the userinfo surface) through
//! [`AuthError::oauth_error_code`].

use std::fmt;

/// Errors that can occur while handling OAuth 2.0 requests.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request is missing a parameter, repeats one, or is otherwise malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of what is wrong with the request.
        message: String,
    },

    /// Client authentication failed (unknown client, bad secret, wrong method).
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why authentication failed.
        message: String,
    },

    /// The authorization code or refresh token is invalid, expired, revoked,
    /// or was issued to another client.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The client is not allowed to use the requested flow.
    #[error("Unauthorized client: {message}")]
    UnauthorizedClient {
        /// Description of why the client is not authorized.
        message: String,
    },

    /// The grant type is not supported by the server or by the client.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The grant type that was requested.
        grant_type: String,
    },

    /// The response type is not supported.
    #[error("Unsupported response type: {response_type}")]
    UnsupportedResponseType {
        /// The response type that was requested.
        response_type: String,
    },

    /// The requested scope is invalid or exceeds what the client may request.
    #[error("Invalid scope: {message}")]
    InvalidScope {
        /// Description of why the scope is invalid.
        message: String,
    },

    /// A bearer token is missing, malformed, expired, or revoked.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// A bearer token is valid but lacks the scope needed for the resource.
    #[error("Insufficient scope: {message}")]
    InsufficientScope {
        /// Description of the missing scope.
        message: String,
    },

    /// The resource owner or the server denied the request.
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Description of why access was denied.
        message: String,
    },

    /// The persistence port failed or timed out.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// Configuration is invalid or incomplete.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// An unexpected internal failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal failure.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `UnauthorizedClient` error.
    #[must_use]
    pub fn unauthorized_client(message: impl Into<String>) -> Self {
        Self::UnauthorizedClient {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `UnsupportedResponseType` error.
    #[must_use]
    pub fn unsupported_response_type(response_type: impl Into<String>) -> Self {
        Self::UnsupportedResponseType {
            response_type: response_type.into(),
        }
    }

    /// Creates a new `InvalidScope` error.
    #[must_use]
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::InvalidScope {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `InsufficientScope` error.
    #[must_use]
    pub fn insufficient_scope(message: impl Into<String>) -> Self {
        Self::InsufficientScope {
            message: message.into(),
        }
    }

    /// Creates a new `AccessDenied` error.
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this error was caused by the client's request.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.category() == ErrorCategory::Client
    }

    /// Returns `true` if this error was caused by the server.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.category() == ErrorCategory::Server
    }

    /// Returns `true` for the bearer-token errors of RFC 6750.
    #[must_use]
    pub fn is_bearer_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken { .. } | Self::InsufficientScope { .. }
        )
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. } => {
                ErrorCategory::Server
            }
            _ => ErrorCategory::Client,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::UnauthorizedClient { .. } => "unauthorized_client",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::UnsupportedResponseType { .. } => "unsupported_response_type",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::InvalidToken { .. } => "invalid_token",
            Self::InsufficientScope { .. } => "insufficient_scope",
            Self::AccessDenied { .. } => "access_denied",
            Self::Storage { .. } => "server_error",
            Self::Configuration { .. } => "server_error",
            Self::Internal { .. } => "server_error",
        }
    }

    /// Returns the description that may be shown to the client.
    ///
    /// Server-side failures never leak their internal message.
    #[must_use]
    pub fn public_description(&self) -> String {
        match self {
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. } => {
                "The authorization server encountered an unexpected condition".to_string()
            }
            Self::InvalidRequest { message }
            | Self::InvalidClient { message }
            | Self::InvalidGrant { message }
            | Self::UnauthorizedClient { message }
            | Self::InvalidScope { message }
            | Self::InvalidToken { message }
            | Self::InsufficientScope { message }
            | Self::AccessDenied { message } => message.clone(),
            Self::UnsupportedGrantType { grant_type } => {
                format!("Grant type '{grant_type}' is not supported")
            }
            Self::UnsupportedResponseType { response_type } => {
                format!("Response type '{response_type}' is not supported")
            }
        }
    }
}

/// Broad classification of errors for logging and status code selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The client sent something the server refuses.
    Client,
    /// The server failed to process a valid request.
    Server,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Server => write!(f, "server"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_grant("Authorization code has expired");
        assert_eq!(err.to_string(), "Invalid grant: Authorization code has expired");

        let err = AuthError::unsupported_grant_type("password");
        assert_eq!(err.to_string(), "Unsupported grant type: password");
    }

    #[test]
    fn test_oauth_error_codes() {
        assert_eq!(AuthError::invalid_client("x").oauth_error_code(), "invalid_client");
        assert_eq!(AuthError::invalid_grant("x").oauth_error_code(), "invalid_grant");
        assert_eq!(
            AuthError::unauthorized_client("x").oauth_error_code(),
            "unauthorized_client"
        );
        assert_eq!(
            AuthError::unsupported_grant_type("x").oauth_error_code(),
            "unsupported_grant_type"
        );
        assert_eq!(AuthError::invalid_scope("x").oauth_error_code(), "invalid_scope");
        assert_eq!(AuthError::insufficient_scope("x").oauth_error_code(), "insufficient_scope");
    }

    #[test]
    fn test_server_errors_map_to_server_error() {
        for err in [
            AuthError::storage("connection reset"),
            AuthError::configuration("missing issuer"),
            AuthError::internal("boom"),
        ] {
            assert_eq!(err.oauth_error_code(), "server_error");
            assert!(err.is_server_error());
            assert!(!err.is_client_error());
        }
    }

    #[test]
    fn test_public_description_hides_internal_details() {
        let err = AuthError::storage("postgres://admin:hunter2@db timed out");
        assert!(!err.public_description().contains("hunter2"));

        let err = AuthError::invalid_scope("Scope 'admin' is not permitted");
        assert_eq!(err.public_description(), "Scope 'admin' is not permitted");
    }

    #[test]
    fn test_predicates() {
        assert!(AuthError::invalid_token("expired").is_bearer_error());
        assert!(AuthError::insufficient_scope("openid").is_bearer_error());
        assert!(!AuthError::invalid_grant("x").is_bearer_error());
        assert_eq!(AuthError::invalid_request("x").category(), ErrorCategory::Client);
        assert_eq!(ErrorCategory::Server.to_string(), "server");
    }
}
