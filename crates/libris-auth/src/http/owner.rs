//! Resource owner identification at the authorization endpoint.
//!
//! Logging users in is not part of the authorization server. Whatever sits
//! in front of it (a session layer, a reverse proxy) tells the server who the
//! resource owner is through a [`ResourceOwnerResolver`].

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName, header::InvalidHeaderName};

/// Identifies the authenticated resource owner of a request.
#[async_trait]
pub trait ResourceOwnerResolver: Send + Sync {
    /// Returns the subject identifier, or `None` if nobody is signed in.
    async fn resolve(&self, headers: &HeaderMap) -> Option<String>;
}

/// Reads the subject from a header set by a trusted upstream proxy.
///
/// The proxy must strip this header from inbound client requests.
#[derive(Debug, Clone)]
pub struct HeaderResourceOwner {
    header: HeaderName,
}

impl HeaderResourceOwner {
    /// Default header name.
    pub const DEFAULT_HEADER: &'static str = "x-authenticated-user";

    /// Creates a resolver reading `header`.
    ///
    /// # Errors
    ///
    /// Returns an error if `header` is not a valid header name.
    pub fn new(header: &str) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            header: HeaderName::try_from(header)?,
        })
    }
}

#[async_trait]
impl ResourceOwnerResolver for HeaderResourceOwner {
    async fn resolve(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_header_resolver() {
        let resolver = HeaderResourceOwner::new(HeaderResourceOwner::DEFAULT_HEADER).unwrap();

        let mut headers = HeaderMap::new();
        assert_eq!(resolver.resolve(&headers).await, None);

        headers.insert("x-authenticated-user", "reader-42".parse().unwrap());
        assert_eq!(resolver.resolve(&headers).await.as_deref(), Some("reader-42"));

        headers.insert("x-authenticated-user", "  ".parse().unwrap());
        assert_eq!(resolver.resolve(&headers).await, None);
    }

    #[test]
    fn test_invalid_header_name() {
        assert!(HeaderResourceOwner::new("not a header").is_err());
    }
}
