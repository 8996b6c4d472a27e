//! Client credential extraction from token-endpoint style requests.

use axum::http::{HeaderMap, header::AUTHORIZATION};

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::client_auth::{ClientCredentials, parse_basic_auth};

/// Collects the credentials a request presents.
///
/// HTTP Basic takes priority over `client_id`/`client_secret` form fields.
/// Authorization schemes other than Basic are ignored. Empty form values
/// count as absent.
///
/// # Errors
///
/// - `invalid_client` if a Basic header is present but malformed
/// - `invalid_request` if the header and the form disagree
pub(crate) fn extract_credentials(
    headers: &HeaderMap,
    client_id: Option<&str>,
    client_secret: Option<&str>,
) -> AuthResult<ClientCredentials> {
    let basic = match headers.get(AUTHORIZATION).map(|v| v.to_str()) {
        Some(Ok(value)) if value.trim_start().starts_with("Basic ") => Some(
            parse_basic_auth(value)
                .ok_or_else(|| AuthError::invalid_client("Malformed Basic authorization header"))?,
        ),
        Some(Err(_)) => {
            return Err(AuthError::invalid_client("Malformed authorization header"));
        }
        _ => None,
    };

    fn non_empty(v: Option<&str>) -> Option<&str> {
        v.filter(|s| !s.is_empty())
    }
    ClientCredentials::resolve(basic, non_empty(client_id), non_empty(client_secret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    fn basic(id: &str, secret: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", STANDARD.encode(format!("{id}:{secret}")));
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
        headers
    }

    #[test]
    fn test_basic_header_wins() {
        let creds = extract_credentials(&basic("svc", "s3cret"), None, None).unwrap();
        assert!(matches!(creds, ClientCredentials::Basic { .. }));
        assert_eq!(creds.client_id(), Some("svc"));
    }

    #[test]
    fn test_form_fields() {
        let headers = HeaderMap::new();
        let creds = extract_credentials(&headers, Some("svc"), Some("s3cret")).unwrap();
        assert!(matches!(creds, ClientCredentials::Post { .. }));

        let creds = extract_credentials(&headers, Some("c1"), Some("")).unwrap();
        assert!(matches!(creds, ClientCredentials::Public { .. }));

        let creds = extract_credentials(&headers, None, None).unwrap();
        assert!(matches!(creds, ClientCredentials::Missing));
    }

    #[test]
    fn test_malformed_basic_is_invalid_client() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        let result = extract_credentials(&headers, None, None);
        assert!(matches!(result, Err(AuthError::InvalidClient { .. })));
    }

    #[test]
    fn test_bearer_scheme_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        let creds = extract_credentials(&headers, Some("c1"), None).unwrap();
        assert!(matches!(creds, ClientCredentials::Public { .. }));
    }

    #[test]
    fn test_empty_form_fields_alongside_basic() {
        let creds = extract_credentials(&basic("svc", "s3cret"), Some(""), Some("")).unwrap();
        assert!(matches!(creds, ClientCredentials::Basic { .. }));
        assert_eq!(creds.client_id(), Some("svc"));
    }

    #[test]
    fn test_mismatched_client_id() {
        let result = extract_credentials(&basic("svc", "s3cret"), Some("other"), None);
        assert!(matches!(result, Err(AuthError::InvalidRequest { .. })));
    }
}
