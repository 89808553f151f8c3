//! Bearer token extraction from the `Authorization` header.
//!
//! No decoding happens here; the token is returned exactly as sent.

use crate::errors::AuthError;
use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Authentication scheme expected in the `Authorization` header.
pub const BEARER_SCHEME: &str = "Bearer";

/// Extract the bearer token from a raw header value.
///
/// # Errors
///
/// - `MissingHeader` if the header is absent.
/// - `MalformedHeader` if the value is not exactly `<scheme> <token>`, the
///   scheme is not `Bearer` (case-insensitive), or the token is empty.
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or_else(|| {
        tracing::debug!(target: "drinks.auth.extractor", "Missing Authorization header");
        AuthError::MissingHeader
    })?;

    let mut parts = header.split(' ');
    let (scheme, token) = match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) => (scheme, token),
        _ => {
            tracing::debug!(target: "drinks.auth.extractor", "Authorization header is not two space-separated parts");
            return Err(AuthError::MalformedHeader(
                "Authorization header must be in the format 'Bearer <token>'".to_string(),
            ));
        }
    };

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        tracing::debug!(target: "drinks.auth.extractor", "Authorization header uses a non-Bearer scheme");
        return Err(AuthError::MalformedHeader(
            "Authorization header must start with 'Bearer'".to_string(),
        ));
    }

    if token.is_empty() {
        return Err(AuthError::MalformedHeader(
            "Bearer token is required".to_string(),
        ));
    }

    Ok(token)
}

/// Extract the bearer token from request headers.
///
/// A header value that is not visible ASCII is treated as malformed.
pub fn bearer_token_from_headers(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = match headers.get(AUTHORIZATION) {
        None => None,
        Some(value) => Some(value.to_str().map_err(|_| {
            AuthError::MalformedHeader("Authorization header is not valid text".to_string())
        })?),
    };

    extract_bearer_token(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extracts_token_unchanged() {
        let token = extract_bearer_token(Some("Bearer abc.def.ghi")).unwrap();
        assert_eq!(token, "abc.def.ghi");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        assert_eq!(extract_bearer_token(Some("bearer tok")).unwrap(), "tok");
        assert_eq!(extract_bearer_token(Some("BEARER tok")).unwrap(), "tok");
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(extract_bearer_token(None), Err(AuthError::MissingHeader));
    }

    #[test]
    fn test_wrong_scheme_is_malformed() {
        let err = extract_bearer_token(Some("Token abc")).unwrap_err();
        assert!(matches!(err, AuthError::MalformedHeader(_)));

        let err = extract_bearer_token(Some("Basic dXNlcjpwYXNz")).unwrap_err();
        assert!(matches!(err, AuthError::MalformedHeader(_)));
    }

    #[test]
    fn test_wrong_part_count_is_malformed() {
        for value in ["Bearer", "", "Bearer a b", "Bearer  abc", "abc"] {
            let err = extract_bearer_token(Some(value)).unwrap_err();
            assert!(
                matches!(err, AuthError::MalformedHeader(_)),
                "{:?} should be malformed, got {:?}",
                value,
                err
            );
        }
    }

    #[test]
    fn test_empty_token_is_malformed() {
        let err = extract_bearer_token(Some("Bearer ")).unwrap_err();
        assert_eq!(
            err,
            AuthError::MalformedHeader("Bearer token is required".to_string())
        );
    }

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            bearer_token_from_headers(&headers),
            Err(AuthError::MissingHeader)
        );

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(bearer_token_from_headers(&headers).unwrap(), "xyz");
    }

    #[test]
    fn test_from_headers_rejects_non_text_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap(),
        );

        assert!(matches!(
            bearer_token_from_headers(&headers),
            Err(AuthError::MalformedHeader(_))
        ));
    }
}
