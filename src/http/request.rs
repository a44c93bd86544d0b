//! Request handling and correlation IDs.
//!
//! # Responsibilities
//! - Read `X-Correlation-ID` from the inbound request or generate one
//! - Expose it to handlers as a request extension
//! - Echo it on every response, including errors and rejections
//!
//! # Design Decisions
//! - Correlation ID assigned as early as possible for tracing
//! - Inbound IDs are passed through unchanged
//! - Generated IDs are UUID v4

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Correlation header name.
pub const X_CORRELATION_ID: &str = "x-correlation-id";

const NIL_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Correlation ID attached to a request.
///
/// Holds the exact header value so inbound IDs with non-UTF-8 bytes are
/// echoed byte for byte. The text form is lossy and only used for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(HeaderValue);

impl CorrelationId {
    pub fn new(value: HeaderValue) -> Self {
        Self(value)
    }

    pub fn from_static(id: &'static str) -> Self {
        Self(HeaderValue::from_static(id))
    }

    /// Fresh random ID.
    pub fn generate() -> Self {
        let id = Uuid::new_v4().to_string();
        Self(HeaderValue::from_str(&id).unwrap_or_else(|_| HeaderValue::from_static(NIL_ID)))
    }

    /// Take the ID from request headers, generating one if absent or empty.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(X_CORRELATION_ID)
            .filter(|v| !v.is_empty())
            .cloned()
            .map(Self)
            .unwrap_or_else(Self::generate)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn header_value(&self) -> &HeaderValue {
        &self.0
    }

    /// Set the correlation header, replacing any existing value.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(X_CORRELATION_ID, self.0.clone());
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.0.as_bytes()))
    }
}

/// Middleware that assigns and echoes the correlation ID.
pub async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = CorrelationId::from_headers(request.headers());
    correlation_id.apply(request.headers_mut());
    request.extensions_mut().insert(correlation_id.clone());

    let mut response = next.run(request).await;
    correlation_id.apply(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_existing_header() {
        let mut headers = HeaderMap::new();
        headers.insert(X_CORRELATION_ID, HeaderValue::from_static("abc-123"));
        assert_eq!(CorrelationId::from_headers(&headers).as_bytes(), b"abc-123");
    }

    #[test]
    fn test_generates_when_missing_or_empty() {
        let generated = CorrelationId::from_headers(&HeaderMap::new());
        assert!(Uuid::parse_str(&generated.to_string()).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert(X_CORRELATION_ID, HeaderValue::from_static(""));
        let generated = CorrelationId::from_headers(&headers);
        assert!(!generated.as_bytes().is_empty());
    }

    #[test]
    fn test_apply_overwrites() {
        let mut headers = HeaderMap::new();
        headers.insert(X_CORRELATION_ID, HeaderValue::from_static("upstream-value"));
        CorrelationId::from_static("gateway-value").apply(&mut headers);
        assert_eq!(headers.get_all(X_CORRELATION_ID).iter().count(), 1);
        assert_eq!(headers[X_CORRELATION_ID], "gateway-value");
    }

    #[test]
    fn test_non_utf8_value_kept_verbatim() {
        let raw = HeaderValue::from_bytes(b"trace-\xe9t\xe9").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(X_CORRELATION_ID, raw.clone());

        let correlation_id = CorrelationId::from_headers(&headers);
        assert_eq!(correlation_id.header_value(), &raw);

        let mut response_headers = HeaderMap::new();
        correlation_id.apply(&mut response_headers);
        assert_eq!(response_headers[X_CORRELATION_ID].as_bytes(), b"trace-\xe9t\xe9");
        assert_eq!(correlation_id.to_string(), "trace-\u{fffd}t\u{fffd}");
    }
}
