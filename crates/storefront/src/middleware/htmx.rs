//! HTMX request detection.
//!
//! Cart and checkout handlers answer HTMX requests with fragments and plain
//! form posts with redirects, so the storefront keeps working without JS.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

/// Header HTMX sets on every request it issues.
pub const HX_REQUEST: &str = "hx-request";

/// Response header that makes HTMX fire a client-side event.
pub const HX_TRIGGER: &str = "HX-Trigger";

/// Event fired after any cart mutation so the navbar badge refreshes.
pub const CART_UPDATED_EVENT: &str = "cart-updated";

/// Whether the headers mark an HTMX request.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get(HX_REQUEST)
        .is_some_and(|value| value.as_bytes() == b"true")
}

/// Extractor that reports whether the request was issued by HTMX.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HxRequest(pub bool);

impl<S> FromRequestParts<S> for HxRequest
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(is_htmx(&parts.headers)))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_is_htmx() {
        let mut headers = HeaderMap::new();
        assert!(!is_htmx(&headers));

        headers.insert(HX_REQUEST, HeaderValue::from_static("true"));
        assert!(is_htmx(&headers));

        headers.insert(HX_REQUEST, HeaderValue::from_static("false"));
        assert!(!is_htmx(&headers));
    }
}
