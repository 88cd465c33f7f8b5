//! Response Shaper (spec §4.6). Header-map mutation in the style of the
//! teacher's `proxy::handler::apply_header_transforms`.

use http::{HeaderMap, HeaderName, HeaderValue};

static ACCESS_CONTROL_ALLOW_ORIGIN: HeaderName = HeaderName::from_static("access-control-allow-origin");
static ACCESS_CONTROL_ALLOW_METHODS: HeaderName =
    HeaderName::from_static("access-control-allow-methods");
static ACCESS_CONTROL_ALLOW_HEADERS: HeaderName =
    HeaderName::from_static("access-control-allow-headers");
static X_CONTENT_TYPE_OPTIONS: HeaderName = HeaderName::from_static("x-content-type-options");
static CONTENT_SECURITY_POLICY: HeaderName = HeaderName::from_static("content-security-policy");

/// Enforce the CORS + security headers on an outbound `HeaderMap`,
/// preserving whatever unrelated entries are already present (e.g. headers
/// passed through from the winning upstream response).
///
/// `apply_cache_control` should be `true` only for a successful DoH
/// response body (spec §4.6: "on a successful DoH response").
pub fn shape_headers(headers: &mut HeaderMap, apply_cache_control: bool) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN.clone(), HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS.clone(),
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS.clone(),
        HeaderValue::from_static("Content-Type, Accept"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS.clone(), HeaderValue::from_static("nosniff"));

    if !headers.contains_key(&CONTENT_SECURITY_POLICY) {
        headers.insert(
            CONTENT_SECURITY_POLICY.clone(),
            HeaderValue::from_static("default-src 'none'"),
        );
    }

    if apply_cache_control && !headers.contains_key(http::header::CACHE_CONTROL) {
        headers.insert(
            http::header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=60, s-maxage=300"),
        );
    }
}

/// Headers for the `OPTIONS` CORS preflight response (spec §4.4/§4.6):
/// 204, the CORS/security headers, and an explicit `content-length: 0`.
pub fn preflight_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    shape_headers(&mut headers, false);
    headers.insert(http::header::CONTENT_LENGTH, HeaderValue::from_static("0"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enforces_cors_and_security_headers() {
        let mut h = HeaderMap::new();
        shape_headers(&mut h, true);
        assert_eq!(h.get(&ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(h.get(&ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "GET, POST, OPTIONS");
        assert_eq!(h.get(&ACCESS_CONTROL_ALLOW_HEADERS).unwrap(), "Content-Type, Accept");
        assert_eq!(h.get(&X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(h.get(&CONTENT_SECURITY_POLICY).unwrap(), "default-src 'none'");
        assert_eq!(
            h.get(http::header::CACHE_CONTROL).unwrap(),
            "public, max-age=60, s-maxage=300"
        );
    }

    #[test]
    fn preserves_existing_csp_and_cache_control() {
        let mut h = HeaderMap::new();
        h.insert(
            CONTENT_SECURITY_POLICY.clone(),
            HeaderValue::from_static("default-src 'self'"),
        );
        h.insert(
            http::header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        );
        shape_headers(&mut h, true);
        assert_eq!(h.get(&CONTENT_SECURITY_POLICY).unwrap(), "default-src 'self'");
        assert_eq!(h.get(http::header::CACHE_CONTROL).unwrap(), "no-store");
    }

    #[test]
    fn cache_control_skipped_when_not_successful() {
        let mut h = HeaderMap::new();
        shape_headers(&mut h, false);
        assert!(h.get(http::header::CACHE_CONTROL).is_none());
    }

    #[test]
    fn preflight_has_zero_content_length() {
        let h = preflight_headers();
        assert_eq!(h.get(http::header::CONTENT_LENGTH).unwrap(), "0");
    }
}
