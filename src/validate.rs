//! Request Validator (spec §4.4). Error-response shape (status + plain
//! text body) follows the teacher's `proxy::context::RequestContext::
//! error_response` pattern, simplified to plain text since DoH error
//! bodies are specified as plain text rather than the teacher's JSON.

use http::StatusCode;

/// Validation failure: status code + plain-text message for the client.
#[derive(Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub status: StatusCode,
    pub message: &'static str,
}

fn err(status: StatusCode, message: &'static str) -> ValidationError {
    ValidationError { status, message }
}

/// Extract the `dns` parameter from a GET query string (`a=1&dns=xyz&b=2`).
pub fn extract_query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next()?;
        let value = parts.next().unwrap_or("");
        (key == name).then_some(value)
    })
}

/// base64url alphabet, no padding (`^[A-Za-z0-9_-]+$`). Padded values are
/// intentionally rejected (spec §9 open question: resolved as intentional,
/// matching the documented source behavior) even though RFC 8484 itself
/// permits no padding either way.
fn is_base64url_nopad(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Validate a GET request's query string, returning the raw `dns` value on
/// success. Missing or non-conforming → 400.
pub fn validate_get(query: &str) -> Result<&str, ValidationError> {
    match extract_query_param(query, "dns") {
        Some(value) if is_base64url_nopad(value) => Ok(value),
        _ => Err(err(StatusCode::BAD_REQUEST, "missing or invalid dns parameter")),
    }
}

/// Validate a POST request's `content-type` header. Present-but-wrong →
/// 415; absent → accepted (body forwarded as-is).
pub fn validate_post_content_type(content_type: Option<&str>) -> Result<(), ValidationError> {
    match content_type {
        Some(ct) if !ct.contains("application/dns-message") => Err(err(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "content-type must be application/dns-message",
        )),
        _ => Ok(()),
    }
}

/// Validate a POST request's body. Empty → 400.
pub fn validate_post_body(body: &[u8]) -> Result<(), ValidationError> {
    if body.is_empty() {
        Err(err(StatusCode::BAD_REQUEST, "empty request body"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_dns_param_accepted() {
        assert_eq!(validate_get("dns=AAAAAQABAAAAAAAAA3d3dwdleGFtcGxl"), Ok("AAAAAQABAAAAAAAAA3d3dwdleGFtcGxl"));
    }

    #[test]
    fn missing_dns_param_rejected() {
        assert!(validate_get("foo=bar").is_err());
    }

    #[test]
    fn non_base64url_dns_param_rejected() {
        assert!(validate_get("dns=!!!").is_err());
    }

    #[test]
    fn padded_base64url_rejected() {
        assert!(validate_get("dns=AAAA==").is_err());
    }

    #[test]
    fn post_content_type_absent_is_accepted() {
        assert_eq!(validate_post_content_type(None), Ok(()));
    }

    #[test]
    fn post_content_type_matching_is_accepted() {
        assert_eq!(
            validate_post_content_type(Some("application/dns-message")),
            Ok(())
        );
    }

    #[test]
    fn post_content_type_wrong_is_415() {
        let e = validate_post_content_type(Some("text/plain")).unwrap_err();
        assert_eq!(e.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn post_empty_body_is_400() {
        let e = validate_post_body(&[]).unwrap_err();
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn post_nonempty_body_is_ok() {
        assert_eq!(validate_post_body(&[1, 2, 3]), Ok(()));
    }

    #[test]
    fn extract_query_param_finds_value_among_others() {
        assert_eq!(extract_query_param("a=1&dns=xyz&b=2", "dns"), Some("xyz"));
    }
}
