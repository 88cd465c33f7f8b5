//! Region Resolver (spec §4.3): derives an advisory Region Key from request
//! headers. Written in the style of the teacher's
//! `proxy::handler::inject_forwarded_headers` header-chain inspection, but
//! reading instead of writing.

use http::HeaderMap;

const HEADER_PRIORITY: &[&str] = &["x-vercel-ip-country", "cf-ipcountry", "x-vercel-id"];
const FALLBACK_REGION: &str = "GLOBAL";

/// Derive the Region Key, uppercased, in header-priority order. Never
/// returns empty — falls back to `GLOBAL`.
pub fn region_of(headers: &HeaderMap) -> String {
    for name in HEADER_PRIORITY {
        if let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return trimmed.to_ascii_uppercase();
            }
        }
    }
    FALLBACK_REGION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.insert(
                http::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        h
    }

    #[test]
    fn no_headers_falls_back_to_global() {
        assert_eq!(region_of(&headers(&[])), "GLOBAL");
    }

    #[test]
    fn prefers_vercel_ip_country_first() {
        let h = headers(&[
            ("x-vercel-ip-country", "de"),
            ("cf-ipcountry", "US"),
            ("x-vercel-id", "abc"),
        ]);
        assert_eq!(region_of(&h), "DE");
    }

    #[test]
    fn falls_back_to_cf_ipcountry() {
        let h = headers(&[("cf-ipcountry", "us"), ("x-vercel-id", "abc")]);
        assert_eq!(region_of(&h), "US");
    }

    #[test]
    fn falls_back_to_vercel_id() {
        let h = headers(&[("x-vercel-id", "sfo1::abcde")]);
        assert_eq!(region_of(&h), "SFO1::ABCDE");
    }

    #[test]
    fn blank_header_value_is_skipped() {
        let h = headers(&[("x-vercel-ip-country", "   "), ("cf-ipcountry", "de")]);
        assert_eq!(region_of(&h), "DE");
    }
}
