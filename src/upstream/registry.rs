//! Upstream Registry (spec §4.1): parses and normalizes the configured
//! upstream DoH URL list. Permissive by design — malformed tokens are
//! silently normalized rather than rejected, mirroring the teacher's
//! env-override loading (`config::GatewayConfig::apply_env_overrides`),
//! which never errors on a bad override either.

const ENV_VAR: &str = "DOH_UPSTREAMS";

const DEFAULT_UPSTREAMS: &[&str] = &[
    "https://cloudflare-dns.com/dns-query",
    "https://dns.google/dns-query",
    "https://dns.quad9.net/dns-query",
    "https://doh.opendns.com/dns-query",
    "https://dns.nextdns.io/dns-query",
    "https://doh.dns.sb/dns-query",
];

/// An ordered, stably-indexed list of normalized upstream URLs.
#[derive(Debug, Clone)]
pub struct UpstreamList {
    urls: Vec<String>,
}

impl UpstreamList {
    pub fn as_slice(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.urls.get(idx).map(String::as_str)
    }
}

/// Normalize a single upstream URL: strip a trailing slash, and append
/// `/dns-query` when the URL has no query string and doesn't already end
/// in `/dns-query`. Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize_upstream(url: &str) -> String {
    let mut s = url.trim().to_string();
    while s.ends_with('/') {
        s.pop();
    }
    if !s.ends_with("/dns-query") && !s.contains('?') {
        s.push_str("/dns-query");
    }
    s
}

/// Load the Upstream List from `DOH_UPSTREAMS` (comma/whitespace/newline
/// separated). Falls back to a built-in default list when the variable is
/// absent, blank, or contains only whitespace/separators.
pub fn load_upstreams() -> UpstreamList {
    let raw = std::env::var(ENV_VAR).unwrap_or_default();
    load_upstreams_from(&raw)
}

fn load_upstreams_from(raw: &str) -> UpstreamList {
    let urls: Vec<String> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(normalize_upstream)
        .collect();

    if urls.is_empty() {
        UpstreamList {
            urls: DEFAULT_UPSTREAMS.iter().map(|s| s.to_string()).collect(),
        }
    } else {
        UpstreamList { urls }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_env_falls_back_to_default() {
        let list = load_upstreams_from("");
        assert_eq!(list.len(), DEFAULT_UPSTREAMS.len());
    }

    #[test]
    fn blank_env_falls_back_to_default() {
        let list = load_upstreams_from("   \n\t  ");
        assert_eq!(list.len(), DEFAULT_UPSTREAMS.len());
    }

    #[test]
    fn bare_host_gets_dns_query_suffix() {
        assert_eq!(
            normalize_upstream("https://x.example"),
            "https://x.example/dns-query"
        );
    }

    #[test]
    fn trailing_slash_stripped() {
        assert_eq!(
            normalize_upstream("https://x.example/dns-query/"),
            "https://x.example/dns-query"
        );
    }

    #[test]
    fn query_string_passed_through_unchanged() {
        assert_eq!(
            normalize_upstream("https://x.example/custom?foo=1"),
            "https://x.example/custom?foo=1"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let inputs = [
            "https://x.example",
            "https://x.example/",
            "https://x.example/dns-query/",
            "https://x.example/custom?foo=1",
        ];
        for i in inputs {
            let once = normalize_upstream(i);
            let twice = normalize_upstream(&once);
            assert_eq!(once, twice, "not idempotent for {i}");
        }
    }

    #[test]
    fn splits_on_commas_newlines_and_whitespace() {
        let list = load_upstreams_from("https://a.example , https://b.example\nhttps://c.example");
        assert_eq!(
            list.as_slice(),
            &[
                "https://a.example/dns-query".to_string(),
                "https://b.example/dns-query".to_string(),
                "https://c.example/dns-query".to_string(),
            ]
        );
    }

    #[test]
    fn stable_indexing_preserves_order() {
        let list = load_upstreams_from("https://z.example,https://a.example");
        assert_eq!(list.get(0), Some("https://z.example/dns-query"));
        assert_eq!(list.get(1), Some("https://a.example/dns-query"));
    }
}
