use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::error::ParseError;

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^[a-z][a-z0-9+.-]*://").unwrap())
}

/// `https://example.com/` -> `example.com`. Paths other than a trailing slash are kept.
pub fn normalize_domain(domain: &str) -> String {
    let trimmed = domain.trim();
    scheme_re()
        .replace(trimmed, "")
        .trim_end_matches('/')
        .to_string()
}

/// Bare hostname of a target given as a domain or a full URL:
/// `https://target.example/foo?x=1` -> `target.example`.
pub fn bare_host(target: &str) -> String {
    let without_scheme = normalize_domain(target);
    without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .to_lowercase()
}

/// Hostname of an absolute URL.
pub fn host_of(url: &str) -> Result<String, ParseError> {
    let parsed = Url::parse(url.trim()).map_err(|e| ParseError {
        input: url.to_string(),
        reason: e.to_string(),
    })?;
    parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ParseError {
            input: url.to_string(),
            reason: "no host".into(),
        })
}
