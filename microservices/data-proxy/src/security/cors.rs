//! Origin allowlist and CORS response headers
//!
//! Entries may contain `*` to match one host label run, e.g.
//! `https://*.example.org`. Local development origins are always allowed.
//! A request without an `Origin` header is not a browser cross-origin
//! request and passes.

use axum::http::{header, HeaderMap, HeaderValue};
use regex::Regex;

const LOCAL_DEV_ORIGIN: &str = r"^https?://(localhost|127\.0\.0\.1)(:\d+)?$";

pub struct CorsPolicy {
    patterns: Vec<Regex>,
}

impl CorsPolicy {
    pub fn new(allowed_origins: &[String]) -> Result<Self, regex::Error> {
        let mut patterns = vec![Regex::new(LOCAL_DEV_ORIGIN)?];
        for origin in allowed_origins {
            patterns.push(Regex::new(&glob_to_pattern(origin))?);
        }
        Ok(Self { patterns })
    }

    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(origin))
    }

    /// True only when an `Origin` header is present and not allowlisted
    pub fn is_disallowed(&self, headers: &HeaderMap) -> bool {
        match origin(headers) {
            Some(origin) => !self.is_allowed_origin(origin),
            None => false,
        }
    }

    /// CORS headers for a response to this request
    pub fn response_headers(&self, request: &HeaderMap, methods: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(origin) = origin(request).filter(|o| self.is_allowed_origin(o)) {
            if let Ok(value) = HeaderValue::from_str(origin) {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
            }
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(methods),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        );
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        headers
    }
}

fn origin(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn glob_to_pattern(entry: &str) -> String {
    let escaped: Vec<String> = entry.split('*').map(regex::escape).collect();
    format!("^{}$", escaped.join("[A-Za-z0-9-]+(?:\\.[A-Za-z0-9-]+)*"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(origin: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_str(origin).unwrap());
        headers
    }

    fn policy() -> CorsPolicy {
        CorsPolicy::new(&[
            "https://geowatch.example.org".to_string(),
            "https://*.preview.example.org".to_string(),
        ])
        .unwrap()
    }

    #[test]
    fn test_allowlist_matching() {
        let policy = policy();
        assert!(policy.is_allowed_origin("https://geowatch.example.org"));
        assert!(policy.is_allowed_origin("https://pr-42.preview.example.org"));
        assert!(policy.is_allowed_origin("http://localhost:5173"));
        assert!(policy.is_allowed_origin("http://127.0.0.1"));

        assert!(!policy.is_allowed_origin("https://evil.example.com"));
        assert!(!policy.is_allowed_origin("https://geowatch.example.org.evil.com"));
        assert!(!policy.is_allowed_origin("https://preview.example.org"));
    }

    #[test]
    fn test_missing_origin_is_not_disallowed() {
        let policy = policy();
        assert!(!policy.is_disallowed(&HeaderMap::new()));
        assert!(policy.is_disallowed(&request("https://evil.example.com")));
    }

    #[test]
    fn test_response_headers_echo_allowed_origin_only() {
        let policy = policy();
        let allowed = policy.response_headers(&request("http://localhost:3000"), "GET, OPTIONS");
        assert_eq!(allowed[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:3000");
        assert_eq!(allowed[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, OPTIONS");
        assert_eq!(allowed[header::VARY], "Origin");

        let denied = policy.response_headers(&request("https://evil.example.com"), "GET, OPTIONS");
        assert!(denied.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
