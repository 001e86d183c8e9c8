//! Redirect chain handling (spec §4's redirect loop): method/body rewriting
//! per status code, cross-origin header stripping, loop detection.

use http::{HeaderMap, Method, StatusCode};

use crate::error::{Error, Result};
use crate::url::ParsedUrl;

/// Headers that must never survive a cross-origin hop.
const CROSS_ORIGIN_STRIPPED: &[&str] = &["authorization", "cookie", "proxy-authorization"];

#[must_use]
pub fn is_redirect(status: StatusCode) -> bool {
    (300..400).contains(&status.as_u16())
}

/// 301/302/303 rewrite the method to GET and drop the body; 307/308 keep
/// both. Any other 3xx is not a redirect this engine follows.
#[must_use]
pub fn rewrites_to_get(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303)
}

#[must_use]
pub fn preserves_method_and_body(status: StatusCode) -> bool {
    matches!(status.as_u16(), 307 | 308)
}

/// Resolve a `Location` header against the current URL, rejecting an
/// HTTPS → HTTP downgrade outright (spec §4: "a hard error").
pub fn resolve_location(current: &ParsedUrl, location: &str) -> Result<ParsedUrl> {
    let resolved = url::Url::parse(&current.serialize())
        .and_then(|base| base.join(location))
        .map_err(|e| Error::redirect(format!("invalid redirect location: {e}")))?;
    let next = ParsedUrl::parse(resolved.as_str())?;
    if current.is_https() && !next.is_https() {
        return Err(Error::redirect("refusing to follow HTTPS to HTTP downgrade"));
    }
    Ok(next)
}

#[must_use]
pub fn crosses_origin(from: &ParsedUrl, to: &ParsedUrl) -> bool {
    from.scheme != to.scheme || from.hostname.to_ascii_lowercase() != to.hostname.to_ascii_lowercase() || from.port != to.port
}

/// Drop headers a cross-origin hop must not carry; also drop the content
/// headers the spec says a method-downgrading redirect invalidates.
pub fn apply_redirect_headers(headers: &mut HeaderMap, crosses_origin: bool, method_downgraded: bool) {
    if crosses_origin {
        for name in CROSS_ORIGIN_STRIPPED {
            headers.remove(*name);
        }
    }
    if method_downgraded {
        headers.remove("content-type");
        headers.remove("content-length");
        headers.remove("content-encoding");
    }
}

#[must_use]
pub fn next_method(status: StatusCode, current: &Method) -> Method {
    if rewrites_to_get(status) { Method::GET } else { current.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cross_origin_on_host_change() {
        let a = ParsedUrl::parse("https://a.example/x").unwrap();
        let b = ParsedUrl::parse("https://b.example/y").unwrap();
        assert!(crosses_origin(&a, &b));
    }

    #[test]
    fn same_origin_different_path_is_not_cross_origin() {
        let a = ParsedUrl::parse("https://a.example/x").unwrap();
        let b = ParsedUrl::parse("https://a.example/y").unwrap();
        assert!(!crosses_origin(&a, &b));
    }

    #[test]
    fn https_to_http_downgrade_is_rejected() {
        let current = ParsedUrl::parse("https://a.example/x").unwrap();
        assert!(resolve_location(&current, "http://a.example/y").is_err());
    }

    #[test]
    fn relative_location_resolves_against_current_url() {
        let current = ParsedUrl::parse("https://a.example/dir/x").unwrap();
        let next = resolve_location(&current, "/y").unwrap();
        assert_eq!(next.hostname, "a.example");
        assert_eq!(next.path_and_query, "/y");
    }

    #[test]
    fn three_oh_one_rewrites_to_get() {
        assert_eq!(next_method(StatusCode::from_u16(301).unwrap(), &Method::POST), Method::GET);
        assert_eq!(next_method(StatusCode::from_u16(307).unwrap(), &Method::POST), Method::POST);
    }

    #[test]
    fn cross_origin_strips_sensitive_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer t".parse().unwrap());
        headers.insert("cookie", "sid=1".parse().unwrap());
        headers.insert("x-custom", "keep".parse().unwrap());
        apply_redirect_headers(&mut headers, true, false);
        assert!(headers.get("authorization").is_none());
        assert!(headers.get("cookie").is_none());
        assert!(headers.get("x-custom").is_some());
    }
}
