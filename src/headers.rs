//! Header normalization (spec §4.9): lowercase names, validate tokens,
//! strip identity-revealing headers the core always sets.

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{Error, Result};

/// Headers the dispatcher always sets itself, or that reveal sandbox
/// identity and must never pass through from caller input.
const STRIPPED_EXACT: &[&str] = &[
    "x-real-ip",
    "true-client-ip",
    "cdn-loop",
    "host",
    "connection",
    "transfer-encoding",
    "keep-alive",
    "upgrade",
    "accept-encoding",
    "content-length",
];

const STRIPPED_PREFIXES: &[&str] = &["cf-", "x-forwarded-"];

fn is_stripped(name: &str) -> bool {
    STRIPPED_EXACT.contains(&name) || STRIPPED_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Validates an RFC 7230 `token`: one or more of the allowed tchars.
#[must_use]
pub fn is_valid_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#'
                        | b'$'
                        | b'%'
                        | b'&'
                        | b'\''
                        | b'*'
                        | b'+'
                        | b'-'
                        | b'.'
                        | b'^'
                        | b'_'
                        | b'`'
                        | b'|'
                        | b'~'
                )
        })
}

/// Rejects CR, LF, NUL in a header value — prevents request/response
/// splitting regardless of what the `HeaderValue` type itself allows.
#[must_use]
pub fn is_valid_header_value(s: &str) -> bool {
    !s.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0)
}

/// Normalize a caller-supplied header list: lowercase names, validate
/// tokens/values, and strip headers the core owns.
///
/// Idempotent: `normalize(normalize(h)) == normalize(h)` because the
/// stripped set and lowercasing are both already-fixed-point operations.
pub fn normalize_headers(input: &[(String, String)]) -> Result<HeaderMap> {
    let mut out = HeaderMap::new();
    for (name, value) in input {
        let lower = name.to_ascii_lowercase();
        if !is_valid_token(&lower) {
            return Err(Error::validation(format!("invalid header name: {name}")));
        }
        if !is_valid_header_value(value) {
            return Err(Error::validation(format!("invalid header value for {name}")));
        }
        if is_stripped(&lower) {
            continue;
        }
        let header_name = HeaderName::from_bytes(lower.as_bytes())
            .map_err(|e| Error::validation(format!("invalid header name {name}: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| Error::validation(format!("invalid header value for {name}: {e}")))?;
        out.append(header_name, header_value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_identity_headers() {
        let input = vec![
            ("CF-Connecting-IP".to_string(), "1.2.3.4".to_string()),
            ("X-Forwarded-For".to_string(), "1.2.3.4".to_string()),
            ("Host".to_string(), "evil.example".to_string()),
            ("X-Custom".to_string(), "keep-me".to_string()),
        ];
        let out = normalize_headers(&input).unwrap();
        assert!(out.get("cf-connecting-ip").is_none());
        assert!(out.get("x-forwarded-for").is_none());
        assert!(out.get("host").is_none());
        assert_eq!(out.get("x-custom").unwrap(), "keep-me");
    }

    #[test]
    fn rejects_crlf_in_value() {
        let input = vec![("x-a".to_string(), "bad\r\nvalue".to_string())];
        assert!(normalize_headers(&input).is_err());
    }

    #[test]
    fn idempotent() {
        let input = vec![("X-A".to_string(), "1".to_string())];
        let once = normalize_headers(&input).unwrap();
        let pairs: Vec<(String, String)> = once
            .iter()
            .map(|(n, v)| (n.as_str().to_string(), v.to_str().unwrap().to_string()))
            .collect();
        let twice = normalize_headers(&pairs).unwrap();
        assert_eq!(once, twice);
    }
}
