//! Parsed URL: `(scheme, hostname, port, path-with-query)` (spec §3).
//!
//! Thin wrapper over the `url` crate grounded on the teacher's `http/url.rs`,
//! adding the default-path and default-port behavior the spec requires.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    #[must_use]
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    pub scheme: Scheme,
    pub hostname: String,
    pub port: u16,
    pub path_and_query: String,
}

impl ParsedUrl {
    pub fn parse(raw: &str) -> Result<ParsedUrl> {
        let parsed = url::Url::parse(raw).map_err(|e| {
            Error::validation(format!("invalid URL: {e}"))
        })?;

        let scheme = match parsed.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => {
                return Err(Error::validation(format!("unsupported scheme: {other}")));
            }
        };

        let hostname = parsed
            .host_str()
            .ok_or_else(|| Error::validation("URL has no host"))?
            .to_string();

        let port = parsed.port().unwrap_or_else(|| scheme.default_port());

        let mut path_and_query = parsed.path().to_string();
        if path_and_query.is_empty() {
            path_and_query = "/".to_string();
        }
        if let Some(query) = parsed.query() {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }

        Ok(ParsedUrl { scheme, hostname, port, path_and_query })
    }

    #[must_use]
    pub fn is_https(&self) -> bool {
        matches!(self.scheme, Scheme::Https)
    }

    /// `(hostname, port)` — the key used by the protocol memo, pool, and DNS cache.
    #[must_use]
    pub fn origin_key(&self) -> (String, u16) {
        (self.hostname.to_ascii_lowercase(), self.port)
    }

    #[must_use]
    pub fn serialize(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme.as_str(),
            self.hostname,
            self.port,
            self.path_and_query
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_path_and_port() {
        let u = ParsedUrl::parse("https://example.com").unwrap();
        assert_eq!(u.path_and_query, "/");
        assert_eq!(u.port, 443);
    }

    #[test]
    fn explicit_port_and_query() {
        let u = ParsedUrl::parse("http://example.com:8080/a/b?x=1").unwrap();
        assert_eq!(u.port, 8080);
        assert_eq!(u.path_and_query, "/a/b?x=1");
    }

    #[test]
    fn parse_serialize_round_trips_to_same_parse() {
        for raw in [
            "https://example.com/x?y=1",
            "http://host:8080/",
            "https://a.b.c:443/path",
        ] {
            let parsed = ParsedUrl::parse(raw).unwrap();
            let reparsed = ParsedUrl::parse(&parsed.serialize()).unwrap();
            assert_eq!(parsed, reparsed);
        }
    }

    #[test]
    fn rejects_unsupported_scheme() {
        assert!(ParsedUrl::parse("ftp://example.com").is_err());
    }
}
