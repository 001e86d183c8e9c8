//! RFC 7541 Appendix A static table — 61 fixed (name, value) entries that
//! both encoder and decoder agree on without any dynamic-table traffic.

pub static ENTRIES: [(&str, &str); 61] = [
    (":authority", ""),
    (":method", "GET"),
    (":method", "POST"),
    (":path", "/"),
    (":path", "/index.html"),
    (":scheme", "http"),
    (":scheme", "https"),
    (":status", "200"),
    (":status", "204"),
    (":status", "206"),
    (":status", "304"),
    (":status", "400"),
    (":status", "404"),
    (":status", "500"),
    ("accept-charset", ""),
    ("accept-encoding", "gzip, deflate"),
    ("accept-language", ""),
    ("accept-ranges", ""),
    ("accept", ""),
    ("access-control-allow-origin", ""),
    ("age", ""),
    ("allow", ""),
    ("authorization", ""),
    ("cache-control", ""),
    ("content-disposition", ""),
    ("content-encoding", ""),
    ("content-language", ""),
    ("content-length", ""),
    ("content-location", ""),
    ("content-range", ""),
    ("content-type", ""),
    ("cookie", ""),
    ("date", ""),
    ("etag", ""),
    ("expect", ""),
    ("expires", ""),
    ("from", ""),
    ("host", ""),
    ("if-match", ""),
    ("if-modified-since", ""),
    ("if-none-match", ""),
    ("if-range", ""),
    ("if-unmodified-since", ""),
    ("last-modified", ""),
    ("link", ""),
    ("location", ""),
    ("max-forwards", ""),
    ("proxy-authenticate", ""),
    ("proxy-authorization", ""),
    ("range", ""),
    ("referer", ""),
    ("refresh", ""),
    ("retry-after", ""),
    ("server", ""),
    ("set-cookie", ""),
    ("strict-transport-security", ""),
    ("transfer-encoding", ""),
    ("user-agent", ""),
    ("vary", ""),
    ("via", ""),
    ("www-authenticate", ""),
];

/// 1-indexed lookup by (name, value) — returns the static index if an exact
/// match exists.
#[must_use]
pub fn find_exact(name: &str, value: &str) -> Option<usize> {
    ENTRIES.iter().position(|(n, v)| *n == name && *v == value).map(|i| i + 1)
}

/// 1-indexed lookup by name only — returns the first static index whose
/// name matches, for literal-with-indexed-name representations.
#[must_use]
pub fn find_name(name: &str) -> Option<usize> {
    ENTRIES.iter().position(|(n, _)| *n == name).map(|i| i + 1)
}

/// Fetch a static entry by its 1-indexed position.
#[must_use]
pub fn get(index: usize) -> Option<(&'static str, &'static str)> {
    if index == 0 {
        return None;
    }
    ENTRIES.get(index - 1).copied()
}

pub const LENGTH: usize = 61;
