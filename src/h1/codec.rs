//! L3 — HTTP/1.1 codec (spec §4.3): request serialization and
//! status-line/header parsing. Header block is bounded at 80 KiB so a
//! peer that never sends a blank line can't make us buffer forever.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use crate::error::{Error, Result};
use crate::headers::is_valid_token;
use crate::url::ParsedUrl;

pub const MAX_HEADER_BLOCK: usize = 80 * 1024;

/// Body framing the peer told us to expect, derived from the
/// `transfer-encoding`/`content-length` headers per RFC 7230 §3.3.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    None,
    ContentLength(u64),
    Chunked,
    UntilClose,
}

pub struct ResponseHead {
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub raw_headers: Vec<(String, String)>,
    pub framing: BodyFraming,
    pub keep_alive: bool,
}

/// Serialize a request line + headers + blank line. `body_len` of `None`
/// with a non-empty body means the caller intends to stream it, so we
/// advertise `Transfer-Encoding: chunked`.
pub fn encode_request_head(
    method: &Method,
    url: &ParsedUrl,
    headers: &[(String, String)],
    body_len: Option<u64>,
) -> Bytes {
    let mut out = BytesMut::new();
    out.extend_from_slice(method.as_str().as_bytes());
    out.extend_from_slice(b" ");
    out.extend_from_slice(url.path_and_query.as_bytes());
    out.extend_from_slice(b" HTTP/1.1\r\n");

    write_header_line(&mut out, "host", &host_header_value(url));
    for (name, value) in headers {
        write_header_line(&mut out, name, value);
    }
    match body_len {
        Some(0) => {}
        Some(len) => write_header_line(&mut out, "content-length", &len.to_string()),
        None => write_header_line(&mut out, "transfer-encoding", "chunked"),
    }
    out.extend_from_slice(b"\r\n");
    out.freeze()
}

fn host_header_value(url: &ParsedUrl) -> String {
    if url.port == url.scheme.default_port() {
        url.hostname.clone()
    } else {
        format!("{}:{}", url.hostname, url.port)
    }
}

fn write_header_line(out: &mut BytesMut, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
}

/// Parse a complete status-line + header block from `buf`. Returns
/// `Ok(None)` if the terminating blank line hasn't arrived yet; `buf` is
/// only advanced on a successful full parse.
pub fn parse_response_head(buf: &[u8]) -> Result<Option<(ResponseHead, usize)>> {
    let Some(header_end) = find_double_crlf(buf) else {
        if buf.len() > MAX_HEADER_BLOCK {
            return Err(Error::protocol("response header block exceeds 80 KiB bound"));
        }
        return Ok(None);
    };
    if header_end > MAX_HEADER_BLOCK {
        return Err(Error::protocol("response header block exceeds 80 KiB bound"));
    }

    let block = &buf[..header_end];
    let mut lines = block.split(|&b| b == b'\n').map(strip_trailing_cr);

    let status_line = lines.next().ok_or_else(|| Error::protocol("empty response"))?;
    let (version, status, status_text) = parse_status_line(status_line)?;
    if version != b"HTTP/1.1" && version != b"HTTP/1.0" {
        return Err(Error::protocol("unsupported HTTP version in status line"));
    }

    let mut headers = HeaderMap::new();
    let mut raw_headers = Vec::new();
    let mut content_length: Option<u64> = None;
    let mut chunked = false;
    let mut connection_close = version == b"HTTP/1.0";

    for line in lines {
        if line.is_empty() {
            continue;
        }
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            return Err(Error::protocol("malformed header line"));
        };
        let name = std::str::from_utf8(&line[..colon])
            .map_err(|_| Error::protocol("header name is not UTF-8"))?
            .trim()
            .to_ascii_lowercase();
        if !is_valid_token(&name) {
            return Err(Error::protocol(format!("invalid header name: {name}")));
        }
        let value = std::str::from_utf8(&line[colon + 1..])
            .map_err(|_| Error::protocol("header value is not UTF-8"))?
            .trim();

        if name == "content-length" {
            let len: u64 = value.parse().map_err(|_| Error::protocol("invalid content-length"))?;
            if content_length.is_some_and(|existing| existing != len) {
                return Err(Error::protocol("conflicting content-length headers"));
            }
            content_length = Some(len);
        } else if name == "transfer-encoding" {
            if value.eq_ignore_ascii_case("chunked") {
                chunked = true;
            }
        } else if name == "connection" {
            if value.eq_ignore_ascii_case("close") {
                connection_close = true;
            } else if value.eq_ignore_ascii_case("keep-alive") {
                connection_close = false;
            }
        }

        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::protocol(format!("invalid header name {name}: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| Error::protocol(format!("invalid header value for {name}: {e}")))?;
        raw_headers.push((name.clone(), value.to_string()));
        headers.append(header_name, header_value);
    }

    // Chunked takes priority over content-length when both are present
    // (RFC 7230 §3.3.3 point 3).
    let framing = if chunked {
        BodyFraming::Chunked
    } else if let Some(len) = content_length {
        if len == 0 {
            BodyFraming::None
        } else {
            BodyFraming::ContentLength(len)
        }
    } else if matches!(status.as_u16(), 204 | 304) || status.as_u16() < 200 {
        BodyFraming::None
    } else {
        BodyFraming::UntilClose
    };

    // Close-delimited framing only terminates at EOF, so the connection
    // can never be reused for a subsequent request regardless of what the
    // Connection header said.
    let keep_alive = !connection_close && !matches!(framing, BodyFraming::UntilClose);

    Ok(Some((
        ResponseHead { status, status_text, headers, raw_headers, framing, keep_alive },
        header_end + 4,
    )))
}

fn parse_status_line(line: &[u8]) -> Result<(&[u8], StatusCode, String)> {
    let mut parts = line.splitn(3, |&b| b == b' ');
    let version = parts.next().ok_or_else(|| Error::protocol("missing HTTP version"))?;
    let code = parts.next().ok_or_else(|| Error::protocol("missing status code"))?;
    let status = StatusCode::from_bytes(code).map_err(|_| Error::protocol("invalid status code"))?;
    let reason = parts.next().unwrap_or(b"");
    let status_text = String::from_utf8_lossy(reason).trim().to_string();
    Ok((version, status, status_text))
}

fn strip_trailing_cr(line: &[u8]) -> &[u8] {
    if line.last() == Some(&b'\r') { &line[..line.len() - 1] } else { line }
}

fn find_double_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::ParsedUrl;

    #[test]
    fn encodes_request_with_known_length_body() {
        let url = ParsedUrl::parse("https://example.com/widgets?x=1").unwrap();
        let head = encode_request_head(
            &Method::POST,
            &url,
            &[("content-type".to_string(), "application/json".to_string())],
            Some(13),
        );
        let s = std::str::from_utf8(&head).unwrap();
        assert!(s.starts_with("POST /widgets?x=1 HTTP/1.1\r\n"));
        assert!(s.contains("host: example.com\r\n"));
        assert!(s.contains("content-length: 13\r\n"));
        assert!(s.ends_with("\r\n\r\n"));
    }

    #[test]
    fn encodes_streamed_body_as_chunked() {
        let url = ParsedUrl::parse("http://example.com:8080/").unwrap();
        let head = encode_request_head(&Method::PUT, &url, &[], None);
        let s = std::str::from_utf8(&head).unwrap();
        assert!(s.contains("transfer-encoding: chunked\r\n"));
        assert!(s.contains("host: example.com:8080\r\n"));
    }

    #[test]
    fn parses_chunked_response_head() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nTransfer-Encoding: chunked\r\n\r\nbody-follows";
        let (head, consumed) = parse_response_head(raw).unwrap().unwrap();
        assert_eq!(head.status, StatusCode::OK);
        assert_eq!(head.framing, BodyFraming::Chunked);
        assert_eq!(&raw[consumed..], b"body-follows");
    }

    #[test]
    fn parses_content_length_and_no_connection_close() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";
        let (head, _) = parse_response_head(raw).unwrap().unwrap();
        assert_eq!(head.framing, BodyFraming::ContentLength(5));
        assert!(head.keep_alive);
    }

    #[test]
    fn no_body_for_204() {
        let raw = b"HTTP/1.1 204 No Content\r\n\r\n";
        let (head, _) = parse_response_head(raw).unwrap().unwrap();
        assert_eq!(head.framing, BodyFraming::None);
    }

    #[test]
    fn incomplete_headers_return_none() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n";
        assert!(parse_response_head(raw).unwrap().is_none());
    }

    #[test]
    fn http10_without_connection_header_closes() {
        let raw = b"HTTP/1.0 200 OK\r\n\r\n";
        let (head, _) = parse_response_head(raw).unwrap().unwrap();
        assert!(!head.keep_alive);
        assert_eq!(head.framing, BodyFraming::UntilClose);
    }
}
