//! Response data model (spec §3).

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::body::ResponseBody;
use crate::error::{Error, Result};

/// Which wire protocol actually served a response, surfaced for callers
/// that want to observe the engine's negotiated behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolUsed {
    Http1,
    Http2,
}

pub struct Response {
    pub status: StatusCode,
    /// The reason phrase off the status line. Always empty for H2, which
    /// carries no such thing on the wire (RFC 7540 §8.1.2.4).
    pub status_text: String,
    pub headers: HeaderMap,
    /// Header pairs in wire order, duplicates preserved — `headers` merges
    /// repeated names into one entry, which loses ordering information some
    /// callers (e.g. multiple `Set-Cookie`) need back.
    pub raw_headers: Vec<(String, String)>,
    pub body: ResponseBody,
    pub protocol: ProtocolUsed,
    /// True when this response was served over a connection routed through
    /// a NAT64 gateway rather than a direct connect.
    pub via_nat64: bool,
}

impl Response {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// Every `set-cookie` header value, in the order the server sent them.
    #[must_use]
    pub fn get_set_cookie(&self) -> Vec<&str> {
        self.headers
            .get_all(http::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Buffer the whole body and return it as raw bytes.
    pub async fn bytes(self) -> Result<Bytes> {
        self.body.collect().await
    }

    /// Buffer the whole body and decode it as UTF-8 text.
    pub async fn text(self) -> Result<String> {
        let bytes = self.body.collect().await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::decode(format!("response body is not valid UTF-8: {e}")))
    }

    /// Buffer the whole body and deserialize it as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.body.collect().await?;
        serde_json::from_slice(&bytes).map_err(|e| Error::decode(format!("response body is not valid JSON: {e}")))
    }
}
