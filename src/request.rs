//! Request data model (spec §3).

use std::time::Duration;

use http::Method;
use tokio_util::sync::CancellationToken;

use crate::body::RequestBody;
use crate::config::ConnectionStrategy;
use crate::url::ParsedUrl;

/// `retry` ∈ {false, integer, full options} from spec §6's configuration
/// surface.
#[derive(Debug, Clone, Copy)]
pub enum RetryPreference {
    Disabled,
    Count(u32),
    EngineDefault,
}

/// `protocol` ∈ {auto, h2, http1} from spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolPreference {
    Auto,
    Http2Only,
    Http1Only,
}

/// Per-request options layered on top of [`crate::config::EngineConfig`]
/// defaults.
#[derive(Clone)]
pub struct RequestOptions {
    pub cancel: CancellationToken,
    pub overall_timeout: Option<Duration>,
    pub headers_timeout: Option<Duration>,
    pub body_idle_timeout: Option<Duration>,
    pub max_redirects: u32,
    pub follow_redirects: bool,
    pub retry: RetryPreference,
    pub decompress: bool,
    pub compress_body: bool,
    pub protocol: ProtocolPreference,
    pub strategy: Option<ConnectionStrategy>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            cancel: CancellationToken::new(),
            overall_timeout: Some(Duration::from_secs(30)),
            headers_timeout: Some(Duration::from_secs(10)),
            body_idle_timeout: Some(Duration::from_secs(15)),
            max_redirects: 10,
            follow_redirects: true,
            retry: RetryPreference::EngineDefault,
            decompress: true,
            compress_body: false,
            protocol: ProtocolPreference::Auto,
            strategy: None,
        }
    }
}

pub struct Request {
    pub method: Method,
    pub url: ParsedUrl,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    pub options: RequestOptions,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, url: ParsedUrl) -> Self {
        Request {
            method,
            url,
            headers: Vec::new(),
            body: RequestBody::Empty,
            options: RequestOptions::default(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Set a string body (spec §4.2); defaults `content-type` to
    /// `text/plain;charset=UTF-8` unless the caller sets one explicitly.
    #[must_use]
    pub fn text_body(mut self, text: impl Into<String>) -> Self {
        self.body = RequestBody::from_text(text);
        self
    }

    #[must_use]
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}
