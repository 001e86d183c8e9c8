use std::error::Error as StdError;
use std::fmt;

/// A `Result` alias where the `Err` case is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Error produced anywhere in the dispatch, connection, or codec layers.
///
/// Mirrors the teacher crate's `Error { inner: Box<Inner> }` shape: the kind
/// is cheap to match on, the optional source carries the underlying cause,
/// and the optional URL gives callers context without forcing every call
/// site to thread one through.
#[derive(Clone)]
pub struct Error {
    pub inner: Box<Inner>,
}

pub struct Inner {
    pub kind: Kind,
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub url: Option<url::Url>,
}

impl Clone for Inner {
    fn clone(&self) -> Self {
        Inner {
            kind: self.kind.clone(),
            source: None,
            url: self.url.clone(),
        }
    }
}

/// Error taxonomy from the spec's §7. Stable across retries/redirects so
/// callers can discriminate programmatically.
#[derive(Debug, Clone)]
pub enum Kind {
    /// The caller's cancellation token fired.
    Cancelled,
    /// Overall/headers/body timeout tripped.
    Timeout,
    /// Host network refused the connect; recoverable via NAT64.
    SandboxBlocked,
    /// HPACK desync, frame-size violation, invalid `:status`, PUSH_PROMISE, etc.
    Protocol,
    /// Peer or local RST_STREAM.
    StreamReset,
    /// Chunked parse failure, unexpected EOF, oversize header block/chunk.
    BodyFraming,
    /// maxRedirects exceeded, HTTPS→HTTP downgrade, loop, non-replayable body on 307/308.
    Redirect,
    /// Invalid method/path/header name/value, body already locked.
    Validation,
    /// All NAT64 candidate prefixes failed.
    Nat64Exhausted,
    /// TCP connect failure not recognized as sandbox-blocked.
    Connect,
    /// TLS handshake/session failure.
    Tls,
    /// Response body decode (gzip/deflate) failure.
    Decode,
    /// Connection pool operation failed (stale entry raced with GOAWAY).
    Pool,
}

impl Error {
    #[must_use]
    pub fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(Inner { kind, source: None, url: None }),
        }
    }

    #[must_use = "Error builder methods return a new Error and should be used"]
    pub fn with<E: Into<Box<dyn StdError + Send + Sync>>>(mut self, source: E) -> Error {
        self.inner.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: url::Url) -> Self {
        let mut inner = (*self.inner).clone();
        inner.url = Some(url);
        self.inner = Box::new(inner);
        self
    }

    #[must_use]
    pub fn kind(&self) -> &Kind {
        &self.inner.kind
    }

    #[must_use]
    pub fn url(&self) -> Option<&url::Url> {
        self.inner.url.as_ref()
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("sandbox_http::Error");
        f.field("kind", &self.inner.kind);
        if let Some(ref source) = self.inner.source {
            f.field("source", source);
        }
        if let Some(ref url) = self.inner.url {
            f.field("url", url);
        }
        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.kind {
            Kind::Cancelled => f.write_str("request cancelled"),
            Kind::Timeout => f.write_str("request timed out"),
            Kind::SandboxBlocked => f.write_str("sandbox refused the connection"),
            Kind::Protocol => f.write_str("protocol error"),
            Kind::StreamReset => f.write_str("stream reset"),
            Kind::BodyFraming => f.write_str("body framing error"),
            Kind::Redirect => f.write_str("redirect policy violation"),
            Kind::Validation => f.write_str("validation error"),
            Kind::Nat64Exhausted => f.write_str("all NAT64 candidates failed"),
            Kind::Connect => f.write_str("connect error"),
            Kind::Tls => f.write_str("TLS error"),
            Kind::Decode => f.write_str("body decode error"),
            Kind::Pool => f.write_str("connection pool error"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}
