//! T — request dispatcher (spec §4.9): the public `request()` entry point.
//! Wires the retry loop around the redirect loop around one connection
//! attempt, using the connection-strategy primitives in [`connect`].

pub mod connect;
pub mod redirect;
pub mod retry;

use std::collections::HashSet;
use std::sync::Mutex as StdMutex;

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method};
use tokio::sync::mpsc;

use crate::body::{RequestBody, ResponseBody};
use crate::cancel::Deadline;
use crate::compression::{self, COMPRESS_MIN_LEN};
use crate::config::ConnectionStrategy;
use crate::context::EngineContext;
use crate::error::{Error, Result};
use crate::headers::normalize_headers;
use crate::request::{Request, RequestOptions, RetryPreference};
use crate::response::Response;
use crate::url::ParsedUrl;
use connect::AlpnMode;

/// A request body held so it can be reconstructed for more than one attempt.
/// `Stream` bodies are consumed exactly once: the slot is emptied on the
/// first [`BodySource::prepare`] call, and every subsequent call (which only
/// happens on a path already guarded by [`BodySource::is_replayable`]) gets
/// an empty body back rather than panicking.
enum BodySource {
    Empty,
    Bytes(Bytes),
    Stream(StdMutex<Option<RequestBody>>),
}

impl BodySource {
    fn from_request_body(body: RequestBody) -> Self {
        match body {
            RequestBody::Empty => BodySource::Empty,
            RequestBody::Full(b) => BodySource::Bytes(b),
            RequestBody::Text(s) => BodySource::Bytes(Bytes::from(s)),
            RequestBody::Streamed(_) => BodySource::Stream(StdMutex::new(Some(body))),
        }
    }

    fn is_replayable(&self) -> bool {
        !matches!(self, BodySource::Stream(_))
    }

    fn prepare(&self) -> RequestBody {
        match self {
            BodySource::Empty => RequestBody::Empty,
            BodySource::Bytes(b) => RequestBody::Full(b.clone()),
            BodySource::Stream(slot) => slot.lock().unwrap().take().unwrap_or(RequestBody::Empty),
        }
    }
}

/// Body preparation (spec §4.9): default a string body's content-type to
/// `text/plain;charset=UTF-8` when the caller hasn't set one, then
/// gzip-compress a known-length body above the threshold when requested and
/// `content-encoding` isn't already set.
fn prepare_body(body: RequestBody, headers: &mut HeaderMap, compress: bool) -> BodySource {
    if matches!(body, RequestBody::Text(_)) && !headers.contains_key(http::header::CONTENT_TYPE) {
        headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("text/plain;charset=UTF-8"));
    }

    if compress {
        let compressible = match &body {
            RequestBody::Full(data) => Some(data.clone()),
            RequestBody::Text(s) => Some(Bytes::from(s.clone())),
            _ => None,
        };
        if let Some(data) = compressible {
            if data.len() > COMPRESS_MIN_LEN && !headers.contains_key(http::header::CONTENT_ENCODING) {
                let compressed = compression::gzip_compress(&data);
                headers.insert(http::header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
                if let Ok(len_value) = HeaderValue::from_str(&compressed.len().to_string()) {
                    headers.insert(http::header::CONTENT_LENGTH, len_value);
                }
                return BodySource::Bytes(compressed);
            }
        }
    }
    BodySource::from_request_body(body)
}

fn headers_to_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

/// True when `e` is one this strategy's direct attempt may recover from by
/// falling through to NAT64 (spec §4.9 step 5 / fast-h1's fallback list).
fn is_recoverable_for_strategy(strategy: ConnectionStrategy, e: &Error) -> bool {
    if e.is_sandbox_blocked() {
        return true;
    }
    if !e.is_connect() && !e.is_timeout() {
        return false;
    }
    let msg = e.to_string();
    match strategy {
        ConnectionStrategy::Compat => Error::matches_sandbox_blocked_message(&msg),
        ConnectionStrategy::FastH1 => Error::matches_fast_h1_fallback_message(&msg),
    }
}

/// Run one connection attempt for the current hop: decide direct vs NAT64,
/// H1 vs H2, per the active [`ConnectionStrategy`] (spec §4.9).
async fn attempt_connect(
    ctx: &EngineContext,
    options: &RequestOptions,
    method: &Method,
    url: &ParsedUrl,
    headers: &[(String, String)],
    body: &BodySource,
) -> Result<Response> {
    let headers_timeout = options.headers_timeout;
    let body_idle_timeout = options.body_idle_timeout;

    if !url.is_https() {
        return connect::send_h1_plain(method, url, headers, body.prepare(), headers_timeout, body_idle_timeout).await;
    }

    let strategy = options.strategy.unwrap_or(ctx.config.strategy);
    let mode = AlpnMode::from_preference(options.protocol);
    let classification = connect::classify(ctx, &url.hostname).await;

    if classification.is_cdn {
        let addr = classification
            .resolved_addr
            .ok_or_else(|| Error::nat64_exhausted("CDN-classified host resolved no address"))?;
        let nat64_mode = if strategy == ConnectionStrategy::FastH1 { AlpnMode::Http1Only } else { mode };
        return connect::nat64_hedged(
            ctx,
            method,
            url,
            headers,
            || body.prepare(),
            body.is_replayable(),
            addr,
            nat64_mode,
            headers_timeout,
            body_idle_timeout,
        )
        .await;
    }

    let direct_result = match strategy {
        ConnectionStrategy::Compat => {
            connect::compat_direct_attempt(
                ctx,
                options.protocol,
                method,
                url,
                headers,
                || body.prepare(),
                body.is_replayable(),
                headers_timeout,
                body_idle_timeout,
            )
            .await
        }
        ConnectionStrategy::FastH1 => {
            connect::fast_h1_direct_attempt(ctx, method, url, headers, body.prepare(), headers_timeout, body_idle_timeout).await
        }
    };

    match direct_result {
        Ok(resp) => Ok(resp),
        Err(e) if body.is_replayable() && is_recoverable_for_strategy(strategy, &e) => {
            match classification.resolved_addr {
                Some(addr) => {
                    connect::nat64_hedged(
                        ctx,
                        method,
                        url,
                        headers,
                        || body.prepare(),
                        body.is_replayable(),
                        addr,
                        mode,
                        headers_timeout,
                        body_idle_timeout,
                    )
                    .await
                }
                None => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}

/// Redirect loop (spec §4.9): follow 3xx responses from `start_url` up to
/// `options.max_redirects`, rewriting method/headers per status and
/// detecting loops via a visited-URL set. Returns the terminal response.
async fn follow_redirects(
    ctx: &EngineContext,
    options: &RequestOptions,
    start_method: &Method,
    start_url: &ParsedUrl,
    start_headers: &HeaderMap,
    body: &BodySource,
) -> Result<Response> {
    let mut url = start_url.clone();
    let mut method = start_method.clone();
    let mut headers = start_headers.clone();
    let mut visited = HashSet::new();
    visited.insert(url.serialize());

    let mut hops = 0u32;
    loop {
        let header_pairs = headers_to_pairs(&headers);
        let resp = attempt_connect(ctx, options, &method, &url, &header_pairs, body).await?;

        if !options.follow_redirects || !redirect::is_redirect(resp.status) {
            return Ok(resp);
        }

        let Some(location) = resp
            .headers
            .get(http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
        else {
            return Ok(resp);
        };

        if hops >= options.max_redirects {
            let _ = resp.body.collect().await;
            return Err(Error::redirect("exceeded max redirects"));
        }

        if redirect::preserves_method_and_body(resp.status) && !body.is_replayable() {
            let _ = resp.body.collect().await;
            return Err(Error::redirect("cannot follow redirect with a non-replayable stream body"));
        }

        let next_url = redirect::resolve_location(&url, &location)?;
        if !visited.insert(next_url.serialize()) {
            let _ = resp.body.collect().await;
            return Err(Error::redirect("loop detected"));
        }

        let crosses_origin = redirect::crosses_origin(&url, &next_url);
        let method_downgraded = redirect::rewrites_to_get(resp.status);
        redirect::apply_redirect_headers(&mut headers, crosses_origin, method_downgraded);
        method = redirect::next_method(resp.status, &method);

        tracing::debug!(status = resp.status.as_u16(), from = %url.serialize(), to = %next_url.serialize(), crosses_origin, "following redirect");
        let _ = resp.body.collect().await;
        url = next_url;
        hops += 1;
    }
}

fn retry_attempts_allowed(options: &RequestOptions, engine_default: u32) -> u32 {
    match options.retry {
        RetryPreference::Disabled => 1,
        RetryPreference::Count(n) => n.max(1),
        RetryPreference::EngineDefault => engine_default.max(1),
    }
}

/// Strip response framing headers that no longer describe the body once
/// it's been transparently decompressed.
fn strip_encoding_headers(headers: &mut HeaderMap) {
    headers.remove(http::header::CONTENT_ENCODING);
    headers.remove(http::header::CONTENT_LENGTH);
}

/// Transparent response decompression (spec §4.9/§6): buffers the body to
/// decode it, since the codec crate only exposes a whole-buffer gzip/deflate
/// reader rather than a streaming one. Acceptable for this engine's expected
/// response sizes; documented as a simplification.
async fn maybe_decompress(mut resp: Response, decompress: bool) -> Result<Response> {
    if !decompress {
        return Ok(resp);
    }
    let encoding = resp
        .headers
        .get(http::header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if !matches!(encoding.as_deref(), Some("gzip") | Some("deflate")) {
        return Ok(resp);
    }
    let raw = resp.body.collect().await?;
    let decoded = compression::decompress_response(encoding.as_deref(), &raw)?;
    strip_encoding_headers(&mut resp.headers);
    let (tx, rx) = mpsc::channel(1);
    let _ = tx.send(Ok(decoded)).await;
    Ok(Response { body: ResponseBody::new(rx), ..resp })
}

/// The engine's single entry point (spec §4.9: `request(url, options) →
/// response`). Normalizes headers, prepares the body, then drives the retry
/// loop around the redirect loop around one connection attempt per hop.
pub async fn request(ctx: &EngineContext, req: Request) -> Result<Response> {
    if req.options.cancel.is_cancelled() {
        return Err(Error::cancelled());
    }

    let deadline = Deadline::new(req.options.cancel.clone(), req.options.overall_timeout);

    let mut headers = normalize_headers(&req.headers)?;
    if req.options.decompress {
        headers.insert(http::header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
    }

    let body = prepare_body(req.body, &mut headers, req.options.compress_body);

    let max_attempts = retry_attempts_allowed(&req.options, ctx.config.retry.max_attempts);
    let mut attempt = 0u32;

    loop {
        let outcome = deadline
            .race(follow_redirects(ctx, &req.options, &req.method, &req.url, &headers, &body))
            .await;

        let result = match outcome {
            Ok(r) => r,
            Err(reason) => return Err(reason.into_error()),
        };

        let can_retry = attempt + 1 < max_attempts
            && retry::method_is_retryable(&ctx.config.retry, &req.method)
            && body.is_replayable();

        match result {
            Ok(resp) => {
                let should_retry = can_retry && retry::status_is_retryable(&ctx.config.retry, resp.status.as_u16());
                if should_retry {
                    let retry_after = retry::retry_after_header(&resp.headers);
                    let delay = retry::compute_delay(&ctx.config.retry, attempt, retry_after.as_deref());
                    tracing::debug!(status = resp.status.as_u16(), attempt, delay_ms = delay.as_millis() as u64, "retrying after status");
                    let _ = resp.body.collect().await;
                    attempt += 1;
                    if let Err(reason) = deadline.race(tokio::time::sleep(delay)).await {
                        return Err(reason.into_error());
                    }
                    continue;
                }
                return maybe_decompress(resp, req.options.decompress).await;
            }
            Err(e) if can_retry && e.is_retry_eligible() => {
                let delay = retry::compute_delay(&ctx.config.retry, attempt, None);
                tracing::debug!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "retrying after error");
                attempt += 1;
                if let Err(reason) = deadline.race(tokio::time::sleep(delay)).await {
                    return Err(reason.into_error());
                }
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_attempts_allowed_counts_disabled_as_one() {
        let mut options = RequestOptions::default();
        options.retry = RetryPreference::Disabled;
        assert_eq!(retry_attempts_allowed(&options, 5), 1);
    }

    #[test]
    fn retry_attempts_allowed_honors_explicit_count() {
        let mut options = RequestOptions::default();
        options.retry = RetryPreference::Count(2);
        assert_eq!(retry_attempts_allowed(&options, 5), 2);
    }

    #[test]
    fn is_recoverable_for_strategy_matches_sandbox_blocked_text() {
        let e = Error::connect("cannot connect to the specified address");
        assert!(is_recoverable_for_strategy(ConnectionStrategy::Compat, &e));
        assert!(is_recoverable_for_strategy(ConnectionStrategy::FastH1, &e));
    }

    #[test]
    fn is_recoverable_for_strategy_fast_h1_accepts_broader_list() {
        let e = Error::connect("connection refused");
        assert!(!is_recoverable_for_strategy(ConnectionStrategy::Compat, &e));
        assert!(is_recoverable_for_strategy(ConnectionStrategy::FastH1, &e));
    }

    #[test]
    fn body_source_stream_is_not_replayable() {
        let (body, _tx) = RequestBody::streamed(1);
        let source = BodySource::from_request_body(body);
        assert!(!source.is_replayable());
    }

    #[test]
    fn body_source_bytes_is_replayable_and_clones_each_prepare() {
        let source = BodySource::from_request_body(RequestBody::from_bytes(Bytes::from_static(b"hi")));
        assert!(source.is_replayable());
        assert!(matches!(source.prepare(), RequestBody::Full(b) if b == Bytes::from_static(b"hi")));
        assert!(matches!(source.prepare(), RequestBody::Full(b) if b == Bytes::from_static(b"hi")));
    }
}
