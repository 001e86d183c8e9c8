//! Connection strategy (spec §4.9): decide how to reach an origin for one
//! attempt — direct vs NAT64, H2 vs H1, pooled vs fresh — and execute it.
//! The retry/redirect loop in `dispatch::mod` drives this per attempt; this
//! module never retries or redirects on its own, except for the NAT64
//! hedge's own internal candidate fan-out.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use http::Method;
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;

use crate::body::RequestBody;
use crate::context::EngineContext;
use crate::error::{Error, Result};
use crate::h1;
use crate::h2::H2Client;
use crate::pool::PoolKey;
use crate::protocol_memo::NegotiatedAlpn;
use crate::request::ProtocolPreference;
use crate::response::{ProtocolUsed, Response};
use crate::socket;
use crate::tls::{self, NegotiatedProtocol, TlsSession};
use crate::url::ParsedUrl;

const ALPN_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum AlpnMode {
    Http2Only,
    Http1Only,
    Both,
}

impl AlpnMode {
    fn protocols(self) -> &'static [&'static [u8]] {
        match self {
            AlpnMode::Http2Only => &[b"h2"],
            AlpnMode::Http1Only => &[b"http/1.1"],
            AlpnMode::Both => &[b"h2", b"http/1.1"],
        }
    }

    #[must_use]
    pub fn from_preference(pref: ProtocolPreference) -> Self {
        match pref {
            ProtocolPreference::Http2Only => AlpnMode::Http2Only,
            ProtocolPreference::Http1Only => AlpnMode::Http1Only,
            ProtocolPreference::Auto => AlpnMode::Both,
        }
    }
}

#[must_use]
fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE)
}

/// Outcome of consulting the DNS+CDN cache (M1) for an origin.
pub struct Classification {
    pub is_cdn: bool,
    pub resolved_addr: Option<Ipv4Addr>,
}

pub async fn classify(ctx: &EngineContext, hostname: &str) -> Classification {
    match ctx.dns.resolve(hostname).await {
        Ok(resolution) => {
            ctx.stats.record_dns_cache_hit();
            Classification { is_cdn: resolution.all_cdn, resolved_addr: resolution.addresses.first().copied() }
        }
        // DoH failure is cached as "unknown, try direct" (spec §9 open question):
        // no resolved address means a later sandbox-blocked fallback has nothing
        // to synthesize a NAT64 literal from.
        Err(_) => {
            ctx.stats.record_dns_cache_miss();
            Classification { is_cdn: false, resolved_addr: None }
        }
    }
}

/// Drive one TLS handshake on an already-connected socket, then branch to H2
/// or H1 depending on what ALPN settled on. Caches the outcome in the
/// protocol memo and, for H2, the pool.
#[allow(clippy::too_many_arguments)]
async fn send_over_tls(
    ctx: &EngineContext,
    tcp: TcpStream,
    hostname: String,
    port: u16,
    method: &Method,
    url: &ParsedUrl,
    headers: &[(String, String)],
    body: RequestBody,
    mode: AlpnMode,
    connect_hostname: Option<String>,
    headers_timeout: Option<Duration>,
    body_idle_timeout: Option<Duration>,
) -> Result<Response> {
    let config = tls::build_client_config_with_alpn(mode.protocols());
    let server_name =
        ServerName::try_from(hostname.clone()).map_err(|_| Error::tls("invalid server name"))?;
    let session = TlsSession::handshake(tcp, server_name, config).await?;
    tracing::debug!(host = %hostname, port, alpn = ?session.negotiated_protocol(), via_nat64 = connect_hostname.is_some(), "tls handshake complete");

    match session.negotiated_protocol() {
        NegotiatedProtocol::Http2 => {
            ctx.protocol_memo.record(&hostname, port, NegotiatedAlpn::Http2);
            let client = H2Client::with_config(session, &ctx.config.performance);
            let resp = client.send(method, url, headers, body, headers_timeout, body_idle_timeout).await?;
            ctx.pool.insert(PoolKey::new(hostname, port, connect_hostname.clone()), client);
            Ok(Response {
                status: resp.status,
                status_text: resp.status_text,
                headers: resp.headers,
                raw_headers: resp.raw_headers,
                body: resp.body,
                protocol: ProtocolUsed::Http2,
                via_nat64: connect_hostname.is_some(),
            })
        }
        NegotiatedProtocol::Http11 | NegotiatedProtocol::Unspecified => {
            ctx.protocol_memo.record(&hostname, port, NegotiatedAlpn::Http1);
            let resp =
                h1::send_request(session, method, url, headers, body, headers_timeout, body_idle_timeout).await?;
            Ok(Response {
                status: resp.status,
                status_text: resp.status_text,
                headers: resp.headers,
                raw_headers: resp.raw_headers,
                body: resp.body,
                protocol: ProtocolUsed::Http1,
                via_nat64: connect_hostname.is_some(),
            })
        }
    }
}

/// Plain-HTTP direct attempt: no TLS at all.
pub async fn send_h1_plain(
    method: &Method,
    url: &ParsedUrl,
    headers: &[(String, String)],
    body: RequestBody,
    headers_timeout: Option<Duration>,
    body_idle_timeout: Option<Duration>,
) -> Result<Response> {
    let tcp = socket::connect_host_with_guard(&url.hostname, url.port).await?;
    let resp = h1::send_request(tcp, method, url, headers, body, headers_timeout, body_idle_timeout).await?;
    Ok(Response {
        status: resp.status,
        status_text: resp.status_text,
        headers: resp.headers,
        raw_headers: resp.raw_headers,
        body: resp.body,
        protocol: ProtocolUsed::Http1,
        via_nat64: false,
    })
}

/// Direct TLS attempt restricted to a single ALPN outcome — used once the
/// protocol memo (or an explicit `protocol` preference) has already decided
/// which wire format to request.
#[allow(clippy::too_many_arguments)]
pub async fn direct_attempt_forced(
    ctx: &EngineContext,
    method: &Method,
    url: &ParsedUrl,
    headers: &[(String, String)],
    body: RequestBody,
    mode: AlpnMode,
    headers_timeout: Option<Duration>,
    body_idle_timeout: Option<Duration>,
) -> Result<Response> {
    let tcp = socket::connect_host_with_guard(&url.hostname, url.port).await?;
    send_over_tls(
        ctx,
        tcp,
        url.hostname.clone(),
        url.port,
        method,
        url,
        headers,
        body,
        mode,
        None,
        headers_timeout,
        body_idle_timeout,
    )
    .await
}

/// Compat strategy's non-CDN direct path (spec §4.9 step 4): consult the
/// protocol memo first; absent a memo entry, probe both ALPN options under a
/// 2-second handshake timeout, falling back to HTTP/1.1-only when the probe
/// hangs or fails and the body can be resent.
#[allow(clippy::too_many_arguments)]
pub async fn compat_direct_attempt(
    ctx: &EngineContext,
    protocol_pref: ProtocolPreference,
    method: &Method,
    url: &ParsedUrl,
    headers: &[(String, String)],
    mut next_body: impl FnMut() -> RequestBody,
    body_replayable: bool,
    headers_timeout: Option<Duration>,
    body_idle_timeout: Option<Duration>,
) -> Result<Response> {
    if protocol_pref != ProtocolPreference::Auto {
        return direct_attempt_forced(
            ctx,
            method,
            url,
            headers,
            next_body(),
            AlpnMode::from_preference(protocol_pref),
            headers_timeout,
            body_idle_timeout,
        )
        .await;
    }

    match ctx.protocol_memo.lookup(&url.hostname, url.port) {
        Some(NegotiatedAlpn::Http2) => {
            let key = PoolKey::new(url.hostname.clone(), url.port, None);
            if let Some(client) = ctx.pool.get(&key) {
                ctx.stats.record_pool_hit();
                let body = next_body();
                let resp = client.send(method, url, headers, body, headers_timeout, body_idle_timeout).await?;
                return Ok(Response {
                    status: resp.status,
                    status_text: resp.status_text,
                    headers: resp.headers,
                    raw_headers: resp.raw_headers,
                    body: resp.body,
                    protocol: ProtocolUsed::Http2,
                    via_nat64: false,
                });
            }
            ctx.stats.record_pool_miss();
            direct_attempt_forced(ctx, method, url, headers, next_body(), AlpnMode::Http2Only, headers_timeout, body_idle_timeout).await
        }
        Some(NegotiatedAlpn::Http1) => {
            direct_attempt_forced(ctx, method, url, headers, next_body(), AlpnMode::Http1Only, headers_timeout, body_idle_timeout).await
        }
        None => {
            let probe = direct_attempt_forced(ctx, method, url, headers, next_body(), AlpnMode::Both, headers_timeout, body_idle_timeout);
            match tokio::time::timeout(ALPN_PROBE_TIMEOUT, probe).await {
                Ok(Ok(resp)) => Ok(resp),
                Ok(Err(_)) if body_replayable => {
                    direct_attempt_forced(ctx, method, url, headers, next_body(), AlpnMode::Http1Only, headers_timeout, body_idle_timeout).await
                }
                Ok(Err(e)) => Err(e),
                Err(_) if body_replayable => {
                    direct_attempt_forced(ctx, method, url, headers, next_body(), AlpnMode::Http1Only, headers_timeout, body_idle_timeout).await
                }
                Err(_) => Err(Error::timeout()),
            }
        }
    }
}

/// fast-h1 strategy's direct path: HTTP/1.1 only, no memo/pool consulted.
pub async fn fast_h1_direct_attempt(
    ctx: &EngineContext,
    method: &Method,
    url: &ParsedUrl,
    headers: &[(String, String)],
    body: RequestBody,
    headers_timeout: Option<Duration>,
    body_idle_timeout: Option<Duration>,
) -> Result<Response> {
    direct_attempt_forced(ctx, method, url, headers, body, AlpnMode::Http1Only, headers_timeout, body_idle_timeout).await
}

#[allow(clippy::too_many_arguments)]
async fn nat64_attempt_single(
    ctx: &EngineContext,
    prefix: &str,
    literal: &str,
    port: u16,
    hostname: &str,
    method: &Method,
    url: &ParsedUrl,
    headers: &[(String, String)],
    body: RequestBody,
    mode: AlpnMode,
    guard: Duration,
    headers_timeout: Option<Duration>,
    body_idle_timeout: Option<Duration>,
) -> Result<Response> {
    let start = Instant::now();
    let tcp = socket::connect_nat64_literal(literal, port, guard).await;
    let result = match tcp {
        Ok(tcp) => {
            send_over_tls(
                ctx,
                tcp,
                hostname.to_string(),
                port,
                method,
                url,
                headers,
                body,
                mode,
                Some(literal.to_string()),
                headers_timeout,
                body_idle_timeout,
            )
            .await
        }
        Err(e) => Err(e),
    };
    ctx.nat64.record(prefix, result.is_ok(), start.elapsed());
    tracing::debug!(prefix, host = hostname, ok = result.is_ok(), elapsed_ms = start.elapsed().as_millis() as u64, "nat64 candidate attempt");
    result
}

/// NAT64 hedged retry (spec §4.9's M2/M3 strategy): rank candidate prefixes,
/// then run them serially, strictly serially, or hedged in parallel
/// depending on method idempotency, body replayability, and candidate count.
#[allow(clippy::too_many_arguments)]
pub async fn nat64_hedged(
    ctx: &EngineContext,
    method: &Method,
    url: &ParsedUrl,
    headers: &[(String, String)],
    mut next_body: impl FnMut() -> RequestBody,
    body_replayable: bool,
    addr: Ipv4Addr,
    mode: AlpnMode,
    headers_timeout: Option<Duration>,
    body_idle_timeout: Option<Duration>,
) -> Result<Response> {
    let guard = ctx.config.network.nat64_candidate_guard;
    let hedge_delay = ctx.config.network.nat64_hedge_delay;
    let k = ctx.config.network.nat64_hedge_candidates.max(1);
    let candidates = ctx.nat64.ranked_candidates(addr, k);
    if candidates.is_empty() {
        return Err(Error::nat64_exhausted("no NAT64 prefixes configured"));
    }
    tracing::debug!(host = %url.hostname, candidates = candidates.len(), "starting nat64 hedged retry");

    let hostname = url.hostname.clone();
    let port = url.port;
    let can_hedge = body_replayable && is_idempotent(method) && candidates.len() >= 2;

    let mut last_err: Option<Error> = None;
    let mut remaining_start = 0;

    if can_hedge {
        let (p0, l0) = candidates[0].clone();
        let (p1, l1) = candidates[1].clone();
        let body0 = next_body();
        let body1 = next_body();

        let ctx0 = ctx.clone();
        let ctx1 = ctx.clone();
        let method0 = method.clone();
        let method1 = method.clone();
        let url0 = url.clone();
        let url1 = url.clone();
        let headers0 = headers.to_vec();
        let headers1 = headers.to_vec();
        let hostname0 = hostname.clone();
        let hostname1 = hostname.clone();

        let mut task0 = tokio::spawn(async move {
            nat64_attempt_single(&ctx0, &p0, &l0, port, &hostname0, &method0, &url0, &headers0, body0, mode, guard, headers_timeout, body_idle_timeout).await
        });
        let mut task1 = tokio::spawn(async move {
            tokio::time::sleep(hedge_delay).await;
            nat64_attempt_single(&ctx1, &p1, &l1, port, &hostname1, &method1, &url1, &headers1, body1, mode, guard, headers_timeout, body_idle_timeout).await
        });

        let winner: Option<Response> = tokio::select! {
            r0 = &mut task0 => match r0 {
                Ok(Ok(resp)) => {
                    task1.abort();
                    ctx.stats.record_nat64_hedge_win();
                    Some(resp)
                }
                Ok(Err(e0)) => match task1.await {
                    Ok(Ok(resp1)) => {
                        ctx.stats.record_nat64_hedge_win();
                        Some(resp1)
                    }
                    Ok(Err(e1)) => { last_err = Some(e1); ctx.stats.record_nat64_hedge_loss(); None }
                    Err(_) => { last_err = Some(e0); None }
                },
                Err(_) => task1.await.ok().and_then(Result::ok),
            },
            r1 = &mut task1 => match r1 {
                Ok(Ok(resp)) => {
                    task0.abort();
                    ctx.stats.record_nat64_hedge_win();
                    Some(resp)
                }
                Ok(Err(e1)) => match task0.await {
                    Ok(Ok(resp0)) => {
                        ctx.stats.record_nat64_hedge_win();
                        Some(resp0)
                    }
                    Ok(Err(e0)) => { last_err = Some(e0); ctx.stats.record_nat64_hedge_loss(); None }
                    Err(_) => { last_err = Some(e1); None }
                },
                Err(_) => task0.await.ok().and_then(Result::ok),
            },
        };

        if let Some(resp) = winner {
            return Ok(resp);
        }
        remaining_start = 2;
    }

    for (prefix, literal) in &candidates[remaining_start.min(candidates.len())..] {
        match nat64_attempt_single(ctx, prefix, literal, port, &hostname, method, url, headers, next_body(), mode, guard, headers_timeout, body_idle_timeout).await {
            Ok(resp) => return Ok(resp),
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.unwrap_or_else(|| Error::nat64_exhausted("all NAT64 candidates failed")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpn_mode_from_preference_maps_auto_to_both() {
        assert!(matches!(AlpnMode::from_preference(ProtocolPreference::Auto), AlpnMode::Both));
        assert!(matches!(AlpnMode::from_preference(ProtocolPreference::Http2Only), AlpnMode::Http2Only));
    }

    #[test]
    fn get_head_options_put_delete_are_idempotent() {
        assert!(is_idempotent(&Method::GET));
        assert!(is_idempotent(&Method::PUT));
        assert!(!is_idempotent(&Method::POST));
        assert!(!is_idempotent(&Method::PATCH));
    }

    #[tokio::test]
    async fn classify_reports_cdn_for_known_range() {
        let ctx = EngineContext::default();
        // No real DoH transport available in tests; DoH failure classifies
        // as "not CDN, try direct" per spec §9's documented fallback.
        let classification = classify(&ctx, "nonexistent.invalid.example").await;
        assert!(!classification.is_cdn);
        assert!(classification.resolved_addr.is_none());
    }
}
