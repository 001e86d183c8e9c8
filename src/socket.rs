//! L1 — byte socket (spec §4.1): the only thing allowed to call the host's
//! raw TCP connect primitive. Everything above this layer only ever sees
//! `AsyncRead + AsyncWrite`.

use std::net::{Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpStream;

use crate::error::{Error, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Abstraction over "open a TCP connection to this address" so the rest of
/// the engine never depends on `tokio::net` directly — swappable in tests
/// for a loopback pair or a fake listener.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, addr: SocketAddr) -> Result<TcpStream>;
}

pub struct TokioConnector;

#[async_trait::async_trait]
impl Connector for TokioConnector {
    async fn connect(&self, addr: SocketAddr) -> Result<TcpStream> {
        connect_with_guard(addr).await
    }
}

/// Race the raw connect against a 30-second guard (spec §4.1: "a host
/// connect that never resolves must not hang the caller forever").
pub async fn connect_with_guard(addr: SocketAddr) -> Result<TcpStream> {
    match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            let _ = stream.set_nodelay(true);
            Ok(stream)
        }
        Ok(Err(e)) => Err(Error::from(e)),
        Err(_) => Err(Error::timeout()),
    }
}

/// Direct connect by hostname, leaving resolution to the host platform's own
/// resolver rather than the DoH cache (spec §4.9 strategy step 1: a direct
/// attempt for a non-CDN-classified origin uses the sandbox's built-in
/// resolution, not the address this engine resolved for CDN classification).
pub async fn connect_host_with_guard(host: &str, port: u16) -> Result<TcpStream> {
    match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            let _ = stream.set_nodelay(true);
            Ok(stream)
        }
        Ok(Err(e)) => Err(Error::from(e)),
        Err(_) => Err(Error::timeout()),
    }
}

/// Connect to a NAT64-synthesized literal of the form `[hex:hex:...]`
/// produced by [`crate::nat64::synthesize`], under the shorter per-prefix
/// guard used during hedged NAT64 retry (spec §4.9).
pub async fn connect_nat64_literal(literal: &str, port: u16, guard: Duration) -> Result<TcpStream> {
    let inner = literal.strip_prefix('[').and_then(|s| s.strip_suffix(']')).unwrap_or(literal);
    let addr6: Ipv6Addr = inner.parse().map_err(|_| Error::connect(format!("invalid NAT64 literal: {literal}")))?;
    let addr = SocketAddr::from((addr6, port));
    match tokio::time::timeout(guard, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            let _ = stream.set_nodelay(true);
            Ok(stream)
        }
        Ok(Err(e)) => Err(Error::from(e)),
        Err(_) => Err(Error::timeout()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connects_to_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });
        let stream = connect_with_guard(addr).await.unwrap();
        drop(stream);
        accept.await.unwrap();
    }

    #[tokio::test]
    async fn connect_to_dead_port_fails() {
        // Port 0 is never listening once bound and dropped; pick an
        // unassigned high port on loopback instead to keep this hermetic.
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let result = tokio::time::timeout(Duration::from_secs(2), connect_with_guard(addr)).await;
        assert!(result.is_err() || result.unwrap().is_err());
    }

    #[tokio::test]
    async fn connects_to_local_listener_by_hostname() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });
        let stream = connect_host_with_guard("127.0.0.1", port).await.unwrap();
        drop(stream);
        accept.await.unwrap();
    }

    #[tokio::test]
    async fn rejects_malformed_nat64_literal() {
        let result = connect_nat64_literal("[not-an-ipv6]", 443, Duration::from_millis(50)).await;
        assert!(result.is_err());
    }
}
