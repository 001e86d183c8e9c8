//! L2 — sans-IO TLS session (spec §4.2). `rustls::ClientConnection` does no
//! I/O itself; this module is the driver loop that feeds it ciphertext from
//! the socket and pulls ciphertext back out, exposing a plain
//! `AsyncRead + AsyncWrite` to L3/L4 above.

use std::io;
use std::io::Read as _;
use std::pin::Pin;
use std::sync::{Arc, Once};
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::error::{Error, Result};

const HANDSHAKE_READ_CHUNK: usize = 4096;

/// Negotiated outcome exposed once the handshake completes: which protocol
/// ALPN picked, so the connection strategy layer knows whether it got H2 or
/// fell back to H1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiatedProtocol {
    Http2,
    Http11,
    Unspecified,
}

pub struct TlsSession<T> {
    io: T,
    conn: ClientConnection,
}

impl<T> TlsSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub async fn handshake(
        io: T,
        server_name: ServerName<'static>,
        config: Arc<ClientConfig>,
    ) -> Result<Self> {
        let conn = ClientConnection::new(config, server_name)
            .map_err(|e| Error::tls(format!("failed to start TLS session: {e}")))?;
        let mut session = TlsSession { io, conn };
        loop {
            flush_pending_writes(&mut session.conn, &mut session.io).await?;
            if !session.conn.is_handshaking() {
                break;
            }
            pull_ciphertext(&mut session.conn, &mut session.io).await?;
        }
        // Rustls can still want a final write (e.g. the client Finished
        // message) after `is_handshaking()` flips false.
        flush_pending_writes(&mut session.conn, &mut session.io).await?;
        tracing::debug!(alpn = ?session.negotiated_protocol(), "tls handshake finished");
        Ok(session)
    }

    #[must_use]
    pub fn negotiated_protocol(&self) -> NegotiatedProtocol {
        match self.conn.alpn_protocol() {
            Some(p) if p == b"h2" => NegotiatedProtocol::Http2,
            Some(p) if p == b"http/1.1" => NegotiatedProtocol::Http11,
            _ => NegotiatedProtocol::Unspecified,
        }
    }
}

async fn flush_pending_writes<T: AsyncWrite + Unpin>(conn: &mut ClientConnection, io: &mut T) -> Result<()> {
    use tokio::io::AsyncWriteExt;
    while conn.wants_write() {
        let mut buf = Vec::new();
        conn.write_tls(&mut buf).map_err(|e| Error::tls(format!("tls write_tls failed: {e}")))?;
        if !buf.is_empty() {
            io.write_all(&buf).await?;
        } else {
            break;
        }
    }
    Ok(())
}

async fn pull_ciphertext<T: AsyncRead + Unpin>(conn: &mut ClientConnection, io: &mut T) -> Result<()> {
    use tokio::io::AsyncReadExt;
    let mut buf = vec![0u8; HANDSHAKE_READ_CHUNK];
    let n = io.read(&mut buf).await?;
    if n == 0 {
        return Err(Error::tls("peer closed connection during TLS handshake"));
    }
    let mut cursor = &buf[..n];
    conn.read_tls(&mut cursor).map_err(|e| Error::tls(format!("tls read_tls failed: {e}")))?;
    conn.process_new_packets().map_err(|e| Error::tls(format!("tls record processing failed: {e}")))?;
    Ok(())
}

impl<T> AsyncRead for TlsSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            let mut reader = this.conn.reader();
            match reader.read(buf.initialize_unfilled()) {
                Ok(0) => return Poll::Ready(Ok(())),
                Ok(n) => {
                    buf.advance(n);
                    return Poll::Ready(Ok(()));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => return Poll::Ready(Err(e)),
            }

            // Need more ciphertext from the socket before more plaintext is
            // available.
            let mut raw = [0u8; HANDSHAKE_READ_CHUNK];
            let mut read_buf = ReadBuf::new(&mut raw);
            match Pin::new(&mut this.io).poll_read(cx, &mut read_buf) {
                Poll::Ready(Ok(())) => {
                    let filled = read_buf.filled();
                    if filled.is_empty() {
                        return Poll::Ready(Ok(())); // EOF
                    }
                    let mut cursor = filled;
                    if let Err(e) = this.conn.read_tls(&mut cursor) {
                        return Poll::Ready(Err(io::Error::new(io::ErrorKind::InvalidData, e)));
                    }
                    if let Err(e) = this.conn.process_new_packets() {
                        return Poll::Ready(Err(io::Error::new(io::ErrorKind::InvalidData, e)));
                    }
                }
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<T> AsyncWrite for TlsSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, data: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let written = match io::Write::write(&mut this.conn.writer(), data) {
            Ok(n) => n,
            Err(e) => return Poll::Ready(Err(e)),
        };
        // Best-effort flush of the resulting ciphertext; if the underlying
        // socket can't take it all right now the bytes stay buffered inside
        // rustls and go out on the next poll_write/poll_flush.
        while this.conn.wants_write() {
            let mut out = Vec::new();
            if let Err(e) = this.conn.write_tls(&mut out) {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, e)));
            }
            if out.is_empty() {
                break;
            }
            let mut offset = 0;
            while offset < out.len() {
                match Pin::new(&mut this.io).poll_write(cx, &out[offset..]) {
                    Poll::Ready(Ok(0)) => {
                        return Poll::Ready(Err(io::Error::new(
                            io::ErrorKind::WriteZero,
                            "underlying socket wrote zero bytes",
                        )));
                    }
                    Poll::Ready(Ok(n)) => offset += n,
                    Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                    Poll::Pending => return Poll::Ready(Ok(written)),
                }
            }
        }
        Poll::Ready(Ok(written))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        while this.conn.wants_write() {
            let mut out = Vec::new();
            if let Err(e) = this.conn.write_tls(&mut out) {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, e)));
            }
            if out.is_empty() {
                break;
            }
            let mut offset = 0;
            while offset < out.len() {
                match Pin::new(&mut this.io).poll_write(cx, &out[offset..]) {
                    Poll::Ready(Ok(n)) => offset += n,
                    Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                    Poll::Pending => return Poll::Pending,
                }
            }
        }
        Pin::new(&mut this.io).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.conn.send_close_notify();
        Pin::new(&mut this.io).poll_shutdown(cx)
    }
}

static INSTALL_CRYPTO_PROVIDER: Once = Once::new();

/// Build the `ClientConfig` shared by every TLS session: webpki-roots trust
/// anchors, both `h2` and `http/1.1` offered via ALPN (spec §4.2).
#[must_use]
pub fn build_client_config() -> Arc<ClientConfig> {
    build_client_config_with_alpn(&[b"h2", b"http/1.1"])
}

/// Same trust anchors, but restricted to the given ALPN offer — used when
/// the protocol memo or an explicit `protocol` preference already settled
/// which wire format to request (spec §4.9: "open one with ALPN `h2` only").
#[must_use]
pub fn build_client_config_with_alpn(alpn_protocols: &[&[u8]]) -> Arc<ClientConfig> {
    INSTALL_CRYPTO_PROVIDER.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
    let root_store = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let mut config = ClientConfig::builder().with_root_certificates(root_store).with_no_client_auth();
    config.alpn_protocols = alpn_protocols.iter().map(|p| p.to_vec()).collect();
    Arc::new(config)
}
