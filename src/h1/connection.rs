//! Drives one request/response cycle over an HTTP/1.1 connection. A
//! connection handles exactly one request at a time (no pipelining); the
//! body is drained by a background task that owns the socket for the rest
//! of its lifetime, so keep-alive reuse happens at the pool layer between
//! whole requests, not mid-body.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Method, StatusCode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::chunked::ChunkedDecoder;
use super::codec::{encode_request_head, parse_response_head, BodyFraming, ResponseHead};
use crate::body::{RequestBody, ResponseBody};
use crate::error::{Error, Result};
use crate::url::ParsedUrl;

const READ_CHUNK: usize = 16 * 1024;

/// A parsed response head plus the body channel, as handed back to the
/// dispatcher (spec §4.3/§6: `status_text`/`raw_headers` preserved
/// alongside the merged `HeaderMap`).
pub struct H1Response {
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub raw_headers: Vec<(String, String)>,
    pub keep_alive: bool,
    pub body: ResponseBody,
}

/// Send one request over `io` and parse the response head. The body is
/// drained by a background task so the caller can start reading before the
/// whole payload has arrived. `headers_timeout` bounds the wait for the
/// response head; `body_idle_timeout` bounds the gap between successive
/// body reads (spec §4.9: "headers-timeout and body-timeout apply per
/// attempt").
pub async fn send_request<T>(
    mut io: T,
    method: &Method,
    url: &ParsedUrl,
    headers: &[(String, String)],
    mut body: RequestBody,
    headers_timeout: Option<Duration>,
    body_idle_timeout: Option<Duration>,
) -> Result<H1Response>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let body_len = body.known_length();
    let head = encode_request_head(method, url, headers, body_len);
    io.write_all(&head).await?;

    match body_len {
        Some(0) => {}
        Some(_) => {
            while let Some(chunk) = body.next_chunk().await? {
                io.write_all(&chunk).await?;
            }
        }
        None => {
            while let Some(chunk) = body.next_chunk().await? {
                io.write_all(format!("{:x}\r\n", chunk.len()).as_bytes()).await?;
                io.write_all(&chunk).await?;
                io.write_all(b"\r\n").await?;
            }
            io.write_all(b"0\r\n\r\n").await?;
        }
    }
    io.flush().await?;

    let (head, leftover) = match headers_timeout {
        Some(d) => tokio::time::timeout(d, read_response_head(&mut io)).await.map_err(|_| Error::timeout())??,
        None => read_response_head(&mut io).await?,
    };

    let (body_tx, body_rx) = mpsc::channel(32);
    let keep_alive = head.keep_alive;
    let framing = head.framing;

    tokio::spawn(async move {
        let _ = pump_body(&mut io, leftover, framing, &body_tx, body_idle_timeout).await;
    });

    Ok(H1Response {
        status: head.status,
        status_text: head.status_text,
        headers: head.headers,
        raw_headers: head.raw_headers,
        keep_alive,
        body: ResponseBody::new(body_rx),
    })
}

/// Read and parse the response head, transparently discarding any `100
/// Continue` interim responses and resuming from the buffered remainder
/// (spec §4.3) until a non-1xx-informational head is parsed.
async fn read_response_head<T: AsyncRead + Unpin>(io: &mut T) -> Result<(ResponseHead, BytesMut)> {
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        let (head, consumed) = loop {
            if let Some((head, consumed)) = parse_response_head(&buf)? {
                break (head, consumed);
            }
            let mut chunk = [0u8; READ_CHUNK];
            let n = io.read(&mut chunk).await?;
            if n == 0 {
                return Err(Error::protocol("connection closed before response headers completed"));
            }
            buf.extend_from_slice(&chunk[..n]);
        };
        let leftover = buf.split_off(consumed);
        if head.status == StatusCode::CONTINUE {
            buf = leftover;
            continue;
        }
        return Ok((head, leftover));
    }
}

async fn pump_body<T: AsyncRead + Unpin>(
    io: &mut T,
    leftover: BytesMut,
    framing: BodyFraming,
    body_tx: &mpsc::Sender<Result<Bytes>>,
    idle_timeout: Option<Duration>,
) -> Result<()> {
    match framing {
        BodyFraming::None => Ok(()),
        BodyFraming::ContentLength(len) => pump_content_length(io, leftover, len, body_tx, idle_timeout).await,
        BodyFraming::Chunked => pump_chunked(io, leftover, body_tx, idle_timeout).await,
        BodyFraming::UntilClose => pump_until_close(io, leftover, body_tx, idle_timeout).await,
    }
}

/// Read one chunk, racing it against `idle_timeout` if set. The timer
/// resets on every call, so it bounds the gap between reads rather than
/// the whole body transfer.
async fn read_with_idle_timeout<T: AsyncRead + Unpin>(
    io: &mut T,
    buf: &mut [u8],
    idle_timeout: Option<Duration>,
) -> Result<usize> {
    match idle_timeout {
        Some(d) => tokio::time::timeout(d, io.read(buf)).await.map_err(|_| Error::timeout())?.map_err(Error::from),
        None => io.read(buf).await.map_err(Error::from),
    }
}

async fn pump_content_length<T: AsyncRead + Unpin>(
    io: &mut T,
    mut leftover: BytesMut,
    len: u64,
    body_tx: &mpsc::Sender<Result<Bytes>>,
    idle_timeout: Option<Duration>,
) -> Result<()> {
    let mut remaining = len;
    if !leftover.is_empty() {
        let take = (remaining as usize).min(leftover.len());
        let chunk = leftover.split_to(take).freeze();
        remaining -= take as u64;
        if !chunk.is_empty() {
            let _ = body_tx.send(Ok(chunk)).await;
        }
    }
    let mut buf = vec![0u8; READ_CHUNK];
    while remaining > 0 {
        let n = match read_with_idle_timeout(io, &mut buf, idle_timeout).await {
            Ok(n) => n,
            Err(e) => {
                let _ = body_tx.send(Err(e.clone())).await;
                return Err(e);
            }
        };
        if n == 0 {
            let err = Error::body_framing("connection closed before content-length satisfied");
            let _ = body_tx.send(Err(err)).await;
            return Err(Error::body_framing("connection closed before content-length satisfied"));
        }
        let take = (remaining as usize).min(n);
        let _ = body_tx.send(Ok(Bytes::copy_from_slice(&buf[..take]))).await;
        remaining -= take as u64;
    }
    Ok(())
}

async fn pump_chunked<T: AsyncRead + Unpin>(
    io: &mut T,
    leftover: BytesMut,
    body_tx: &mpsc::Sender<Result<Bytes>>,
    idle_timeout: Option<Duration>,
) -> Result<()> {
    let mut decoder = ChunkedDecoder::new();
    let mut pending = leftover.freeze();
    loop {
        let chunks = decoder.feed(&mut pending)?;
        for c in chunks {
            if !c.is_empty() {
                let _ = body_tx.send(Ok(c)).await;
            }
        }
        if decoder.is_done() {
            return Ok(());
        }
        let mut buf = vec![0u8; READ_CHUNK];
        let n = match read_with_idle_timeout(io, &mut buf, idle_timeout).await {
            Ok(n) => n,
            Err(e) => {
                let _ = body_tx.send(Err(e.clone())).await;
                return Err(e);
            }
        };
        if n == 0 {
            let err = Error::body_framing("connection closed mid-chunk");
            let _ = body_tx.send(Err(Error::body_framing("connection closed mid-chunk"))).await;
            return Err(err);
        }
        let mut combined = BytesMut::with_capacity(pending.len() + n);
        combined.extend_from_slice(&pending);
        combined.extend_from_slice(&buf[..n]);
        pending = combined.freeze();
    }
}

async fn pump_until_close<T: AsyncRead + Unpin>(
    io: &mut T,
    mut leftover: BytesMut,
    body_tx: &mpsc::Sender<Result<Bytes>>,
    idle_timeout: Option<Duration>,
) -> Result<()> {
    if !leftover.is_empty() {
        let _ = body_tx.send(Ok(leftover.split().freeze())).await;
    }
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = match read_with_idle_timeout(io, &mut buf, idle_timeout).await {
            Ok(n) => n,
            Err(e) => {
                let _ = body_tx.send(Err(e.clone())).await;
                return Err(e);
            }
        };
        if n == 0 {
            return Ok(());
        }
        let _ = body_tx.send(Ok(Bytes::copy_from_slice(&buf[..n]))).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn full_request_response_cycle_content_length() {
        let (client_io, mut server_io) = duplex(4096);

        let server = tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            let n = server_io.read(&mut buf).await.unwrap();
            let req = String::from_utf8_lossy(&buf[..n]);
            assert!(req.starts_with("GET /items HTTP/1.1\r\n"));
            server_io
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello")
                .await
                .unwrap();
            server_io.flush().await.unwrap();
        });

        let url = ParsedUrl::parse("http://example.com/items").unwrap();
        let resp = send_request(client_io, &Method::GET, &url, &[], RequestBody::Empty, None, None)
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.status_text, "OK");
        assert!(resp.keep_alive);
        let collected = resp.body.collect().await.unwrap();
        assert_eq!(collected, Bytes::from_static(b"hello"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn interim_100_continue_is_discarded_before_final_head() {
        let (client_io, mut server_io) = duplex(4096);
        let server = tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            let _ = server_io.read(&mut buf).await.unwrap();
            server_io
                .write_all(b"HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok")
                .await
                .unwrap();
            server_io.flush().await.unwrap();
        });

        let url = ParsedUrl::parse("http://example.com/").unwrap();
        let resp = send_request(client_io, &Method::GET, &url, &[], RequestBody::Empty, None, None)
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        let collected = resp.body.collect().await.unwrap();
        assert_eq!(collected, Bytes::from_static(b"ok"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn chunked_response_body_decodes_correctly() {
        let (client_io, mut server_io) = duplex(4096);
        let server = tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            let _ = server_io.read(&mut buf).await.unwrap();
            server_io
                .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\ndata\r\n0\r\n\r\n")
                .await
                .unwrap();
            server_io.flush().await.unwrap();
        });

        let url = ParsedUrl::parse("http://example.com/").unwrap();
        let resp = send_request(client_io, &Method::GET, &url, &[], RequestBody::Empty, None, None)
            .await
            .unwrap();
        let collected = resp.body.collect().await.unwrap();
        assert_eq!(collected, Bytes::from_static(b"data"));
        server.await.unwrap();
    }
}
