//! L9 — H2 client facade: turns a negotiated duplex connection into
//! something the dispatcher can send whole requests over.

use std::time::Duration;

use http::{HeaderMap, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};

use super::connection::{self, ConnCommand, Settings};
use super::stream::StreamCommand;
use crate::body::{RequestBody, ResponseBody};
use crate::config::PerformanceConfig;
use crate::error::{Error, Result};
use crate::url::ParsedUrl;

/// A handle to one live H2 connection. Cheap to clone; every clone shares
/// the same underlying socket and HPACK state via the connection actor.
#[derive(Clone)]
pub struct H2Client {
    commands_tx: mpsc::Sender<ConnCommand>,
}

pub struct H2Response {
    pub status: StatusCode,
    /// H2 carries no reason phrase (RFC 7540 §8.1.2.4); always empty.
    pub status_text: String,
    pub headers: HeaderMap,
    pub raw_headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl H2Client {
    /// Take ownership of an already-connected, already-ALPN-negotiated h2
    /// duplex stream and start its connection actor, advertising the given
    /// performance settings (spec §4.8: 2 MiB initial stream window, 64
    /// KiB max frame size, raised connection window).
    #[must_use]
    pub fn with_config<T>(io: T, perf: &PerformanceConfig) -> Self
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let commands_tx =
            connection::spawn(io, Settings::advertised(perf), perf.h2_connection_window_target);
        H2Client { commands_tx }
    }

    /// Convenience constructor using default performance settings.
    #[must_use]
    pub fn new<T>(io: T) -> Self
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::with_config(io, &PerformanceConfig::default())
    }

    /// Send one request and return as soon as response headers arrive; the
    /// body streams independently. `headers_timeout` bounds the wait for
    /// response headers; `body_idle_timeout` bounds the gap between
    /// successive body chunks (spec §4.9).
    pub async fn send(
        &self,
        method: &http::Method,
        url: &ParsedUrl,
        extra_headers: &[(String, String)],
        mut body: RequestBody,
        headers_timeout: Option<Duration>,
        body_idle_timeout: Option<Duration>,
    ) -> Result<H2Response> {
        let mut header_list = vec![
            (":method".to_string(), method.as_str().to_string()),
            (":scheme".to_string(), url.scheme.as_str().to_string()),
            (":authority".to_string(), url.hostname.clone()),
            (":path".to_string(), url.path_and_query.clone()),
        ];
        for (name, value) in extra_headers {
            header_list.push((name.to_ascii_lowercase(), value.clone()));
        }

        let body_known_empty = matches!(body.known_length(), Some(0));

        let (respond_to, respond_rx) = oneshot::channel();
        self.commands_tx
            .send(ConnCommand::Request { header_list, body_known_empty, respond_to })
            .await
            .map_err(|_| Error::connect("h2 client connection is closed"))?;

        let handle = respond_rx
            .await
            .map_err(|_| Error::connect("h2 connection actor dropped the response"))??;
        let stream_id = handle.stream_id;
        let commands_tx = handle.commands_tx.clone();

        if !body_known_empty {
            let commands_tx = commands_tx.clone();
            tokio::spawn(async move {
                while let Ok(Some(chunk)) = body.next_chunk().await {
                    if commands_tx.send(StreamCommand::Data(chunk)).await.is_err() {
                        return;
                    }
                }
                let _ = commands_tx.send(StreamCommand::EndData).await;
            });
        }

        let headers_rx = handle.headers_rx;
        let (status, headers, raw_headers) = match headers_timeout {
            Some(d) => match tokio::time::timeout(d, headers_rx).await {
                Ok(r) => r.map_err(|_| Error::connect("h2 stream closed before headers arrived"))??,
                Err(_) => {
                    let _ = commands_tx.send(StreamCommand::Cancel(stream_id)).await;
                    return Err(Error::timeout());
                }
            },
            None => headers_rx
                .await
                .map_err(|_| Error::connect("h2 stream closed before headers arrived"))??,
        };

        let body_rx = watchdog_body(stream_id, handle.body_rx, commands_tx, body_idle_timeout);
        Ok(H2Response { status, status_text: String::new(), headers, raw_headers, body: ResponseBody::new(body_rx) })
    }

    pub async fn shutdown(&self) {
        let _ = self.commands_tx.send(ConnCommand::Shutdown).await;
    }

    /// True once the connection actor has torn down (socket closed, GOAWAY
    /// drained, or an unrecoverable protocol error) — the pool treats this
    /// as a miss rather than handing out a dead client.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands_tx.is_closed()
    }
}

/// Forward body chunks into a fresh channel, cancelling the stream and
/// surfacing a timeout error if no chunk arrives within `idle_timeout` of
/// the previous one (spec §4.9's per-stream body-idle timer).
fn watchdog_body(
    stream_id: u32,
    mut body_rx: mpsc::Receiver<Result<bytes::Bytes>>,
    commands_tx: mpsc::Sender<StreamCommand>,
    idle_timeout: Option<Duration>,
) -> mpsc::Receiver<Result<bytes::Bytes>> {
    let Some(idle_timeout) = idle_timeout else {
        return body_rx;
    };
    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(async move {
        loop {
            match tokio::time::timeout(idle_timeout, body_rx.recv()).await {
                Ok(Some(item)) => {
                    if tx.send(item).await.is_err() {
                        return;
                    }
                }
                Ok(None) => return,
                Err(_) => {
                    let _ = commands_tx.send(StreamCommand::Cancel(stream_id)).await;
                    let _ = tx.send(Err(Error::timeout())).await;
                    return;
                }
            }
        }
    });
    rx
}
