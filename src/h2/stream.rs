//! L7 — per-stream state machine (RFC 7540 §5.1).
//!
//! Streams opened by this client only ever take the client-initiated path:
//! idle -> open -> half-closed (local or remote) -> closed. Server push is
//! not supported (spec Non-goals), so PUSH_PROMISE is rejected on receipt.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

impl StreamState {
    /// Transition after this side sends a frame with `END_STREAM` set (or
    /// the request had no body and headers themselves carried it).
    #[must_use]
    pub fn on_send_end_stream(self) -> StreamState {
        match self {
            StreamState::Idle | StreamState::Open => StreamState::HalfClosedLocal,
            StreamState::HalfClosedRemote => StreamState::Closed,
            other => other,
        }
    }

    /// Transition on sending the initial request headers (no END_STREAM).
    #[must_use]
    pub fn on_send_headers(self) -> StreamState {
        match self {
            StreamState::Idle => StreamState::Open,
            other => other,
        }
    }

    /// Transition after the peer sends a frame with `END_STREAM` set.
    #[must_use]
    pub fn on_recv_end_stream(self) -> StreamState {
        match self {
            StreamState::Idle | StreamState::Open => StreamState::HalfClosedRemote,
            StreamState::HalfClosedLocal => StreamState::Closed,
            other => other,
        }
    }

    #[must_use]
    pub fn can_send_data(self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedRemote)
    }

    #[must_use]
    pub fn can_recv_data(self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedLocal)
    }

    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, StreamState::Closed)
    }
}

/// Commands a [`super::client::H2Client`] handle sends into the connection
/// actor to drive its side of one stream.
pub enum StreamCommand {
    Data(Bytes),
    EndData,
    Cancel(u32),
}

/// What the connection actor hands back to the caller immediately after
/// opening a stream: a future for the response headers and a body channel.
pub struct StreamHandle {
    pub stream_id: u32,
    pub headers_rx: oneshot::Receiver<Result<(StatusCode, HeaderMap, Vec<(String, String)>)>>,
    pub body_rx: mpsc::Receiver<Result<Bytes>>,
    pub commands_tx: mpsc::Sender<StreamCommand>,
}

/// Server-side bookkeeping the connection actor keeps per open stream.
pub struct StreamEntry {
    pub state: StreamState,
    pub recv_window: i64,
    pub headers_tx: Option<oneshot::Sender<Result<(StatusCode, HeaderMap, Vec<(String, String)>)>>>,
    pub body_tx: mpsc::Sender<Result<Bytes>>,
    pub response_headers_sent: bool,
}

impl StreamEntry {
    pub fn reject_with(&mut self, err: Error) {
        if let Some(tx) = self.headers_tx.take() {
            let _ = tx.send(Err(err));
        } else {
            // Headers already delivered; surface the failure through the
            // body channel instead so an in-flight read sees it.
            let body_tx = self.body_tx.clone();
            tokio::spawn(async move {
                let _ = body_tx.send(Err(err)).await;
            });
        }
        self.state = StreamState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_with_body_then_response_walks_full_lifecycle() {
        let mut s = StreamState::Idle;
        s = s.on_send_headers();
        assert_eq!(s, StreamState::Open);
        assert!(s.can_send_data());
        s = s.on_send_end_stream();
        assert_eq!(s, StreamState::HalfClosedLocal);
        assert!(!s.can_send_data());
        assert!(s.can_recv_data());
        s = s.on_recv_end_stream();
        assert_eq!(s, StreamState::Closed);
    }

    #[test]
    fn response_completes_before_request_body_finishes() {
        let mut s = StreamState::Idle.on_send_headers();
        s = s.on_recv_end_stream();
        assert_eq!(s, StreamState::HalfClosedRemote);
        assert!(s.can_send_data());
        s = s.on_send_end_stream();
        assert_eq!(s, StreamState::Closed);
    }
}
