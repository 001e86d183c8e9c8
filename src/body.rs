//! Request/response body abstractions: pull-driven, so a stream with a slow
//! consumer never forces the whole payload into memory.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;

/// An outbound request body. `Streamed` is fed by the caller through the
/// paired `mpsc::Sender` returned from [`streamed`]. `Text` is kept distinct
/// from `Full` (rather than pre-encoded to bytes) so the dispatcher can tell
/// a string body apart from an opaque byte body and default its
/// content-type accordingly (spec §4.2).
pub enum RequestBody {
    Empty,
    Full(Bytes),
    Text(String),
    Streamed(mpsc::Receiver<Result<Bytes>>),
}

impl RequestBody {
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let bytes = data.into();
        if bytes.is_empty() { RequestBody::Empty } else { RequestBody::Full(bytes) }
    }

    #[must_use]
    pub fn from_text(data: impl Into<String>) -> Self {
        let s = data.into();
        if s.is_empty() { RequestBody::Empty } else { RequestBody::Text(s) }
    }

    /// Create a streamed body plus the sender side the caller feeds chunks
    /// into, bounded so a fast producer can't outrun a slow connection.
    #[must_use]
    pub fn streamed(buffer: usize) -> (Self, mpsc::Sender<Result<Bytes>>) {
        let (tx, rx) = mpsc::channel(buffer);
        (RequestBody::Streamed(rx), tx)
    }

    #[must_use]
    pub fn known_length(&self) -> Option<u64> {
        match self {
            RequestBody::Empty => Some(0),
            RequestBody::Full(b) => Some(b.len() as u64),
            RequestBody::Text(s) => Some(s.len() as u64),
            RequestBody::Streamed(_) => None,
        }
    }

    /// Pull the next chunk. Returns `Ok(None)` once the body is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        match self {
            RequestBody::Empty => Ok(None),
            RequestBody::Full(b) => {
                if b.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(std::mem::take(b)))
                }
            }
            RequestBody::Text(s) => {
                if s.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Bytes::from(std::mem::take(s))))
                }
            }
            RequestBody::Streamed(rx) => rx.recv().await.transpose(),
        }
    }
}

/// An inbound response body, fed by the protocol layer (H1 or H2) as data
/// frames/chunks arrive.
pub struct ResponseBody {
    rx: mpsc::Receiver<Result<Bytes>>,
}

impl ResponseBody {
    #[must_use]
    pub fn new(rx: mpsc::Receiver<Result<Bytes>>) -> Self {
        ResponseBody { rx }
    }

    #[must_use]
    pub fn empty() -> Self {
        let (_tx, rx) = mpsc::channel(1);
        ResponseBody { rx }
    }

    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        self.rx.recv().await.transpose()
    }

    /// Buffer the entire remaining body. Convenience for callers that don't
    /// need streaming; large responses should prefer [`Self::chunk`].
    pub async fn collect(mut self) -> Result<Bytes> {
        let mut out = Vec::new();
        while let Some(chunk) = self.chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_body_yields_once_then_ends() {
        let mut body = RequestBody::from_bytes(Bytes::from_static(b"hello"));
        assert_eq!(body.next_chunk().await.unwrap().unwrap(), Bytes::from_static(b"hello"));
        assert!(body.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn streamed_body_round_trips_chunks_in_order() {
        let (mut body, tx) = RequestBody::streamed(4);
        tx.send(Ok(Bytes::from_static(b"a"))).await.unwrap();
        tx.send(Ok(Bytes::from_static(b"b"))).await.unwrap();
        drop(tx);
        assert_eq!(body.next_chunk().await.unwrap().unwrap(), Bytes::from_static(b"a"));
        assert_eq!(body.next_chunk().await.unwrap().unwrap(), Bytes::from_static(b"b"));
        assert!(body.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn response_body_collect_concatenates() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(Ok(Bytes::from_static(b"foo"))).await.unwrap();
        tx.send(Ok(Bytes::from_static(b"bar"))).await.unwrap();
        drop(tx);
        let body = ResponseBody::new(rx);
        assert_eq!(body.collect().await.unwrap(), Bytes::from_static(b"foobar"));
    }
}
