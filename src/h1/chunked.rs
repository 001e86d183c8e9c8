//! Chunked transfer-coding decoder (RFC 7230 §4.1), spec §4.3: a
//! pull-driven state machine bounded at 16 MiB per chunk size so a
//! malicious/misbehaving peer can't make us allocate unbounded memory
//! decoding one absurd chunk-size line.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{Error, Result};

const MAX_CHUNK_SIZE: u64 = 16 * 1024 * 1024;
const MAX_CHUNK_SIZE_LINE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ChunkSize,
    ChunkData(u64),
    ChunkDataCrlf,
    TrailerHeaders,
    Done,
}

/// Decodes chunked-encoded bytes as they arrive. Feed raw socket bytes in
/// via [`Self::feed`]; get decoded body bytes and a `done` flag back.
pub struct ChunkedDecoder {
    state: State,
    line_buf: BytesMut,
}

impl ChunkedDecoder {
    #[must_use]
    pub fn new() -> Self {
        ChunkedDecoder { state: State::ChunkSize, line_buf: BytesMut::new() }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Consume as much of `input` as forms complete chunked-coding units,
    /// returning the decoded body bytes. `input` is advanced past whatever
    /// was consumed; call again with more data (or after appending) if it
    /// returns without `is_done()` becoming true.
    pub fn feed(&mut self, input: &mut Bytes) -> Result<Vec<Bytes>> {
        let mut out = Vec::new();
        loop {
            match self.state {
                State::Done => break,
                State::ChunkSize => {
                    let Some(line) = take_line(input, &mut self.line_buf, MAX_CHUNK_SIZE_LINE)?
                    else {
                        break;
                    };
                    let size_str = line.split(|&b| b == b';').next().unwrap_or(&[]);
                    let size_str = std::str::from_utf8(size_str)
                        .map_err(|_| Error::body_framing("chunk size line is not UTF-8"))?
                        .trim();
                    let size = u64::from_str_radix(size_str, 16)
                        .map_err(|_| Error::body_framing("invalid chunk size"))?;
                    if size > MAX_CHUNK_SIZE {
                        return Err(Error::body_framing("chunk size exceeds 16 MiB bound"));
                    }
                    self.state =
                        if size == 0 { State::TrailerHeaders } else { State::ChunkData(size) };
                }
                State::ChunkData(remaining) => {
                    if remaining == 0 {
                        self.state = State::ChunkDataCrlf;
                        continue;
                    }
                    let take = (remaining as usize).min(input.len());
                    if take == 0 {
                        break;
                    }
                    let chunk = input.split_to(take);
                    let left = remaining - take as u64;
                    self.state =
                        if left == 0 { State::ChunkDataCrlf } else { State::ChunkData(left) };
                    out.push(chunk);
                }
                State::ChunkDataCrlf => {
                    let Some(line) = take_line(input, &mut self.line_buf, 2)? else {
                        break;
                    };
                    if !line.is_empty() {
                        return Err(Error::body_framing("malformed chunk terminator"));
                    }
                    self.state = State::ChunkSize;
                }
                State::TrailerHeaders => {
                    let Some(line) = take_line(input, &mut self.line_buf, 8 * 1024)? else {
                        break;
                    };
                    if line.is_empty() {
                        self.state = State::Done;
                    }
                    // Trailer header content is discarded (spec Non-goals:
                    // trailers are not surfaced to callers).
                }
                State::Done => unreachable!(),
            }
        }
        Ok(out)
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull one CRLF-terminated line out of `input`, buffering a partial line
/// in `carry` across calls. Returns `None` if no full line is available
/// yet. Bounds the line length to guard against an endless chunk-size or
/// trailer line consuming unbounded memory.
fn take_line(input: &mut Bytes, carry: &mut BytesMut, max_len: usize) -> Result<Option<Bytes>> {
    if let Some(pos) = find_crlf(input) {
        let mut line = input.split_to(pos);
        input.advance(2);
        if !carry.is_empty() {
            carry.extend_from_slice(&line);
            line = carry.split().freeze();
        }
        if line.len() > max_len {
            return Err(Error::body_framing("line exceeds maximum length"));
        }
        return Ok(Some(line));
    }
    if carry.len() + input.len() > max_len {
        return Err(Error::body_framing("line exceeds maximum length"));
    }
    carry.extend_from_slice(input);
    input.advance(input.len());
    Ok(None)
}

fn find_crlf(buf: &Bytes) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_complete_message() {
        let mut input = Bytes::from_static(b"5\r\nhello\r\n0\r\n\r\n");
        let mut dec = ChunkedDecoder::new();
        let chunks = dec.feed(&mut input).unwrap();
        assert_eq!(chunks.concat(), b"hello");
        assert!(dec.is_done());
    }

    #[test]
    fn decodes_across_multiple_feeds() {
        let mut dec = ChunkedDecoder::new();
        let mut a = Bytes::from_static(b"3\r\nfo");
        let got_a = dec.feed(&mut a).unwrap();
        let mut b = Bytes::from_static(b"o\r\n0\r\n\r\n");
        let got_b = dec.feed(&mut b).unwrap();
        let mut all = got_a;
        all.extend(got_b);
        assert_eq!(all.concat(), b"foo");
        assert!(dec.is_done());
    }

    #[test]
    fn rejects_oversize_chunk() {
        let mut input = Bytes::from(format!("{:x}\r\n", MAX_CHUNK_SIZE + 1).into_bytes());
        let mut dec = ChunkedDecoder::new();
        assert!(dec.feed(&mut input).is_err());
    }

    #[test]
    fn trailers_are_discarded_not_surfaced() {
        let mut input = Bytes::from_static(b"4\r\ndata\r\n0\r\nX-Trailer: x\r\n\r\n");
        let mut dec = ChunkedDecoder::new();
        let chunks = dec.feed(&mut input).unwrap();
        assert_eq!(chunks.concat(), b"data");
        assert!(dec.is_done());
    }
}
