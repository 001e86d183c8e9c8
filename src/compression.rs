//! gzip/deflate body codec (ambient expansion, grounded on the teacher's
//! `http/compression.rs`, which sits on `flate2`). Brotli and HTTP/3 stay
//! out of scope per the distributed spec's Non-goals.

use bytes::Bytes;
use flate2::read::{DeflateDecoder, GzDecoder, GzEncoder};
use flate2::Compression;
use std::io::Read;

use crate::error::{Error, Result};

/// Request body compression threshold (spec §4's body preparation step):
/// only worth paying the CPU cost above this size.
pub const COMPRESS_MIN_LEN: usize = 1024;

#[must_use]
pub fn gzip_compress(data: &[u8]) -> Bytes {
    let mut encoder = GzEncoder::new(data, Compression::default());
    let mut out = Vec::new();
    encoder.read_to_end(&mut out).expect("in-memory gzip encode cannot fail");
    Bytes::from(out)
}

pub fn gzip_decompress(data: &[u8]) -> Result<Bytes> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|e| Error::decode(format!("gzip decode failed: {e}")))?;
    Ok(Bytes::from(out))
}

pub fn deflate_decompress(data: &[u8]) -> Result<Bytes> {
    let mut decoder = DeflateDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|e| Error::decode(format!("deflate decode failed: {e}")))?;
    Ok(Bytes::from(out))
}

/// Dispatch on the response's `content-encoding` header. Unknown encodings
/// (brotli, zstd, ...) pass through undecoded — callers opted out of
/// `decompress` or the server sent something this engine doesn't implement.
pub fn decompress_response(content_encoding: Option<&str>, body: &[u8]) -> Result<Bytes> {
    match content_encoding {
        Some("gzip") => gzip_decompress(body),
        Some("deflate") => deflate_decompress(body),
        _ => Ok(Bytes::copy_from_slice(body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(10);
        let compressed = gzip_compress(&data);
        let decompressed = gzip_decompress(&compressed).unwrap();
        assert_eq!(decompressed, Bytes::from(data));
    }

    #[test]
    fn unknown_encoding_passes_through() {
        let data = b"raw bytes";
        let out = decompress_response(Some("br"), data).unwrap();
        assert_eq!(out, Bytes::from_static(data));
    }
}
