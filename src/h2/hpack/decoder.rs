//! HPACK decoder (spec §4.5). Decode failure is connection-fatal: once the
//! dynamic table state is out of sync there is no valid recovery, so every
//! error here is meant to propagate as a HPACK-triggered GOAWAY.

use bytes::{Buf, Bytes};

use super::dynamic_table::DynamicTable;
use super::error::HpackError;
use super::{huffman, integer, static_table};
use crate::error::{Error, Result};

pub struct Decoder {
    table: DynamicTable,
    /// The size the peer has agreed we may grow the table to (our SETTINGS
    /// HEADER_TABLE_SIZE as seen by them, or the value they've ACKed).
    agreed_max_size: usize,
}

impl Decoder {
    #[must_use]
    pub fn new(dynamic_table_size: usize) -> Self {
        Decoder {
            table: DynamicTable::new(dynamic_table_size),
            agreed_max_size: dynamic_table_size,
        }
    }

    /// Update the agreed maximum size (e.g. after sending a SETTINGS
    /// HEADER_TABLE_SIZE change) — a later size update in a block exceeding
    /// this is a COMPRESSION_ERROR.
    pub fn set_agreed_max_size(&mut self, size: usize) {
        self.agreed_max_size = size;
        if self.table.max_size() > size {
            self.table.set_max_size(size);
        }
    }

    /// Decode one complete header block (the concatenation of a HEADERS
    /// frame's fragment and any CONTINUATION fragments).
    pub fn decode_block(&mut self, data: &[u8]) -> Result<Vec<(String, String)>> {
        let mut buf = Bytes::copy_from_slice(data);
        let mut out = Vec::new();
        let mut seen_non_update = false;

        while buf.has_remaining() {
            let first = buf[0];

            if first & 0x80 != 0 {
                // Indexed Header Field.
                let first_octet = buf.get_u8();
                let index = integer::decode(&mut buf, 7, first_octet)? as usize;
                let (name, value) = self.lookup(index)?;
                out.push((name, value));
                seen_non_update = true;
            } else if first & 0x40 != 0 {
                // Literal with incremental indexing.
                let first_octet = buf.get_u8();
                let name_index = integer::decode(&mut buf, 6, first_octet)? as usize;
                let (name, value) = self.read_literal(&mut buf, name_index)?;
                self.table.insert(name.clone(), value.clone());
                out.push((name, value));
                seen_non_update = true;
            } else if first & 0x20 != 0 {
                // Dynamic table size update.
                if seen_non_update {
                    return Err(Error::new(crate::error::Kind::Protocol)
                        .with(HpackError::SizeUpdateAfterNonUpdate));
                }
                let first_octet = buf.get_u8();
                let new_size = integer::decode(&mut buf, 5, first_octet)? as usize;
                if new_size > self.agreed_max_size {
                    return Err(Error::new(crate::error::Kind::Protocol).with(
                        HpackError::SizeUpdateExceedsMax { requested: new_size, max: self.agreed_max_size },
                    ));
                }
                self.table.set_max_size(new_size);
            } else if first & 0x10 != 0 {
                // Literal never indexed.
                let first_octet = buf.get_u8();
                let name_index = integer::decode(&mut buf, 4, first_octet)? as usize;
                let (name, value) = self.read_literal(&mut buf, name_index)?;
                out.push((name, value));
                seen_non_update = true;
            } else {
                // Literal without indexing.
                let first_octet = buf.get_u8();
                let name_index = integer::decode(&mut buf, 4, first_octet)? as usize;
                let (name, value) = self.read_literal(&mut buf, name_index)?;
                out.push((name, value));
                seen_non_update = true;
            }
        }

        Ok(out)
    }

    fn lookup(&self, index: usize) -> Result<(String, String)> {
        if index == 0 {
            return Err(Error::new(crate::error::Kind::Protocol).with(HpackError::InvalidIndex(0)));
        }
        if index <= static_table::LENGTH {
            let (name, value) = static_table::get(index)
                .ok_or_else(|| Error::new(crate::error::Kind::Protocol).with(HpackError::InvalidIndex(index)))?;
            return Ok((name.to_string(), value.to_string()));
        }
        let dyn_index = index - static_table::LENGTH;
        let entry = self
            .table
            .get(dyn_index)
            .ok_or_else(|| Error::new(crate::error::Kind::Protocol).with(HpackError::InvalidIndex(index)))?;
        Ok((entry.name.clone(), entry.value.clone()))
    }

    fn lookup_name(&self, index: usize) -> Result<String> {
        if index == 0 {
            return Err(Error::protocol("HPACK literal name index 0 requires inline name"));
        }
        self.lookup(index).map(|(name, _)| name)
    }

    fn read_literal(&self, buf: &mut Bytes, name_index: usize) -> Result<(String, String)> {
        let name = if name_index == 0 {
            read_string(buf)?
        } else {
            self.lookup_name(name_index)?
        };
        let value = read_string(buf)?;
        Ok((name, value))
    }
}

fn read_string(buf: &mut Bytes) -> Result<String> {
    if !buf.has_remaining() {
        return Err(Error::new(crate::error::Kind::Protocol).with(HpackError::Truncated));
    }
    let first_octet = buf.get_u8();
    let huffman_flag = first_octet & 0x80 != 0;
    let len = integer::decode(buf, 7, first_octet)? as usize;
    if buf.remaining() < len {
        return Err(Error::new(crate::error::Kind::Protocol).with(HpackError::Truncated));
    }
    let raw = buf.copy_to_bytes(len);
    let decoded = if huffman_flag { huffman::decode(&raw)?.to_vec() } else { raw.to_vec() };
    String::from_utf8(decoded).map_err(|_| Error::new(crate::error::Kind::Protocol).with(HpackError::InvalidUtf8))
}

#[cfg(test)]
mod tests {
    use super::super::encoder::Encoder;
    use super::*;

    fn round_trip(headers: &[(&str, &str)]) {
        let owned: Vec<(String, String)> =
            headers.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect();
        let mut enc = Encoder::new(4096);
        let mut dec = Decoder::new(4096);
        let block = enc.encode_block(&owned);
        let decoded = dec.decode_block(&block).unwrap();
        assert_eq!(decoded, owned);
    }

    #[test]
    fn round_trips_mixed_headers() {
        round_trip(&[
            (":method", "GET"),
            (":path", "/widgets"),
            (":scheme", "https"),
            ("authorization", "Bearer T"),
            ("x-custom", "value"),
            ("cookie", "sid=1"),
        ]);
    }

    #[test]
    fn repeated_headers_reuse_dynamic_table_across_blocks() {
        let mut enc = Encoder::new(4096);
        let mut dec = Decoder::new(4096);
        let first = vec![("x-custom".to_string(), "same-value".to_string())];
        let block1 = enc.encode_block(&first);
        let decoded1 = dec.decode_block(&block1).unwrap();
        assert_eq!(decoded1, first);

        let block2 = enc.encode_block(&first);
        // Second block should be shorter since the entry is now indexed.
        assert!(block2.len() <= block1.len());
        let decoded2 = dec.decode_block(&block2).unwrap();
        assert_eq!(decoded2, first);
    }

    #[test]
    fn size_update_after_non_update_field_is_compression_error() {
        let mut dec = Decoder::new(4096);
        let mut enc = Encoder::new(4096);
        let mut block = enc
            .encode_block(&[("x-a".to_string(), "1".to_string())])
            .to_vec();
        // Append a size-update byte after the field: 001xxxxx with small value.
        block.push(0b0010_0101);
        assert!(dec.decode_block(&block).is_err());
    }

    #[test]
    fn invalid_index_is_decode_error() {
        let mut dec = Decoder::new(4096);
        // Indexed header field with an out-of-range index (200).
        let block = [0b1111_1111u8, 0b1000_1001u8];
        assert!(dec.decode_block(&block).is_err());
    }
}
