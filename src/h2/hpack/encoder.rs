//! HPACK encoder (spec §4.5).

use bytes::{Bytes, BytesMut};

use super::dynamic_table::DynamicTable;
use super::{huffman, static_table};

/// Header names that are never added to the dynamic table because they are
/// high-cardinality or carry sensitive data (spec §4.5).
const NEVER_INDEXED: &[&str] = &[
    ":path",
    "content-length",
    "content-range",
    "date",
    "last-modified",
    "etag",
    "age",
    "expires",
    "set-cookie",
    "cookie",
    "authorization",
    "proxy-authorization",
    "location",
    "if-modified-since",
    "if-none-match",
];

/// The subset of [`NEVER_INDEXED`] sensitive enough to require the
/// never-indexed *literal representation* (not just "don't cache this"),
/// so intermediaries are bound not to compress or store it (spec §4.5).
const SENSITIVE: &[&str] = &["authorization", "proxy-authorization", "cookie", "set-cookie"];

pub struct Encoder {
    table: DynamicTable,
}

impl Encoder {
    #[must_use]
    pub fn new(dynamic_table_size: usize) -> Self {
        Encoder { table: DynamicTable::new(dynamic_table_size) }
    }

    pub fn set_max_dynamic_table_size(&mut self, size: usize) {
        self.table.set_max_size(size);
    }

    fn find_in_tables(&self, name: &str, value: &str) -> (Option<usize>, Option<usize>) {
        if let Some(i) = static_table::find_exact(name, value) {
            return (Some(i), None);
        }
        if let Some(i) = self.table.find_exact(name, value) {
            return (None, Some(i));
        }
        let static_name = static_table::find_name(name);
        let dynamic_name = if static_name.is_none() { self.table.find_name(name) } else { None };
        (static_name, dynamic_name)
    }

    /// Encode one header block. Size updates (if any are pending via
    /// `set_max_dynamic_table_size`) must be emitted by the caller first via
    /// [`Self::encode_size_update`], before any field in the block.
    pub fn encode_block(&mut self, headers: &[(String, String)]) -> Bytes {
        let mut out = BytesMut::new();
        for (name, value) in headers {
            self.encode_field(&mut out, name, value);
        }
        out.freeze()
    }

    pub fn encode_size_update(&mut self, out: &mut BytesMut, new_size: usize) {
        super::integer::encode(out, 5, 0b0010_0000, new_size as u64);
        self.table.set_max_size(new_size);
    }

    fn encode_field(&mut self, out: &mut BytesMut, name: &str, value: &str) {
        // Exact (name, value) match anywhere -> indexed representation.
        if let Some(i) = static_table::find_exact(name, value) {
            super::integer::encode(out, 7, 0b1000_0000, i as u64);
            return;
        }
        if let Some(i) = self.table.find_exact(name, value) {
            let combined = i + static_table::LENGTH;
            super::integer::encode(out, 7, 0b1000_0000, combined as u64);
            return;
        }

        let name_index = static_table::find_name(name)
            .or_else(|| self.table.find_name(name).map(|i| i + static_table::LENGTH));

        let never_index = NEVER_INDEXED.contains(&name);
        let sensitive = SENSITIVE.contains(&name);

        if never_index {
            if sensitive {
                self.write_literal(out, 4, 0b0001_0000, name_index, name, value);
            } else {
                self.write_literal(out, 4, 0b0000_0000, name_index, name, value);
            }
        } else {
            self.write_literal(out, 6, 0b0100_0000, name_index, name, value);
            self.table.insert(name.to_string(), value.to_string());
        }
    }

    fn write_literal(
        &self,
        out: &mut BytesMut,
        prefix_bits: u8,
        first_octet_base: u8,
        name_index: Option<usize>,
        name: &str,
        value: &str,
    ) {
        match name_index {
            Some(i) => super::integer::encode(out, prefix_bits, first_octet_base, i as u64),
            None => {
                out.extend_from_slice(&[first_octet_base]);
                write_string(out, name);
            }
        }
        write_string(out, value);
    }
}

fn write_string(out: &mut BytesMut, s: &str) {
    let huffman_encoded = huffman::encode(s.as_bytes());
    // Only use Huffman if it's actually smaller; otherwise emit raw, which
    // both keeps us robust against pathological inputs and matches common
    // encoder practice.
    if huffman_encoded.len() < s.len() {
        super::integer::encode(out, 7, 0b1000_0000, huffman_encoded.len() as u64);
        out.extend_from_slice(&huffman_encoded);
    } else {
        super::integer::encode(out, 7, 0b0000_0000, s.len() as u64);
        out.extend_from_slice(s.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitive_headers_use_never_indexed_representation() {
        let mut enc = Encoder::new(4096);
        let block = enc.encode_block(&[("authorization".to_string(), "Bearer T".to_string())]);
        // First octet's top nibble must be 0001 (never indexed, name not
        // statically indexed since authorization has no static value match,
        // but it IS a static name -> indexed name form uses the 4-bit prefix
        // differently). We only assert the never-indexed bit pattern shows
        // up somewhere consistent: top 4 bits encode either 0001 (new name)
        // or, since authorization has a static entry (index 23) with empty
        // value, the representation is "literal, indexed name, never index".
        assert_eq!(block[0] & 0b1111_0000, 0b0001_0000);
    }
}
