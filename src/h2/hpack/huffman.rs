//! Huffman coding over the static RFC 7541 table (spec §4.5: "Names and
//! values are written with Huffman coding").

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

mod huffman_table;
use huffman_table::{CODES, EOS};

/// Encode `data` with the static Huffman table, padding the final byte with
/// 1-bits (the EOS prefix), per RFC 7541 §5.2.
pub fn encode(data: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(data.len());
    let mut bit_buf: u64 = 0;
    let mut bit_count: u32 = 0;

    for &byte in data {
        let (code, len) = CODES[byte as usize];
        bit_buf = (bit_buf << len) | u64::from(code);
        bit_count += u32::from(len);
        while bit_count >= 8 {
            bit_count -= 8;
            out.put_u8((bit_buf >> bit_count) as u8);
        }
    }

    if bit_count > 0 {
        let (eos_code, eos_len) = CODES[EOS];
        let pad_len = 8 - bit_count;
        // Top `pad_len` bits of the EOS code pad the final partial byte.
        let pad_bits = (u64::from(eos_code) >> (u64::from(eos_len) - u64::from(pad_len))) as u64;
        bit_buf = (bit_buf << pad_len) | pad_bits;
        out.put_u8((bit_buf & 0xff) as u8);
    }

    out.freeze()
}

/// Decode a Huffman-coded byte string. Trailing bits beyond the last full
/// symbol must all be 1 (the EOS padding); anything else is a decode error.
pub fn decode(data: &[u8]) -> Result<Bytes> {
    // Build once per call — the static table is tiny (257 entries) so a
    // linear walk of a prefix tree built on the fly is cheap and avoids a
    // lazy_static dependency for this single use site.
    let tree = Tree::build();
    tree.decode(data)
}

struct Node {
    // Leaf symbol, if this node terminates a code.
    symbol: Option<u16>,
    children: Option<Box<[Option<Node>; 2]>>,
}

impl Node {
    fn empty() -> Self {
        Node { symbol: None, children: None }
    }
}

struct Tree {
    root: Node,
}

impl Tree {
    fn build() -> Self {
        let mut root = Node::empty();
        for (symbol, &(code, len)) in CODES.iter().enumerate() {
            let mut node = &mut root;
            for bit_index in (0..len).rev() {
                let bit = ((code >> bit_index) & 1) as usize;
                let children = node.children.get_or_insert_with(|| Box::new([None, None]));
                if children[bit].is_none() {
                    children[bit] = Some(Node::empty());
                }
                node = children[bit].as_mut().expect("just inserted");
            }
            node.symbol = Some(symbol as u16);
        }
        Tree { root }
    }

    fn decode(&self, data: &[u8]) -> Result<Bytes> {
        let mut out = BytesMut::new();
        let mut node = &self.root;
        let mut last_symbol_end_bit = 0usize;
        let total_bits = data.len() * 8;

        for bit_pos in 0..total_bits {
            let byte = data[bit_pos / 8];
            let bit = (byte >> (7 - (bit_pos % 8))) & 1;
            let children = node.children.as_ref().ok_or_else(|| {
                Error::protocol("Huffman decode: invalid code (dead end)")
            })?;
            node = children[bit as usize]
                .as_ref()
                .ok_or_else(|| Error::protocol("Huffman decode: invalid code (no child)"))?;

            if let Some(symbol) = node.symbol {
                if symbol as usize == EOS {
                    return Err(Error::protocol("Huffman decode: explicit EOS symbol is forbidden"));
                }
                out.put_u8(symbol as u8);
                node = &self.root;
                last_symbol_end_bit = bit_pos + 1;
            }
        }

        // Remaining bits (if any) must be a prefix of the EOS code, i.e. all
        // ones, and must be fewer than 8 bits (a full byte of padding would
        // mean a missed symbol).
        let remaining = total_bits - last_symbol_end_bit;
        if remaining >= 8 {
            return Err(Error::protocol("Huffman decode: incomplete final symbol"));
        }
        for bit_pos in last_symbol_end_bit..total_bits {
            let byte = data[bit_pos / 8];
            let bit = (byte >> (7 - (bit_pos % 8))) & 1;
            if bit != 1 {
                return Err(Error::protocol("Huffman decode: padding bits must be 1"));
            }
        }

        Ok(out.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ascii_header_values() {
        for s in ["www.example.com", "/", "GET", "", "no-cache", "a", "custom-key"] {
            let encoded = encode(s.as_bytes());
            let decoded = decode(&encoded).unwrap();
            assert_eq!(decoded.as_ref(), s.as_bytes());
        }
    }

    #[test]
    fn round_trips_all_byte_values() {
        let data: Vec<u8> = (0..=255u8).collect();
        let encoded = encode(&data);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.as_ref(), data.as_slice());
    }

    #[test]
    fn rejects_bad_padding() {
        // 0x00 decodes symbol '0' (code 00000, 5 bits) then leaves 3
        // trailing bits of 000 — not a prefix of the all-ones EOS padding.
        let bad = [0b0000_0000u8];
        assert!(decode(&bad).is_err());
    }
}
