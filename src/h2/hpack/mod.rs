//! L5 — HPACK (RFC 7541). Each H2 connection owns one [`Encoder`] for the
//! headers it sends and one [`Decoder`] for the headers it receives; the two
//! sides do not share state.

mod dynamic_table;
mod encoder;
mod decoder;
mod error;
mod huffman;
mod integer;
mod static_table;

pub use decoder::Decoder;
pub use encoder::Encoder;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_property_holds_for_varied_header_lists() {
        let cases: Vec<Vec<(String, String)>> = vec![
            vec![
                (":method".into(), "GET".into()),
                (":scheme".into(), "https".into()),
                (":authority".into(), "example.com".into()),
                (":path".into(), "/".into()),
            ],
            vec![
                (":method".into(), "POST".into()),
                (":path".into(), "/submit?x=1".into()),
                ("content-type".into(), "application/json".into()),
                ("content-length".into(), "42".into()),
                ("x-request-id".into(), "abc-123-def".into()),
            ],
            vec![("cookie".into(), "a=1; b=2".into()), ("authorization".into(), "Bearer xyz".into())],
        ];

        for case in cases {
            let mut enc = Encoder::new(4096);
            let mut dec = Decoder::new(4096);
            let block = enc.encode_block(&case);
            let decoded = dec.decode_block(&block).expect("valid block decodes");
            assert_eq!(decoded, case);
        }
    }
}
