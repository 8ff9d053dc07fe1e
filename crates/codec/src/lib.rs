//! Canonical binary codec.
//!
//! Two wire primitives: byte-strings and lists, each with the shortest
//! length prefix that represents its size. Decoders reject every other form.

mod decode;
mod encode;
mod error;
mod fields;
mod hash;

pub use alloy_primitives;

pub use decode::{decode_exact, decode_kind, Decodable, ItemHeader, Kind, Stream};
pub use encode::{
    encode, encode_list, encode_string, header_len, list_len, string_len, write_list_header,
    write_string, Encodable, ListEncoder, EMPTY_LIST_CODE, EMPTY_STRING_CODE,
};
pub use error::CodecError;
pub use fields::{absent_marker, is_absent_marker};
pub use hash::{keccak256, keccak256_prefixed};

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn strings_use_shortest_prefix() {
        assert_eq!(encode_string(b""), hex!("80"));
        assert_eq!(encode_string(&[0x00]), hex!("00"));
        assert_eq!(encode_string(&[0x7f]), hex!("7f"));
        assert_eq!(encode_string(&[0x80]), hex!("8180"));
        assert_eq!(encode_string(b"dog"), hex!("83646f67"));

        let short = [0xaa; 55];
        assert_eq!(encode_string(&short)[0], 0xb7);
        let long = [0xaa; 56];
        assert_eq!(&encode_string(&long)[..2], &hex!("b838"));
        let longer = [0xaa; 1024];
        assert_eq!(&encode_string(&longer)[..3], &hex!("b90400"));
    }

    #[test]
    fn lists_wrap_encoded_items() {
        let cat_dog = encode_list(&[encode_string(b"cat"), encode_string(b"dog")]);
        assert_eq!(cat_dog, hex!("c88363617483646f67"));
        assert_eq!(encode_list(&[]), hex!("c0"));

        let mut list = ListEncoder::new();
        list.push_bytes(b"cat").push_bytes(b"dog");
        assert_eq!(list.payload_len(), 8);
        assert_eq!(list.finish(), cat_dog);
    }

    #[test]
    fn decode_kind_reports_layout() {
        let h = decode_kind(&hex!("83646f67")).unwrap();
        assert_eq!(h.kind, Kind::String);
        assert_eq!(h.content_start(), 1);
        assert_eq!(h.payload_len, 3);

        let h = decode_kind(&hex!("2a")).unwrap();
        assert_eq!(h.kind, Kind::Byte);
        assert_eq!(h.total_len(), 1);

        let h = decode_kind(&hex!("c88363617483646f67")).unwrap();
        assert_eq!(h.kind, Kind::List);
        assert_eq!(h.payload_len, 8);
    }

    #[test]
    fn non_canonical_lengths_are_rejected() {
        // single byte below 0x80 wrapped in a string header
        assert_eq!(decode_kind(&hex!("8105")), Err(CodecError::NonCanonicalLength));
        // long form for a short payload
        assert_eq!(
            decode_kind(&hex!("b803616263")),
            Err(CodecError::NonCanonicalLength)
        );
        // leading zero in the size
        let mut padded = hex!("b90038").to_vec();
        padded.extend([0u8; 56]);
        assert_eq!(decode_kind(&padded), Err(CodecError::NonCanonicalLength));
        // same rules for lists
        assert_eq!(
            decode_kind(&hex!("f80180")),
            Err(CodecError::NonCanonicalLength)
        );
    }

    #[test]
    fn truncated_input_is_rejected() {
        assert_eq!(
            decode_kind(&hex!("83646f")),
            Err(CodecError::Truncated {
                needed: 4,
                available: 3
            })
        );
        assert!(matches!(
            decode_kind(&[]),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn item_larger_than_its_list_is_truncated() {
        // the list is complete in the input but its item overruns it
        let bytes = hex!("c383646f67");
        let mut outer = Stream::new(&bytes);
        let mut inner = outer.list().unwrap();
        assert_eq!(
            inner.bytes(),
            Err(CodecError::Truncated {
                needed: 4,
                available: 3
            })
        );
    }

    #[test]
    fn wrong_primitive_kind_is_rejected() {
        let mut s = Stream::new(&hex!("c0"));
        assert_eq!(
            s.bytes(),
            Err(CodecError::UnexpectedKind {
                expected: Kind::String,
                found: Kind::List
            })
        );
        let mut s = Stream::new(&hex!("80"));
        assert_eq!(
            s.list().map(|_| ()),
            Err(CodecError::UnexpectedKind {
                expected: Kind::List,
                found: Kind::String
            })
        );
    }

    #[test]
    fn raw_returns_exact_item_bytes() {
        let bytes = hex!("c88363617483646f67");
        let mut outer = Stream::new(&bytes);
        let mut list = outer.list().unwrap();
        assert_eq!(list.raw().unwrap(), &hex!("83636174"));
        assert_eq!(list.kind().unwrap().kind, Kind::String);
        assert_eq!(list.raw().unwrap(), &hex!("83646f67"));
        assert!(list.is_empty());
        assert!(outer.finish().is_ok());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        assert_eq!(decode_exact::<u64>(&hex!("0102")), Err(CodecError::TrailingBytes));
    }
}
