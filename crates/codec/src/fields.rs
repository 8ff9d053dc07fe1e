//! Scalar and container field encodings.
//!
//! Integers are big-endian with leading zeros trimmed, so zero is the empty
//! string. Fixed-size byte arrays must decode to exactly their size.

use alloy_primitives::{Address, Bytes, FixedBytes, U256};

use crate::decode::{Decodable, Kind, Stream};
use crate::encode::{
    write_list_header, write_string, Encodable, EMPTY_LIST_CODE, EMPTY_STRING_CODE,
};
use crate::CodecError;

/// Reads the content of an integer item and checks it is minimal.
fn uint_payload<'a>(stream: &mut Stream<'a>, bits: usize) -> Result<&'a [u8], CodecError> {
    let payload = stream.bytes()?;
    match payload {
        [] => Ok(payload),
        [0, ..] => Err(CodecError::NonCanonicalInteger),
        _ if payload.len() * 8 > bits => Err(CodecError::IntegerOverflow { bits }),
        _ => Ok(payload),
    }
}

fn write_uint(out: &mut Vec<u8>, be: &[u8]) {
    let start = be.iter().position(|b| *b != 0).unwrap_or(be.len());
    write_string(out, &be[start..]);
}

impl Encodable for u64 {
    fn encode(&self, out: &mut Vec<u8>) {
        write_uint(out, &self.to_be_bytes());
    }
}

impl Decodable for u64 {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError> {
        let payload = uint_payload(stream, 64)?;
        Ok(payload.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
    }
}

impl Encodable for u8 {
    fn encode(&self, out: &mut Vec<u8>) {
        (*self as u64).encode(out)
    }
}

impl Decodable for u8 {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError> {
        let payload = uint_payload(stream, 8)?;
        Ok(payload.first().copied().unwrap_or(0))
    }
}

impl Encodable for U256 {
    fn encode(&self, out: &mut Vec<u8>) {
        write_uint(out, &self.to_be_bytes::<32>());
    }
}

impl Decodable for U256 {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError> {
        let payload = uint_payload(stream, 256)?;
        Ok(U256::from_be_slice(payload))
    }
}

impl Encodable for bool {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(if *self { 0x01 } else { EMPTY_STRING_CODE });
    }
}

impl Decodable for bool {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError> {
        match stream.bytes()? {
            [] => Ok(false),
            [1] => Ok(true),
            _ => Err(CodecError::InvalidBool),
        }
    }
}

fn fixed<const N: usize>(payload: &[u8]) -> Result<[u8; N], CodecError> {
    payload.try_into().map_err(|_| CodecError::InvalidLength {
        expected: N,
        got: payload.len(),
    })
}

impl<const N: usize> Encodable for [u8; N] {
    fn encode(&self, out: &mut Vec<u8>) {
        write_string(out, self);
    }
}

impl<const N: usize> Decodable for [u8; N] {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError> {
        fixed(stream.bytes()?)
    }
}

impl<const N: usize> Encodable for FixedBytes<N> {
    fn encode(&self, out: &mut Vec<u8>) {
        write_string(out, self.as_slice());
    }
}

impl<const N: usize> Decodable for FixedBytes<N> {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError> {
        fixed(stream.bytes()?).map(FixedBytes)
    }
}

impl Encodable for Address {
    fn encode(&self, out: &mut Vec<u8>) {
        write_string(out, self.as_slice());
    }
}

impl Decodable for Address {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError> {
        fixed(stream.bytes()?).map(Address::new)
    }
}

/// Destination field: the empty string marks contract creation.
impl Encodable for Option<Address> {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Some(addr) => addr.encode(out),
            None => out.push(EMPTY_STRING_CODE),
        }
    }
}

impl Decodable for Option<Address> {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError> {
        match stream.bytes()? {
            [] => Ok(None),
            payload => fixed(payload).map(|b| Some(Address::new(b))),
        }
    }
}

impl Encodable for Bytes {
    fn encode(&self, out: &mut Vec<u8>) {
        write_string(out, self);
    }
}

impl Decodable for Bytes {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError> {
        Ok(Bytes::copy_from_slice(stream.bytes()?))
    }
}

impl<T: Encodable> Encodable for [T] {
    fn encode(&self, out: &mut Vec<u8>) {
        let mut payload = Vec::new();
        for item in self {
            item.encode(&mut payload);
        }
        write_list_header(out, payload.len());
        out.extend_from_slice(&payload);
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn encode(&self, out: &mut Vec<u8>) {
        self.as_slice().encode(out)
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError> {
        let mut list = stream.list()?;
        let mut out = Vec::new();
        while !list.is_empty() {
            out.push(T::decode(&mut list)?);
        }
        Ok(out)
    }
}

/// Returns true when the next item is the empty item of a kind other than
/// `field_kind`, i.e. the absent marker for an optional field of that kind.
pub fn is_absent_marker(stream: &Stream<'_>, field_kind: Kind) -> Result<bool, CodecError> {
    if stream.is_empty() {
        return Ok(false);
    }
    let header = stream.kind()?;
    let opposite = match field_kind {
        Kind::List => header.kind == Kind::String,
        Kind::Byte | Kind::String => header.kind == Kind::List,
    };
    Ok(opposite && header.payload_len == 0)
}

/// The absent marker for an optional field of `field_kind`.
pub const fn absent_marker(field_kind: Kind) -> u8 {
    match field_kind {
        Kind::List => EMPTY_STRING_CODE,
        Kind::Byte | Kind::String => EMPTY_LIST_CODE,
    }
}
