/// Prefix of the empty byte-string, also written for integer zero.
pub const EMPTY_STRING_CODE: u8 = 0x80;
/// Prefix of the empty list.
pub const EMPTY_LIST_CODE: u8 = 0xc0;

/// Values with a canonical encoding.
pub trait Encodable {
    /// Appends the canonical encoding of `self` to `out`.
    fn encode(&self, out: &mut Vec<u8>);

    /// Length of the canonical encoding in bytes.
    fn encoded_len(&self) -> usize {
        let mut out = Vec::new();
        self.encode(&mut out);
        out.len()
    }
}

impl<T: Encodable + ?Sized> Encodable for &T {
    fn encode(&self, out: &mut Vec<u8>) {
        (**self).encode(out)
    }

    fn encoded_len(&self) -> usize {
        (**self).encoded_len()
    }
}

/// Encodes a single value into a fresh buffer.
pub fn encode<T: Encodable + ?Sized>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    value.encode(&mut out);
    out
}

/// Number of bytes needed to write `len` big-endian without leading zeros.
const fn be_len(len: usize) -> usize {
    (usize::BITS - len.leading_zeros()).div_ceil(8) as usize
}

/// Size of the header that prefixes a payload of `payload_len` bytes.
pub const fn header_len(payload_len: usize) -> usize {
    if payload_len < 56 {
        1
    } else {
        1 + be_len(payload_len)
    }
}

/// Total encoded size of a list whose items occupy `payload_len` bytes.
pub const fn list_len(payload_len: usize) -> usize {
    header_len(payload_len) + payload_len
}

fn write_header(out: &mut Vec<u8>, payload_len: usize, offset: u8) {
    if payload_len < 56 {
        out.push(offset + payload_len as u8);
        return;
    }
    let n = be_len(payload_len);
    out.push(offset + 55 + n as u8);
    out.extend_from_slice(&payload_len.to_be_bytes()[core::mem::size_of::<usize>() - n..]);
}

/// Writes a list header announcing `payload_len` bytes of items.
pub fn write_list_header(out: &mut Vec<u8>, payload_len: usize) {
    write_header(out, payload_len, EMPTY_LIST_CODE);
}

/// Writes `bytes` as a byte-string. A single byte below `0x80` is its own
/// encoding.
pub fn write_string(out: &mut Vec<u8>, bytes: &[u8]) {
    if let [b] = bytes {
        if *b < EMPTY_STRING_CODE {
            out.push(*b);
            return;
        }
    }
    write_header(out, bytes.len(), EMPTY_STRING_CODE);
    out.extend_from_slice(bytes);
}

/// Length of `bytes` once written as a byte-string.
pub fn string_len(bytes: &[u8]) -> usize {
    match bytes {
        [b] if *b < EMPTY_STRING_CODE => 1,
        _ => header_len(bytes.len()) + bytes.len(),
    }
}

/// Encodes `bytes` as a byte-string.
pub fn encode_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(string_len(bytes));
    write_string(&mut out, bytes);
    out
}

/// Wraps already-encoded items into a list.
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload_len = items.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(list_len(payload_len));
    write_list_header(&mut out, payload_len);
    for item in items {
        out.extend_from_slice(item);
    }
    out
}

/// Accumulates list items and wraps them with the list header on `finish`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEncoder {
    payload: Vec<u8>,
}

impl ListEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the encoding of `value` as the next item.
    pub fn push<T: Encodable + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.encode(&mut self.payload);
        self
    }

    /// Appends an item that is already encoded, byte for byte.
    pub fn push_raw(&mut self, item: &[u8]) -> &mut Self {
        self.payload.extend_from_slice(item);
        self
    }

    /// Appends `bytes` as a byte-string item.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        write_string(&mut self.payload, bytes);
        self
    }

    /// Appends the absent marker for an optional field of `field_kind`.
    pub fn push_absent(&mut self, field_kind: crate::Kind) -> &mut Self {
        self.payload.push(crate::absent_marker(field_kind));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Items written so far, without the list header.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Bytes written so far, excluding the list header.
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Writes the finished list to `out`.
    pub fn finish_into(self, out: &mut Vec<u8>) {
        write_list_header(out, self.payload.len());
        out.extend_from_slice(&self.payload);
    }

    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(list_len(self.payload.len()));
        self.finish_into(&mut out);
        out
    }
}
