use core::fmt;

use crate::CodecError;

/// The primitive an encoded item decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A single byte in `0x00..=0x7f`, encoded as itself.
    Byte,
    String,
    List,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Byte => f.write_str("byte"),
            Kind::String => f.write_str("string"),
            Kind::List => f.write_str("list"),
        }
    }
}

/// Shape of the next encoded item, as read from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemHeader {
    pub kind: Kind,
    /// Bytes taken by the prefix. Zero for [`Kind::Byte`].
    pub header_len: usize,
    pub payload_len: usize,
}

impl ItemHeader {
    /// Offset of the first content byte, relative to the item start.
    pub const fn content_start(&self) -> usize {
        self.header_len
    }

    pub const fn total_len(&self) -> usize {
        self.header_len + self.payload_len
    }

    /// True for byte-strings of either encoding.
    pub const fn is_string(&self) -> bool {
        matches!(self.kind, Kind::Byte | Kind::String)
    }
}

fn take<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8], CodecError> {
    if input.len() < n {
        return Err(CodecError::Truncated {
            needed: n,
            available: input.len(),
        });
    }
    let (a, b) = input.split_at(n);
    *input = b;
    Ok(a)
}

/// Reads a long-form size. Rejects leading zeros and sizes that fit the
/// short form.
fn read_size(input: &[u8], len_of_len: usize) -> Result<usize, CodecError> {
    let Some(be) = input.get(..len_of_len) else {
        return Err(CodecError::Truncated {
            needed: len_of_len,
            available: input.len(),
        });
    };
    if be[0] == 0 {
        return Err(CodecError::NonCanonicalLength);
    }
    if len_of_len > core::mem::size_of::<usize>() {
        return Err(CodecError::LengthOverflow);
    }
    let size = be.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
    if size < 56 {
        return Err(CodecError::NonCanonicalLength);
    }
    Ok(size)
}

/// Sniffs the next item without consuming it.
///
/// Checks that the prefix is canonical and that the whole item is present in
/// `input`.
pub fn decode_kind(input: &[u8]) -> Result<ItemHeader, CodecError> {
    let Some(&prefix) = input.first() else {
        return Err(CodecError::Truncated {
            needed: 1,
            available: 0,
        });
    };
    let header = match prefix {
        0x00..=0x7f => ItemHeader {
            kind: Kind::Byte,
            header_len: 0,
            payload_len: 1,
        },
        0x80..=0xb7 => {
            let payload_len = (prefix - 0x80) as usize;
            if payload_len == 1 && input.get(1).is_some_and(|b| *b < 0x80) {
                return Err(CodecError::NonCanonicalLength);
            }
            ItemHeader {
                kind: Kind::String,
                header_len: 1,
                payload_len,
            }
        }
        0xb8..=0xbf => {
            let len_of_len = (prefix - 0xb7) as usize;
            ItemHeader {
                kind: Kind::String,
                header_len: 1 + len_of_len,
                payload_len: read_size(&input[1..], len_of_len)?,
            }
        }
        0xc0..=0xf7 => ItemHeader {
            kind: Kind::List,
            header_len: 1,
            payload_len: (prefix - 0xc0) as usize,
        },
        0xf8..=0xff => {
            let len_of_len = (prefix - 0xf7) as usize;
            ItemHeader {
                kind: Kind::List,
                header_len: 1 + len_of_len,
                payload_len: read_size(&input[1..], len_of_len)?,
            }
        }
    };
    let total = header
        .header_len
        .checked_add(header.payload_len)
        .ok_or(CodecError::LengthOverflow)?;
    if total > input.len() {
        return Err(CodecError::Truncated {
            needed: total,
            available: input.len(),
        });
    }
    Ok(header)
}

/// Values that can be read back from their canonical encoding.
pub trait Decodable: Sized {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError>;
}

/// Decodes exactly one value from `bytes`, rejecting anything after it.
pub fn decode_exact<T: Decodable>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut stream = Stream::new(bytes);
    let value = T::decode(&mut stream)?;
    stream.finish()?;
    Ok(value)
}

/// Cursor over a sequence of encoded items.
///
/// A stream never reads past the end of its buffer, so the child stream
/// returned by [`Stream::list`] cannot escape the list it was opened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stream<'a> {
    buf: &'a [u8],
}

impl<'a> Stream<'a> {
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub const fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes not yet consumed.
    pub const fn remaining(&self) -> &'a [u8] {
        self.buf
    }

    /// Sniffs the next item without consuming it.
    pub fn kind(&self) -> Result<ItemHeader, CodecError> {
        decode_kind(self.buf)
    }

    fn item(&mut self) -> Result<(ItemHeader, &'a [u8]), CodecError> {
        let header = self.kind()?;
        let raw = take(&mut self.buf, header.total_len())?;
        Ok((header, &raw[header.header_len..]))
    }

    /// Consumes the next item and returns its exact undecoded encoding.
    pub fn raw(&mut self) -> Result<&'a [u8], CodecError> {
        let header = self.kind()?;
        take(&mut self.buf, header.total_len())
    }

    /// Consumes the next item, which must be a byte-string, and returns its
    /// content.
    pub fn bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let (header, payload) = self.item()?;
        if header.kind == Kind::List {
            return Err(CodecError::UnexpectedKind {
                expected: Kind::String,
                found: Kind::List,
            });
        }
        Ok(payload)
    }

    /// Consumes the next item, which must be a list, and returns a stream
    /// over its items.
    pub fn list(&mut self) -> Result<Stream<'a>, CodecError> {
        let (header, payload) = self.item()?;
        if header.kind != Kind::List {
            return Err(CodecError::UnexpectedKind {
                expected: Kind::List,
                found: header.kind,
            });
        }
        Ok(Stream::new(payload))
    }

    pub fn decode<T: Decodable>(&mut self) -> Result<T, CodecError> {
        T::decode(self)
    }

    /// Ends decoding of this stream. Fails if any item is left.
    pub fn finish(self) -> Result<(), CodecError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes)
        }
    }
}
