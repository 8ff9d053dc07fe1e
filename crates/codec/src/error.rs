use crate::Kind;

/// Errors produced while decoding canonical bytes.
///
/// Every variant is fatal to the decode call that produced it; no decoder in
/// this crate returns a partially populated value alongside an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Fewer bytes are available than the item header declares.
    #[error("input truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
    /// A length prefix that is padded, oversized, or encodes a single small
    /// byte as a one-byte string.
    #[error("non-canonical length prefix")]
    NonCanonicalLength,
    /// A list where a byte-string was expected, or vice versa.
    #[error("expected {expected}, found {found}")]
    UnexpectedKind { expected: Kind, found: Kind },
    /// An integer with leading zero bytes, or zero written as `0x00`.
    #[error("non-canonical integer encoding")]
    NonCanonicalInteger,
    #[error("integer does not fit in {bits} bits")]
    IntegerOverflow { bits: usize },
    /// A fixed-size field whose byte-string has the wrong length.
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("invalid boolean encoding")]
    InvalidBool,
    /// Bytes remain after the value (or list) was fully decoded.
    #[error("trailing bytes after value")]
    TrailingBytes,
    /// An item the canonical encoding would have left out: an absent marker
    /// with no present field after it, or an extension field holding its
    /// default value.
    #[error("redundant field in encoding")]
    RedundantField,
    #[error("length does not fit in usize")]
    LengthOverflow,
    /// Semantic rejection raised by a hand-written decoder.
    #[error("{0}")]
    Custom(&'static str),
}
