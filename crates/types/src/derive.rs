//! Feeding ordered lists to an external trie.
//!
//! The trie itself lives elsewhere; this module only produces the
//! `(rlp(index), encoded item)` pairs it commits to.

use alloy_primitives::B256;
use keel_codec::Encodable;

use crate::{Header, Transaction, Withdrawal};

/// An ordered collection whose items can be encoded one at a time.
pub trait DerivableList {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends the encoding of item `i` to `out`.
    fn encode_index(&self, i: usize, out: &mut Vec<u8>);
}

/// Incremental trie hasher.
pub trait ListHasher {
    fn reset(&mut self);
    fn update(&mut self, key: &[u8], value: &[u8]);
    fn hash(&mut self) -> B256;
}

impl DerivableList for [Transaction] {
    fn len(&self) -> usize {
        <[Transaction]>::len(self)
    }

    /// Typed transactions contribute their canonical binary form.
    fn encode_index(&self, i: usize, out: &mut Vec<u8>) {
        out.extend_from_slice(&self[i].encode_canonical());
    }
}

impl DerivableList for [Withdrawal] {
    fn len(&self) -> usize {
        <[Withdrawal]>::len(self)
    }

    fn encode_index(&self, i: usize, out: &mut Vec<u8>) {
        self[i].encode(out);
    }
}

impl DerivableList for [Header] {
    fn len(&self) -> usize {
        <[Header]>::len(self)
    }

    fn encode_index(&self, i: usize, out: &mut Vec<u8>) {
        self[i].encode(out);
    }
}

/// Hashes `list` through `hasher`.
///
/// Keys are fed in the order their encodings sort: `1..=0x7f`, then `0`,
/// then `0x80..`.
pub fn derive_sha<L, H>(list: &L, hasher: &mut H) -> B256
where
    L: DerivableList + ?Sized,
    H: ListHasher,
{
    hasher.reset();
    let len = list.len();
    let mut key = Vec::new();
    let mut value = Vec::new();
    let mut feed = |i: usize, hasher: &mut H| {
        key.clear();
        value.clear();
        (i as u64).encode(&mut key);
        list.encode_index(i, &mut value);
        hasher.update(&key, &value);
    };

    for i in 1..len.min(0x80) {
        feed(i, hasher);
    }
    if len > 0 {
        feed(0, hasher);
    }
    for i in 0x80..len {
        feed(i, hasher);
    }
    hasher.hash()
}
