use alloy_primitives::{b256, B256, U256};
use keel_codec::{encode, keccak256, Encodable, ListEncoder, Stream};

use crate::extras::{Carrier, CarrierKind, ExtraPayload, Registry};
use crate::tail::finish_with_extras;
use crate::DecodeError;

/// Root of an empty trie, `keccak256(rlp(""))`.
pub const EMPTY_ROOT_HASH: B256 =
    b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");
/// Hash of empty code, `keccak256("")`.
pub const EMPTY_CODE_HASH: B256 =
    b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");

/// Account record as stored in the state trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateAccount {
    pub nonce: u64,
    pub balance: U256,
    pub root: B256,
    pub code_hash: B256,
    pub extras: ExtraPayload,
}

impl Default for StateAccount {
    /// An account with no storage and no code.
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::ZERO,
            root: EMPTY_ROOT_HASH,
            code_hash: EMPTY_CODE_HASH,
            extras: ExtraPayload::default(),
        }
    }
}

impl StateAccount {
    pub fn decode(bytes: &[u8], registry: &Registry) -> Result<Self, DecodeError> {
        let mut stream = Stream::new(bytes);
        let mut list = stream.list()?;
        let mut account = Self {
            nonce: list.decode()?,
            balance: list.decode()?,
            root: list.decode()?,
            code_hash: list.decode()?,
            extras: ExtraPayload::default(),
        };
        account.extras = registry.decode_extras(CarrierKind::StateAccount, &mut list)?;
        list.finish()?;
        stream.finish()?;
        Ok(account)
    }

    /// keccak256 of the encoded record, the value the state trie commits to.
    pub fn hash(&self) -> B256 {
        keccak256(encode(self))
    }
}

impl Encodable for StateAccount {
    fn encode(&self, out: &mut Vec<u8>) {
        let mut list = ListEncoder::new();
        list.push(&self.nonce)
            .push(&self.balance)
            .push(&self.root)
            .push(&self.code_hash);
        finish_with_extras(list, &[], &self.extras, out);
    }
}

impl Carrier for StateAccount {
    const KIND: CarrierKind = CarrierKind::StateAccount;

    fn extras(&self) -> &ExtraPayload {
        &self.extras
    }

    fn extras_mut(&mut self) -> &mut ExtraPayload {
        &mut self.extras
    }
}
