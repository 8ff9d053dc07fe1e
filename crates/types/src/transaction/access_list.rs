use alloy_primitives::{Address, Bytes, B256, U256};
use keel_codec::{CodecError, Decodable, Encodable, ListEncoder, Stream};

use super::{SignableFields, TxFields};

/// Addresses and storage slots a transaction declares it will touch.
///
/// There is no absent form: a missing list and an empty list are the same
/// value and encode as `0xc0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AccessList(pub Vec<AccessTuple>);

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AccessTuple {
    pub address: Address,
    pub storage_keys: Vec<B256>,
}

impl AccessList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of storage keys across all entries.
    pub fn storage_keys(&self) -> usize {
        self.0.iter().map(|t| t.storage_keys.len()).sum()
    }
}

impl From<Vec<AccessTuple>> for AccessList {
    fn from(tuples: Vec<AccessTuple>) -> Self {
        Self(tuples)
    }
}

impl Encodable for AccessTuple {
    fn encode(&self, out: &mut Vec<u8>) {
        let mut list = ListEncoder::new();
        list.push(&self.address).push(&self.storage_keys);
        list.finish_into(out);
    }
}

impl Decodable for AccessTuple {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError> {
        let mut list = stream.list()?;
        let tuple = Self {
            address: list.decode()?,
            storage_keys: list.decode()?,
        };
        list.finish()?;
        Ok(tuple)
    }
}

impl Encodable for AccessList {
    fn encode(&self, out: &mut Vec<u8>) {
        self.0.encode(out)
    }
}

impl Decodable for AccessList {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError> {
        stream.decode().map(Self)
    }
}

/// Type `0x01`: legacy pricing plus an access list and an explicit chain id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessListTx {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: U256,
    pub gas: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub access_list: AccessList,
    pub v: U256,
    pub r: U256,
    pub s: U256,
}

impl AccessListTx {
    fn push_unsigned(&self, chain_id: u64, list: &mut ListEncoder) {
        list.push(&chain_id)
            .push(&self.nonce)
            .push(&self.gas_price)
            .push(&self.gas)
            .push(&self.to)
            .push(&self.value)
            .push(&self.data)
            .push(&self.access_list);
    }
}

impl TxFields for AccessListTx {
    fn encode_fields(&self, list: &mut ListEncoder) {
        self.push_unsigned(self.chain_id, list);
        list.push(&self.v).push(&self.r).push(&self.s);
    }

    fn decode_fields(list: &mut Stream<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            chain_id: list.decode()?,
            nonce: list.decode()?,
            gas_price: list.decode()?,
            gas: list.decode()?,
            to: list.decode()?,
            value: list.decode()?,
            data: list.decode()?,
            access_list: list.decode()?,
            v: list.decode()?,
            r: list.decode()?,
            s: list.decode()?,
        })
    }
}

impl SignableFields for AccessListTx {
    fn encode_signing_fields(&self, chain_id: u64, list: &mut ListEncoder) {
        self.push_unsigned(chain_id, list);
    }
}
