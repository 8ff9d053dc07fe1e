use alloy_primitives::{Address, Bytes, U256};
use keel_codec::{CodecError, ListEncoder, Stream};

use super::{AccessList, SignableFields, TxFields};

/// Type `0x02`: priority fee and fee cap instead of a single gas price.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicFeeTx {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_tip_cap: U256,
    pub gas_fee_cap: U256,
    pub gas: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub access_list: AccessList,
    pub v: U256,
    pub r: U256,
    pub s: U256,
}

impl DynamicFeeTx {
    fn push_unsigned(&self, chain_id: u64, list: &mut ListEncoder) {
        list.push(&chain_id)
            .push(&self.nonce)
            .push(&self.gas_tip_cap)
            .push(&self.gas_fee_cap)
            .push(&self.gas)
            .push(&self.to)
            .push(&self.value)
            .push(&self.data)
            .push(&self.access_list);
    }
}

impl TxFields for DynamicFeeTx {
    fn encode_fields(&self, list: &mut ListEncoder) {
        self.push_unsigned(self.chain_id, list);
        list.push(&self.v).push(&self.r).push(&self.s);
    }

    fn decode_fields(list: &mut Stream<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            chain_id: list.decode()?,
            nonce: list.decode()?,
            gas_tip_cap: list.decode()?,
            gas_fee_cap: list.decode()?,
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

impl SignableFields for DynamicFeeTx {
    fn encode_signing_fields(&self, chain_id: u64, list: &mut ListEncoder) {
        self.push_unsigned(chain_id, list);
    }
}
