use alloy_primitives::{Address, Bytes, B256, U256};
use keel_codec::{CodecError, ListEncoder, Stream};

use super::TxFields;

/// Type `0x7e`: system-originated deposit. Unsigned; the sender is `from`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositTx {
    pub source_hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub mint: U256,
    pub value: U256,
    pub gas: u64,
    pub is_system_tx: bool,
    pub data: Bytes,
}

impl TxFields for DepositTx {
    fn encode_fields(&self, list: &mut ListEncoder) {
        list.push(&self.source_hash)
            .push(&self.from)
            .push(&self.to)
            .push(&self.mint)
            .push(&self.value)
            .push(&self.gas)
            .push(&self.is_system_tx)
            .push(&self.data);
    }

    fn decode_fields(list: &mut Stream<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            source_hash: list.decode()?,
            from: list.decode()?,
            to: list.decode()?,
            mint: list.decode()?,
            value: list.decode()?,
            gas: list.decode()?,
            is_system_tx: list.decode()?,
            data: list.decode()?,
        })
    }
}
