use alloy_primitives::{Address, Bytes, U256};
use keel_codec::{CodecError, ListEncoder, Stream};

use super::{SignableFields, TxFields};

/// Untyped transaction. Replay protection, when present, is folded into `v`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyTx {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub v: U256,
    pub r: U256,
    pub s: U256,
}

impl LegacyTx {
    /// True unless `v` is one of the pre-replay-protection values.
    pub fn protected(&self) -> bool {
        is_protected_v(&self.v)
    }

    /// Chain id folded into `v`, if any.
    pub fn chain_id(&self) -> Option<u64> {
        derive_chain_id(&self.v)
    }

    fn push_unsigned(&self, list: &mut ListEncoder) {
        list.push(&self.nonce)
            .push(&self.gas_price)
            .push(&self.gas)
            .push(&self.to)
            .push(&self.value)
            .push(&self.data);
    }
}

/// Whether a legacy `v` value carries a chain id.
///
/// `27`/`28` are the original recovery values; `0`/`1` show up on unsigned
/// or partially built transactions.
pub fn is_protected_v(v: &U256) -> bool {
    match u64::try_from(*v) {
        Ok(v) => !matches!(v, 0 | 1 | 27 | 28),
        Err(_) => true,
    }
}

/// Recovers the chain id from an EIP-155 `v = recid + 35 + 2 * chain_id`.
pub fn derive_chain_id(v: &U256) -> Option<u64> {
    if !is_protected_v(v) {
        return None;
    }
    let id = v.checked_sub(U256::from(35u64))? / U256::from(2u64);
    u64::try_from(id).ok()
}

impl TxFields for LegacyTx {
    fn encode_fields(&self, list: &mut ListEncoder) {
        self.push_unsigned(list);
        list.push(&self.v).push(&self.r).push(&self.s);
    }

    fn decode_fields(list: &mut Stream<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            nonce: list.decode()?,
            gas_price: list.decode()?,
            gas: list.decode()?,
            to: list.decode()?,
            value: list.decode()?,
            data: list.decode()?,
            v: list.decode()?,
            r: list.decode()?,
            s: list.decode()?,
        })
    }
}

impl SignableFields for LegacyTx {
    /// Six fields, plus `[chain_id, 0, 0]` when signing for a chain.
    fn encode_signing_fields(&self, chain_id: u64, list: &mut ListEncoder) {
        self.push_unsigned(list);
        if chain_id != 0 {
            list.push(&chain_id).push(&0u64).push(&0u64);
        }
    }
}
