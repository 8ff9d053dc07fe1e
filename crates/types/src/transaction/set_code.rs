use alloy_primitives::{Address, Bytes, B256, U256};
use keel_codec::{keccak256_prefixed, CodecError, Decodable, Encodable, ListEncoder, Stream};

use super::{AccessList, SignableFields, TxFields};

/// Domain byte prepended to an authorization before hashing.
pub const SET_CODE_AUTH_MAGIC: u8 = 0x05;

/// Signed permission for `address`'s code to be installed on the signer's
/// account. A `chain_id` of zero is valid on every chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Authorization {
    pub chain_id: u64,
    pub address: Address,
    pub nonce: u64,
    pub y_parity: u8,
    pub r: U256,
    pub s: U256,
}

impl Authorization {
    /// `keccak256(0x05 || rlp([chain_id, address, nonce]))`.
    pub fn sig_hash(&self) -> B256 {
        let mut list = ListEncoder::new();
        list.push(&self.chain_id)
            .push(&self.address)
            .push(&self.nonce);
        keccak256_prefixed(SET_CODE_AUTH_MAGIC, &list.finish())
    }
}

impl Encodable for Authorization {
    fn encode(&self, out: &mut Vec<u8>) {
        let mut list = ListEncoder::new();
        list.push(&self.chain_id)
            .push(&self.address)
            .push(&self.nonce)
            .push(&self.y_parity)
            .push(&self.r)
            .push(&self.s);
        list.finish_into(out);
    }
}

impl Decodable for Authorization {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError> {
        let mut list = stream.list()?;
        let auth = Self {
            chain_id: list.decode()?,
            address: list.decode()?,
            nonce: list.decode()?,
            y_parity: list.decode()?,
            r: list.decode()?,
            s: list.decode()?,
        };
        list.finish()?;
        Ok(auth)
    }
}

/// Type `0x04`: installs delegation code on the authorizing accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetCodeTx {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_tip_cap: U256,
    pub gas_fee_cap: U256,
    pub gas: u64,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub access_list: AccessList,
    pub authorization_list: Vec<Authorization>,
    pub v: U256,
    pub r: U256,
    pub s: U256,
}

impl SetCodeTx {
    fn push_unsigned(&self, chain_id: u64, list: &mut ListEncoder) {
        list.push(&chain_id)
            .push(&self.nonce)
            .push(&self.gas_tip_cap)
            .push(&self.gas_fee_cap)
            .push(&self.gas)
            .push(&self.to)
            .push(&self.value)
            .push(&self.data)
            .push(&self.access_list)
            .push(&self.authorization_list);
    }
}

impl TxFields for SetCodeTx {
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
            authorization_list: list.decode()?,
            v: list.decode()?,
            r: list.decode()?,
            s: list.decode()?,
        })
    }
}

impl SignableFields for SetCodeTx {
    fn encode_signing_fields(&self, chain_id: u64, list: &mut ListEncoder) {
        self.push_unsigned(chain_id, list);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_codec::{decode_exact, encode, keccak256};

    #[test]
    fn auth_hash_covers_only_unsigned_fields() {
        let auth = Authorization {
            chain_id: 1,
            address: Address::repeat_byte(0xaa),
            nonce: 7,
            ..Default::default()
        };
        let signed = Authorization {
            y_parity: 1,
            r: U256::from(5u64),
            s: U256::from(6u64),
            ..auth.clone()
        };
        assert_eq!(auth.sig_hash(), signed.sig_hash());

        let mut preimage = vec![SET_CODE_AUTH_MAGIC];
        let mut list = ListEncoder::new();
        list.push(&1u64).push(&auth.address).push(&7u64);
        list.finish_into(&mut preimage);
        assert_eq!(auth.sig_hash(), keccak256(&preimage));

        assert_eq!(decode_exact::<Authorization>(&encode(&signed)), Ok(signed));
    }
}
