use alloy_primitives::{Address, Bytes, FixedBytes, B256, B64, U256};
use keel_codec::{encode, keccak256, Encodable, Kind, ListEncoder, Stream};

use crate::extras::{Carrier, CarrierKind, ExtraPayload, Registry};
use crate::tail::{finish_with_extras, Optional, TailReader};
use crate::DecodeError;

/// 2048-bit log bloom.
pub type Bloom = FixedBytes<256>;

/// Block header. Fields after `nonce` arrived with later forks and are
/// optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub parent_hash: B256,
    pub uncle_hash: B256,
    pub coinbase: Address,
    pub root: B256,
    pub tx_hash: B256,
    pub receipt_hash: B256,
    pub bloom: Bloom,
    pub difficulty: U256,
    pub number: U256,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub time: u64,
    pub extra: Bytes,
    pub mix_digest: B256,
    pub nonce: B64,
    pub base_fee: Option<U256>,
    pub withdrawals_hash: Option<B256>,
    pub blob_gas_used: Option<u64>,
    pub excess_blob_gas: Option<u64>,
    pub parent_beacon_root: Option<B256>,
    pub requests_hash: Option<B256>,
    pub extras: ExtraPayload,
}

impl Header {
    /// keccak256 of the encoded header.
    pub fn hash(&self) -> B256 {
        keccak256(encode(self))
    }

    pub fn decode(bytes: &[u8], registry: &Registry) -> Result<Self, DecodeError> {
        let mut stream = Stream::new(bytes);
        let header = Self::decode_from(&mut stream, registry)?;
        stream.finish()?;
        Ok(header)
    }

    /// Reads one header item. Items after the optional tail go to the
    /// payload `registry` binds to headers.
    pub fn decode_from(stream: &mut Stream<'_>, registry: &Registry) -> Result<Self, DecodeError> {
        let mut list = stream.list()?;
        let mut tail = TailReader::default();
        let mut header = Header {
            parent_hash: list.decode()?,
            uncle_hash: list.decode()?,
            coinbase: list.decode()?,
            root: list.decode()?,
            tx_hash: list.decode()?,
            receipt_hash: list.decode()?,
            bloom: list.decode()?,
            difficulty: list.decode()?,
            number: list.decode()?,
            gas_limit: list.decode()?,
            gas_used: list.decode()?,
            time: list.decode()?,
            extra: list.decode()?,
            mix_digest: list.decode()?,
            nonce: list.decode()?,
            base_fee: tail.optional(&mut list, Kind::String)?,
            withdrawals_hash: tail.optional(&mut list, Kind::String)?,
            blob_gas_used: tail.optional(&mut list, Kind::String)?,
            excess_blob_gas: tail.optional(&mut list, Kind::String)?,
            parent_beacon_root: tail.optional(&mut list, Kind::String)?,
            requests_hash: tail.optional(&mut list, Kind::String)?,
            extras: ExtraPayload::default(),
        };
        header.extras = tail.extras(registry, CarrierKind::Header, &mut list)?;
        list.finish()?;
        Ok(header)
    }
}

impl Encodable for Header {
    fn encode(&self, out: &mut Vec<u8>) {
        let mut list = ListEncoder::new();
        list.push(&self.parent_hash)
            .push(&self.uncle_hash)
            .push(&self.coinbase)
            .push(&self.root)
            .push(&self.tx_hash)
            .push(&self.receipt_hash)
            .push(&self.bloom)
            .push(&self.difficulty)
            .push(&self.number)
            .push(&self.gas_limit)
            .push(&self.gas_used)
            .push(&self.time)
            .push(&self.extra)
            .push(&self.mix_digest)
            .push(&self.nonce);
        let tail = [
            Optional::scalar(self.base_fee.as_ref()),
            Optional::scalar(self.withdrawals_hash.as_ref()),
            Optional::scalar(self.blob_gas_used.as_ref()),
            Optional::scalar(self.excess_blob_gas.as_ref()),
            Optional::scalar(self.parent_beacon_root.as_ref()),
            Optional::scalar(self.requests_hash.as_ref()),
        ];
        finish_with_extras(list, &tail, &self.extras, out);
    }
}

impl Carrier for Header {
    const KIND: CarrierKind = CarrierKind::Header;

    fn extras(&self) -> &ExtraPayload {
        &self.extras
    }

    fn extras_mut(&mut self) -> &mut ExtraPayload {
        &mut self.extras
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_codec::{absent_marker, CodecError};

    /// Re-wraps the encoding of `header` with `extra` appended inside the list.
    fn append_items(header: &Header, extra: &[u8]) -> Vec<u8> {
        let bytes = encode(header);
        let mut list = ListEncoder::new();
        list.push_raw(Stream::new(&bytes).list().unwrap().remaining())
            .push_raw(extra);
        list.finish()
    }

    fn cancun() -> Header {
        Header {
            parent_hash: B256::repeat_byte(0x01),
            coinbase: Address::repeat_byte(0x02),
            number: U256::from(19_426_587u64),
            gas_limit: 30_000_000,
            gas_used: 12_345_678,
            time: 1_710_338_135,
            extra: Bytes::from_static(b"keel"),
            base_fee: Some(U256::from(7u64)),
            withdrawals_hash: Some(B256::repeat_byte(0x03)),
            blob_gas_used: Some(0),
            excess_blob_gas: Some(0),
            parent_beacon_root: Some(B256::repeat_byte(0x04)),
            ..Default::default()
        }
    }

    #[test]
    fn header_round_trips() {
        let registry = Registry::empty();
        for header in [Header::default(), cancun()] {
            let bytes = encode(&header);
            assert_eq!(Header::decode(&bytes, &registry), Ok(header.clone()));
        }
    }

    #[test]
    fn pre_london_header_has_fifteen_fields() {
        let bytes = encode(&Header::default());
        let mut outer = Stream::new(&bytes);
        let mut list = outer.list().unwrap();
        let mut n = 0;
        while !list.is_empty() {
            list.raw().unwrap();
            n += 1;
        }
        assert_eq!(n, 15);
    }

    #[test]
    fn zero_blob_gas_is_not_absent() {
        let header = Header {
            base_fee: Some(U256::ZERO),
            withdrawals_hash: Some(B256::ZERO),
            blob_gas_used: Some(0),
            ..Default::default()
        };
        let decoded = Header::decode(&encode(&header), &Registry::empty()).unwrap();
        assert_eq!(decoded.blob_gas_used, Some(0));
        assert_eq!(decoded.excess_blob_gas, None);
    }

    #[test]
    fn unbound_trailing_items_are_rejected() {
        let registry = Registry::builder()
            .register::<Header, bool>()
            .unwrap()
            .finalize();
        let mut header = cancun();
        registry
            .payloads::<Header, bool>()
            .unwrap()
            .set(&mut header, true);
        let bytes = encode(&header);

        assert_eq!(Header::decode(&bytes, &registry), Ok(header));
        assert_eq!(
            Header::decode(&bytes, &Registry::empty()),
            Err(DecodeError::Codec(CodecError::TrailingBytes))
        );
    }

    #[test]
    fn trailing_marker_after_legacy_fields_is_rejected() {
        let bytes = append_items(&Header::default(), &[absent_marker(Kind::String)]);
        assert_eq!(
            Header::decode(&bytes, &Registry::empty()),
            Err(DecodeError::Codec(CodecError::RedundantField))
        );
    }

    #[test]
    fn padded_tail_is_rejected() {
        let header = Header {
            base_fee: Some(U256::from(7u64)),
            ..Header::default()
        };
        assert_eq!(Header::decode(&encode(&header), &Registry::empty()), Ok(header.clone()));

        let padded = append_items(&header, &[0xc0, 0xc0]);
        assert_eq!(
            Header::decode(&padded, &Registry::empty()),
            Err(DecodeError::Codec(CodecError::RedundantField))
        );
    }

    #[test]
    fn explicit_default_extension_is_rejected() {
        let registry = Registry::builder()
            .register::<Header, bool>()
            .unwrap()
            .finalize();
        let mut tail = ListEncoder::new();
        for _ in 0..6 {
            tail.push_absent(Kind::String);
        }
        tail.push(&false);
        let bytes = append_items(&Header::default(), tail.payload());
        assert_eq!(
            Header::decode(&bytes, &registry),
            Err(DecodeError::Codec(CodecError::RedundantField))
        );
    }
}
