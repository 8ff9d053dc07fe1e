use alloy_primitives::{Address, B256};
use keel_codec::{CodecError, Decodable, Encodable, Kind, ListEncoder, Stream};

use crate::extras::{Carrier, CarrierKind, ExtraPayload, Registry};
use crate::tail::{finish_with_extras, Optional, TailReader};
use crate::{DecodeError, Header, Transaction};

/// Validator withdrawal. `amount` is in gwei.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Withdrawal {
    pub index: u64,
    pub validator_index: u64,
    pub address: Address,
    pub amount: u64,
}

impl Encodable for Withdrawal {
    fn encode(&self, out: &mut Vec<u8>) {
        let mut list = ListEncoder::new();
        list.push(&self.index)
            .push(&self.validator_index)
            .push(&self.address)
            .push(&self.amount);
        list.finish_into(out);
    }
}

impl Decodable for Withdrawal {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError> {
        let mut list = stream.list()?;
        let withdrawal = Self {
            index: list.decode()?,
            validator_index: list.decode()?,
            address: list.decode()?,
            amount: list.decode()?,
        };
        list.finish()?;
        Ok(withdrawal)
    }
}

/// Block contents.
///
/// `transactions` and `uncles` are always written, empty or not.
/// `withdrawals` is optional: `None` and `Some(vec![])` encode differently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    pub transactions: Vec<Transaction>,
    pub uncles: Vec<Header>,
    pub withdrawals: Option<Vec<Withdrawal>>,
    pub extras: ExtraPayload,
}

fn decode_transactions(stream: &mut Stream<'_>) -> Result<Vec<Transaction>, DecodeError> {
    let mut list = stream.list()?;
    let mut txs = Vec::new();
    while !list.is_empty() {
        txs.push(Transaction::decode_from(&mut list)?);
    }
    Ok(txs)
}

fn decode_headers(
    stream: &mut Stream<'_>,
    registry: &Registry,
) -> Result<Vec<Header>, DecodeError> {
    let mut list = stream.list()?;
    let mut headers = Vec::new();
    while !list.is_empty() {
        headers.push(Header::decode_from(&mut list, registry)?);
    }
    Ok(headers)
}

impl Body {
    pub fn decode(bytes: &[u8], registry: &Registry) -> Result<Self, DecodeError> {
        let mut stream = Stream::new(bytes);
        let mut list = stream.list()?;
        let body = Self::decode_fields(&mut list, registry)?;
        list.finish()?;
        stream.finish()?;
        Ok(body)
    }

    /// Appends the body's fields, its optional tail and any extension fields
    /// to `list`, then closes it into `out`.
    fn finish_fields(&self, mut list: ListEncoder, out: &mut Vec<u8>) {
        list.push(&self.transactions).push(&self.uncles);
        let tail = [Optional::list(self.withdrawals.as_ref())];
        finish_with_extras(list, &tail, &self.extras, out);
    }

    fn decode_fields(list: &mut Stream<'_>, registry: &Registry) -> Result<Self, DecodeError> {
        let mut tail = TailReader::default();
        let mut body = Body {
            transactions: decode_transactions(list)?,
            uncles: decode_headers(list, registry)?,
            withdrawals: tail.optional(list, Kind::List)?,
            extras: ExtraPayload::default(),
        };
        body.extras = tail.extras(registry, CarrierKind::Body, list)?;
        Ok(body)
    }
}

impl Encodable for Body {
    fn encode(&self, out: &mut Vec<u8>) {
        self.finish_fields(ListEncoder::new(), out);
    }
}

impl Carrier for Body {
    const KIND: CarrierKind = CarrierKind::Body;

    fn extras(&self) -> &ExtraPayload {
        &self.extras
    }

    fn extras_mut(&mut self) -> &mut ExtraPayload {
        &mut self.extras
    }
}

/// A header and its body, encoded as `[header, txs, uncles, withdrawals?, ..]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub header: Header,
    pub body: Body,
}

impl Block {
    pub fn new(header: Header, body: Body) -> Self {
        Self { header, body }
    }

    /// The header hash.
    pub fn hash(&self) -> B256 {
        self.header.hash()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.body.transactions
    }

    pub fn decode(bytes: &[u8], registry: &Registry) -> Result<Self, DecodeError> {
        let mut stream = Stream::new(bytes);
        let mut list = stream.list()?;
        let header = Header::decode_from(&mut list, registry)?;
        let body = Body::decode_fields(&mut list, registry)?;
        list.finish()?;
        stream.finish()?;
        Ok(Self { header, body })
    }
}

impl Encodable for Block {
    fn encode(&self, out: &mut Vec<u8>) {
        let mut list = ListEncoder::new();
        list.push(&self.header);
        self.body.finish_fields(list, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{DynamicFeeTx, LegacyTx};
    use alloy_primitives::U256;
    use hex_literal::hex;
    use keel_codec::encode;

    fn sample_body() -> Body {
        Body {
            transactions: vec![
                Transaction::new(LegacyTx {
                    nonce: 1,
                    gas: 21_000,
                    v: U256::from(27u64),
                    ..Default::default()
                }),
                Transaction::new(DynamicFeeTx {
                    chain_id: 1,
                    gas: 21_000,
                    ..Default::default()
                }),
            ],
            uncles: vec![Header::default()],
            withdrawals: Some(vec![Withdrawal {
                index: 1,
                validator_index: 2,
                address: Address::repeat_byte(0x05),
                amount: 32_000_000_000,
            }]),
            extras: ExtraPayload::default(),
        }
    }

    #[test]
    fn empty_transactions_encode_as_empty_list() {
        // legacy body: no withdrawals field at all
        assert_eq!(encode(&Body::default()), hex!("c2c0c0"));
    }

    #[test]
    fn absent_and_empty_withdrawals_differ() {
        let absent = Body::default();
        let empty = Body {
            withdrawals: Some(Vec::new()),
            ..Default::default()
        };
        assert_eq!(encode(&empty), hex!("c3c0c0c0"));
        assert_ne!(encode(&absent), encode(&empty));

        let registry = Registry::empty();
        assert_eq!(Body::decode(&encode(&absent), &registry), Ok(absent));
        assert_eq!(Body::decode(&encode(&empty), &registry), Ok(empty));
    }

    #[test]
    fn body_and_block_round_trip() {
        let registry = Registry::empty();
        let body = sample_body();
        assert_eq!(Body::decode(&encode(&body), &registry), Ok(body.clone()));

        let block = Block::new(
            Header {
                number: U256::from(1u64),
                ..Default::default()
            },
            body,
        );
        let decoded = Block::decode(&encode(&block), &registry).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.hash(), block.header.hash());
        assert_eq!(decoded.transactions().len(), 2);
    }

    #[test]
    fn body_extension_follows_withdrawal_marker() {
        let registry = Registry::builder()
            .register::<Body, bool>()
            .unwrap()
            .finalize();
        let mut body = Body::default();
        registry
            .payloads::<Body, bool>()
            .unwrap()
            .set(&mut body, true);
        // txs, uncles, absent withdrawals, extension flag
        assert_eq!(encode(&body), hex!("c4c0c08001"));
        assert_eq!(Body::decode(&hex!("c4c0c08001"), &registry), Ok(body));
    }

    #[test]
    fn trailing_withdrawals_marker_is_rejected() {
        // absent withdrawals written out with nothing after them
        assert_eq!(
            Body::decode(&hex!("c3c0c080"), &Registry::empty()),
            Err(DecodeError::Codec(CodecError::RedundantField))
        );
    }

    #[test]
    fn explicit_default_body_extension_is_rejected() {
        let registry = Registry::builder()
            .register::<Body, bool>()
            .unwrap()
            .finalize();
        assert_eq!(
            Body::decode(&hex!("c4c0c08080"), &registry),
            Err(DecodeError::Codec(CodecError::RedundantField))
        );
        // the same marker is fine once the flag is set
        assert!(Body::decode(&hex!("c4c0c08001"), &registry).is_ok());
    }

    #[test]
    fn withdrawal_layout() {
        let w = Withdrawal {
            index: 0,
            validator_index: 1,
            address: Address::ZERO,
            amount: 2,
        };
        let enc = encode(&w);
        assert_eq!(enc[0], 0xd8);
        assert_eq!(keel_codec::decode_exact::<Withdrawal>(&enc), Ok(w));
    }
}
