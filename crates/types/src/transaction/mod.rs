//! Transaction variants and the envelope that carries them.
//!
//! The binary form of a typed transaction is `type || rlp(fields)`. Legacy
//! transactions have no type byte and are a bare list, which is how decoding
//! tells them apart: a first byte above `0x7f` can only start a list.

mod access_list;
mod blob;
mod deposit;
mod dynamic_fee;
mod legacy;
mod set_code;

use core::fmt;
use std::sync::OnceLock;

use alloy_primitives::{Address, Bytes, B256, U256};
use keel_codec::{keccak256, write_string, CodecError, Encodable, Kind, ListEncoder, Stream};
use tracing::{debug, trace};

use crate::DecodeError;

pub use access_list::{AccessList, AccessListTx, AccessTuple};
pub use blob::{
    kzg_to_versioned_hash, Blob, BlobSidecar, BlobTx, Bytes48, SidecarVersion,
    BLOB_GAS_PER_BLOB, BLOB_SIZE, VERSIONED_HASH_VERSION_KZG,
};
pub use deposit::DepositTx;
pub use dynamic_fee::DynamicFeeTx;
pub use legacy::{derive_chain_id, is_protected_v, LegacyTx};
pub use set_code::{Authorization, SetCodeTx, SET_CODE_AUTH_MAGIC};

/// Field layout of one variant, signature included.
pub(crate) trait TxFields: Sized {
    fn encode_fields(&self, list: &mut ListEncoder);
    /// Reads the fields from inside the variant's list. The caller checks
    /// that nothing is left.
    fn decode_fields(list: &mut Stream<'_>) -> Result<Self, CodecError>;
}

/// Variants with a signing payload.
pub(crate) trait SignableFields: TxFields {
    /// Fields covered by the signature when signing for `chain_id`.
    fn encode_signing_fields(&self, chain_id: u64, list: &mut ListEncoder);
}

/// Wire discriminant of a transaction variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TxType {
    Legacy = 0x00,
    AccessList = 0x01,
    DynamicFee = 0x02,
    Blob = 0x03,
    SetCode = 0x04,
    Deposit = 0x7e,
}

impl TryFrom<u8> for TxType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(TxType::Legacy),
            0x01 => Ok(TxType::AccessList),
            0x02 => Ok(TxType::DynamicFee),
            0x03 => Ok(TxType::Blob),
            0x04 => Ok(TxType::SetCode),
            0x7e => Ok(TxType::Deposit),
            other => Err(DecodeError::UnsupportedTxType(other)),
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxType::Legacy => "legacy",
            TxType::AccessList => "access-list",
            TxType::DynamicFee => "dynamic-fee",
            TxType::Blob => "blob",
            TxType::SetCode => "set-code",
            TxType::Deposit => "deposit",
        };
        write!(f, "{name} ({:#04x})", *self as u8)
    }
}

/// The closed set of transaction layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxPayload {
    Legacy(LegacyTx),
    AccessList(AccessListTx),
    DynamicFee(DynamicFeeTx),
    Blob(BlobTx),
    SetCode(SetCodeTx),
    Deposit(DepositTx),
}

impl From<LegacyTx> for TxPayload {
    fn from(tx: LegacyTx) -> Self {
        TxPayload::Legacy(tx)
    }
}

impl From<AccessListTx> for TxPayload {
    fn from(tx: AccessListTx) -> Self {
        TxPayload::AccessList(tx)
    }
}

impl From<DynamicFeeTx> for TxPayload {
    fn from(tx: DynamicFeeTx) -> Self {
        TxPayload::DynamicFee(tx)
    }
}

impl From<BlobTx> for TxPayload {
    fn from(tx: BlobTx) -> Self {
        TxPayload::Blob(tx)
    }
}

impl From<SetCodeTx> for TxPayload {
    fn from(tx: SetCodeTx) -> Self {
        TxPayload::SetCode(tx)
    }
}

impl From<DepositTx> for TxPayload {
    fn from(tx: DepositTx) -> Self {
        TxPayload::Deposit(tx)
    }
}

impl TxPayload {
    pub fn tx_type(&self) -> TxType {
        match self {
            TxPayload::Legacy(_) => TxType::Legacy,
            TxPayload::AccessList(_) => TxType::AccessList,
            TxPayload::DynamicFee(_) => TxType::DynamicFee,
            TxPayload::Blob(_) => TxType::Blob,
            TxPayload::SetCode(_) => TxType::SetCode,
            TxPayload::Deposit(_) => TxType::Deposit,
        }
    }

    fn encode_fields(&self, list: &mut ListEncoder) {
        match self {
            TxPayload::Legacy(tx) => tx.encode_fields(list),
            TxPayload::AccessList(tx) => tx.encode_fields(list),
            TxPayload::DynamicFee(tx) => tx.encode_fields(list),
            TxPayload::Blob(tx) => tx.encode_fields(list),
            TxPayload::SetCode(tx) => tx.encode_fields(list),
            TxPayload::Deposit(tx) => tx.encode_fields(list),
        }
    }

    /// The message a signer signs for `chain_id`. `None` for deposits.
    ///
    /// Typed variants always sign over `chain_id`. Legacy transactions fold
    /// it in only when it is non-zero.
    pub fn signing_payload(&self, chain_id: u64) -> Option<Vec<u8>> {
        let mut list = ListEncoder::new();
        match self {
            TxPayload::Legacy(tx) => {
                tx.encode_signing_fields(chain_id, &mut list);
                return Some(list.finish());
            }
            TxPayload::AccessList(tx) => tx.encode_signing_fields(chain_id, &mut list),
            TxPayload::DynamicFee(tx) => tx.encode_signing_fields(chain_id, &mut list),
            TxPayload::Blob(tx) => tx.encode_signing_fields(chain_id, &mut list),
            TxPayload::SetCode(tx) => tx.encode_signing_fields(chain_id, &mut list),
            TxPayload::Deposit(_) => return None,
        }
        let mut out = vec![self.tx_type() as u8];
        list.finish_into(&mut out);
        Some(out)
    }

    pub fn sig_hash(&self, chain_id: u64) -> Option<B256> {
        self.signing_payload(chain_id).map(keccak256)
    }

    /// `(v, r, s)` as stored. Deposits report zeros.
    pub fn raw_signature_values(&self) -> (U256, U256, U256) {
        match self {
            TxPayload::Legacy(tx) => (tx.v, tx.r, tx.s),
            TxPayload::AccessList(tx) => (tx.v, tx.r, tx.s),
            TxPayload::DynamicFee(tx) => (tx.v, tx.r, tx.s),
            TxPayload::Blob(tx) => (tx.v, tx.r, tx.s),
            TxPayload::SetCode(tx) => (tx.v, tx.r, tx.s),
            TxPayload::Deposit(_) => (U256::ZERO, U256::ZERO, U256::ZERO),
        }
    }

    /// Copy with the signature replaced. Typed variants also take
    /// `chain_id` when one is given; deposits are returned unchanged.
    pub fn with_signature_values(&self, chain_id: Option<u64>, v: U256, r: U256, s: U256) -> Self {
        let mut next = self.clone();
        match &mut next {
            TxPayload::Legacy(tx) => (tx.v, tx.r, tx.s) = (v, r, s),
            TxPayload::AccessList(tx) => {
                tx.chain_id = chain_id.unwrap_or(tx.chain_id);
                (tx.v, tx.r, tx.s) = (v, r, s);
            }
            TxPayload::DynamicFee(tx) => {
                tx.chain_id = chain_id.unwrap_or(tx.chain_id);
                (tx.v, tx.r, tx.s) = (v, r, s);
            }
            TxPayload::Blob(tx) => {
                tx.chain_id = chain_id.unwrap_or(tx.chain_id);
                (tx.v, tx.r, tx.s) = (v, r, s);
            }
            TxPayload::SetCode(tx) => {
                tx.chain_id = chain_id.unwrap_or(tx.chain_id);
                (tx.v, tx.r, tx.s) = (v, r, s);
            }
            TxPayload::Deposit(_) => {}
        }
        next
    }
}

/// Identity of the signer that recovered a cached sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignerId {
    pub generation: u8,
    pub chain_id: u64,
}

/// A transaction with lazily computed hash, size and sender.
///
/// Each cache is published at most once. Concurrent first readers may
/// compute the value more than once but all observe the same result.
#[derive(Debug, Clone)]
pub struct Transaction {
    payload: TxPayload,
    hash: OnceLock<B256>,
    size: OnceLock<usize>,
    sender: OnceLock<(SignerId, Address)>,
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl Eq for Transaction {}

impl From<TxPayload> for Transaction {
    fn from(payload: TxPayload) -> Self {
        Self::new(payload)
    }
}

fn decode_list<T: TxFields>(stream: &mut Stream<'_>) -> Result<T, CodecError> {
    let mut list = stream.list()?;
    let tx = T::decode_fields(&mut list)?;
    list.finish()?;
    Ok(tx)
}

/// Decodes the typed binary form `type || body`.
fn decode_typed(bytes: &[u8]) -> Result<TxPayload, DecodeError> {
    let [ty, body @ ..] = bytes else {
        return Err(DecodeError::EmptyTypedTx);
    };
    if body.is_empty() {
        return Err(DecodeError::EmptyTypedTx);
    }
    let mut stream = Stream::new(body);
    let payload = match TxType::try_from(*ty) {
        Ok(TxType::AccessList) => TxPayload::AccessList(decode_list(&mut stream)?),
        Ok(TxType::DynamicFee) => TxPayload::DynamicFee(decode_list(&mut stream)?),
        Ok(TxType::Blob) => TxPayload::Blob(BlobTx::decode_network(&mut stream)?),
        Ok(TxType::SetCode) => TxPayload::SetCode(decode_list(&mut stream)?),
        Ok(TxType::Deposit) => TxPayload::Deposit(decode_list(&mut stream)?),
        Ok(TxType::Legacy) | Err(_) => {
            debug!(tx_type = *ty, "rejecting unsupported transaction type");
            return Err(DecodeError::UnsupportedTxType(*ty));
        }
    };
    stream.finish()?;
    Ok(payload)
}

impl Transaction {
    pub fn new(payload: impl Into<TxPayload>) -> Self {
        Self {
            payload: payload.into(),
            hash: OnceLock::new(),
            size: OnceLock::new(),
            sender: OnceLock::new(),
        }
    }

    fn with_size(payload: TxPayload, size: usize) -> Self {
        Self {
            size: OnceLock::from(size),
            ..Self::new(payload)
        }
    }

    pub fn payload(&self) -> &TxPayload {
        &self.payload
    }

    pub fn into_payload(self) -> TxPayload {
        self.payload
    }

    pub fn tx_type(&self) -> TxType {
        self.payload.tx_type()
    }

    fn encode_binary(&self, out: &mut Vec<u8>, network: bool) {
        match &self.payload {
            TxPayload::Legacy(tx) => {
                let mut list = ListEncoder::new();
                tx.encode_fields(&mut list);
                list.finish_into(out);
            }
            TxPayload::Blob(tx) if network => {
                out.push(TxType::Blob as u8);
                tx.encode_network(out);
            }
            payload => {
                out.push(payload.tx_type() as u8);
                let mut list = ListEncoder::new();
                payload.encode_fields(&mut list);
                list.finish_into(out);
            }
        }
    }

    /// Binary form. Blob transactions with an attached sidecar use the
    /// network form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_binary(&mut out, true);
        out
    }

    /// Binary form without any sidecar. This is what [`Transaction::hash`]
    /// covers.
    pub fn encode_canonical(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_binary(&mut out, false);
        out
    }

    /// Decodes the binary form, typed or legacy.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let payload = match bytes.first() {
            Some(&b) if b > 0x7f => {
                let mut stream = Stream::new(bytes);
                let tx = decode_list(&mut stream)?;
                stream.finish()?;
                TxPayload::Legacy(tx)
            }
            _ => decode_typed(bytes)?,
        };
        Ok(Self::with_size(payload, bytes.len()))
    }

    /// Decodes one transaction as it appears inside a list: a legacy list,
    /// or a byte-string holding the typed binary form.
    pub fn decode_from(stream: &mut Stream<'_>) -> Result<Self, DecodeError> {
        if stream.kind()?.kind == Kind::List {
            let raw = stream.raw()?;
            let tx = decode_list(&mut Stream::new(raw))?;
            return Ok(Self::with_size(TxPayload::Legacy(tx), raw.len()));
        }
        let bytes = stream.bytes()?;
        Ok(Self::with_size(decode_typed(bytes)?, bytes.len()))
    }

    /// keccak256 of the canonical encoding.
    pub fn hash(&self) -> B256 {
        *self
            .hash
            .get_or_init(|| keccak256(self.encode_canonical()))
    }

    /// Length of [`Transaction::encode`], or of the input this was decoded
    /// from.
    pub fn size(&self) -> usize {
        *self.size.get_or_init(|| self.encode().len())
    }

    /// Sender recovered earlier by `signer`, if that is who filled the cache.
    pub fn cached_sender(&self, signer: SignerId) -> Option<Address> {
        let (id, sender) = self.sender.get()?;
        if *id != signer {
            return None;
        }
        trace!(tx = %self.hash(), %sender, "sender cache hit");
        Some(*sender)
    }

    /// Publishes a recovered sender. Only the first publish sticks.
    pub fn cache_sender(&self, signer: SignerId, sender: Address) {
        let _ = self.sender.set((signer, sender));
    }

    /// Chain id the transaction is bound to. `None` for unprotected legacy
    /// transactions and deposits.
    pub fn chain_id(&self) -> Option<u64> {
        match &self.payload {
            TxPayload::Legacy(tx) => tx.chain_id(),
            TxPayload::AccessList(tx) => Some(tx.chain_id),
            TxPayload::DynamicFee(tx) => Some(tx.chain_id),
            TxPayload::Blob(tx) => Some(tx.chain_id),
            TxPayload::SetCode(tx) => Some(tx.chain_id),
            TxPayload::Deposit(_) => None,
        }
    }

    /// False only for legacy transactions signed without a chain id.
    pub fn protected(&self) -> bool {
        match &self.payload {
            TxPayload::Legacy(tx) => tx.protected(),
            _ => true,
        }
    }

    pub fn nonce(&self) -> u64 {
        match &self.payload {
            TxPayload::Legacy(tx) => tx.nonce,
            TxPayload::AccessList(tx) => tx.nonce,
            TxPayload::DynamicFee(tx) => tx.nonce,
            TxPayload::Blob(tx) => tx.nonce,
            TxPayload::SetCode(tx) => tx.nonce,
            TxPayload::Deposit(_) => 0,
        }
    }

    pub fn gas(&self) -> u64 {
        match &self.payload {
            TxPayload::Legacy(tx) => tx.gas,
            TxPayload::AccessList(tx) => tx.gas,
            TxPayload::DynamicFee(tx) => tx.gas,
            TxPayload::Blob(tx) => tx.gas,
            TxPayload::SetCode(tx) => tx.gas,
            TxPayload::Deposit(tx) => tx.gas,
        }
    }

    /// Gas price, or the fee cap for dynamic-fee variants.
    pub fn gas_price(&self) -> U256 {
        self.gas_fee_cap()
    }

    pub fn gas_tip_cap(&self) -> U256 {
        match &self.payload {
            TxPayload::Legacy(tx) => tx.gas_price,
            TxPayload::AccessList(tx) => tx.gas_price,
            TxPayload::DynamicFee(tx) => tx.gas_tip_cap,
            TxPayload::Blob(tx) => tx.gas_tip_cap,
            TxPayload::SetCode(tx) => tx.gas_tip_cap,
            TxPayload::Deposit(_) => U256::ZERO,
        }
    }

    pub fn gas_fee_cap(&self) -> U256 {
        match &self.payload {
            TxPayload::Legacy(tx) => tx.gas_price,
            TxPayload::AccessList(tx) => tx.gas_price,
            TxPayload::DynamicFee(tx) => tx.gas_fee_cap,
            TxPayload::Blob(tx) => tx.gas_fee_cap,
            TxPayload::SetCode(tx) => tx.gas_fee_cap,
            TxPayload::Deposit(_) => U256::ZERO,
        }
    }

    pub fn value(&self) -> U256 {
        match &self.payload {
            TxPayload::Legacy(tx) => tx.value,
            TxPayload::AccessList(tx) => tx.value,
            TxPayload::DynamicFee(tx) => tx.value,
            TxPayload::Blob(tx) => tx.value,
            TxPayload::SetCode(tx) => tx.value,
            TxPayload::Deposit(tx) => tx.value,
        }
    }

    /// Recipient. `None` means contract creation.
    pub fn to(&self) -> Option<Address> {
        match &self.payload {
            TxPayload::Legacy(tx) => tx.to,
            TxPayload::AccessList(tx) => tx.to,
            TxPayload::DynamicFee(tx) => tx.to,
            TxPayload::Blob(tx) => Some(tx.to),
            TxPayload::SetCode(tx) => Some(tx.to),
            TxPayload::Deposit(tx) => tx.to,
        }
    }

    pub fn data(&self) -> &Bytes {
        match &self.payload {
            TxPayload::Legacy(tx) => &tx.data,
            TxPayload::AccessList(tx) => &tx.data,
            TxPayload::DynamicFee(tx) => &tx.data,
            TxPayload::Blob(tx) => &tx.data,
            TxPayload::SetCode(tx) => &tx.data,
            TxPayload::Deposit(tx) => &tx.data,
        }
    }

    pub fn access_list(&self) -> Option<&AccessList> {
        match &self.payload {
            TxPayload::AccessList(tx) => Some(&tx.access_list),
            TxPayload::DynamicFee(tx) => Some(&tx.access_list),
            TxPayload::Blob(tx) => Some(&tx.access_list),
            TxPayload::SetCode(tx) => Some(&tx.access_list),
            TxPayload::Legacy(_) | TxPayload::Deposit(_) => None,
        }
    }

    pub fn blob_hashes(&self) -> &[B256] {
        match &self.payload {
            TxPayload::Blob(tx) => &tx.blob_hashes,
            _ => &[],
        }
    }

    pub fn blob_gas_fee_cap(&self) -> Option<U256> {
        match &self.payload {
            TxPayload::Blob(tx) => Some(tx.blob_fee_cap),
            _ => None,
        }
    }

    pub fn blob_gas(&self) -> u64 {
        match &self.payload {
            TxPayload::Blob(tx) => tx.blob_gas(),
            _ => 0,
        }
    }

    pub fn authorization_list(&self) -> &[Authorization] {
        match &self.payload {
            TxPayload::SetCode(tx) => &tx.authorization_list,
            _ => &[],
        }
    }

    pub fn raw_signature_values(&self) -> (U256, U256, U256) {
        self.payload.raw_signature_values()
    }

    pub fn blob_sidecar(&self) -> Option<&BlobSidecar> {
        match &self.payload {
            TxPayload::Blob(tx) => tx.sidecar.as_ref(),
            _ => None,
        }
    }

    /// Copy carrying `sidecar`. Other variants are returned as they are.
    pub fn with_blob_sidecar(&self, sidecar: BlobSidecar) -> Self {
        self.replace_sidecar(Some(sidecar))
    }

    /// Copy without a sidecar, as stored in blocks.
    pub fn without_blob_sidecar(&self) -> Self {
        self.replace_sidecar(None)
    }

    fn replace_sidecar(&self, sidecar: Option<BlobSidecar>) -> Self {
        let TxPayload::Blob(tx) = &self.payload else {
            return self.clone();
        };
        let next = BlobTx {
            sidecar,
            ..tx.clone()
        };
        // The hash never covers the sidecar, so it carries over.
        Self {
            hash: self.hash.clone(),
            sender: self.sender.clone(),
            ..Self::new(next)
        }
    }
}

/// In-list form: legacy transactions are lists, typed ones a byte-string
/// around their binary form.
impl Encodable for Transaction {
    fn encode(&self, out: &mut Vec<u8>) {
        match &self.payload {
            TxPayload::Legacy(_) => self.encode_binary(out, true),
            _ => write_string(out, &Transaction::encode(self)),
        }
    }
}
