use core::fmt;

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use keel_codec::{CodecError, Decodable, Encodable, Kind, ListEncoder, Stream};
use sha2::{Digest, Sha256};

use super::{AccessList, SignableFields, TxFields};
use crate::DecodeError;

/// Size of one blob in bytes.
pub const BLOB_SIZE: usize = 131_072;
/// Blob gas consumed per blob.
pub const BLOB_GAS_PER_BLOB: u64 = 1 << 17;
/// Leading byte of a versioned hash derived from a KZG commitment.
pub const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

/// KZG commitment or proof.
pub type Bytes48 = FixedBytes<48>;

/// Type `0x03`: carries commitments to out-of-band blob data.
///
/// The sidecar travels only in the network form and never contributes to
/// the transaction hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobTx {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_tip_cap: U256,
    pub gas_fee_cap: U256,
    pub gas: u64,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub access_list: AccessList,
    pub blob_fee_cap: U256,
    pub blob_hashes: Vec<B256>,
    pub v: U256,
    pub r: U256,
    pub s: U256,
    pub sidecar: Option<BlobSidecar>,
}

impl BlobTx {
    /// Total blob gas the transaction pays for.
    pub fn blob_gas(&self) -> u64 {
        BLOB_GAS_PER_BLOB * self.blob_hashes.len() as u64
    }

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
            .push(&self.blob_fee_cap)
            .push(&self.blob_hashes);
    }

    /// Writes the network form `[tx, (version,) blobs, commitments, proofs]`
    /// when a sidecar is attached, and the canonical field list otherwise.
    pub(crate) fn encode_network(&self, out: &mut Vec<u8>) {
        let mut fields = ListEncoder::new();
        self.encode_fields(&mut fields);
        let Some(sidecar) = &self.sidecar else {
            fields.finish_into(out);
            return;
        };
        let mut outer = ListEncoder::new();
        outer.push_raw(&fields.finish());
        sidecar.encode_fields(&mut outer);
        outer.finish_into(out);
    }

    /// Reads either form. The network form is recognised by its first
    /// element being a list.
    pub(crate) fn decode_network(stream: &mut Stream<'_>) -> Result<Self, DecodeError> {
        let mut outer = stream.list()?;
        if outer.kind()?.kind != Kind::List {
            let tx = Self::decode_fields(&mut outer)?;
            outer.finish()?;
            return Ok(tx);
        }
        let mut inner = outer.list()?;
        let mut tx = Self::decode_fields(&mut inner)?;
        inner.finish()?;
        tx.sidecar = Some(BlobSidecar::decode_fields(&mut outer)?);
        outer.finish()?;
        Ok(tx)
    }
}

impl TxFields for BlobTx {
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
            blob_fee_cap: list.decode()?,
            blob_hashes: list.decode()?,
            v: list.decode()?,
            r: list.decode()?,
            s: list.decode()?,
            sidecar: None,
        })
    }
}

impl SignableFields for BlobTx {
    fn encode_signing_fields(&self, chain_id: u64, list: &mut ListEncoder) {
        self.push_unsigned(chain_id, list);
    }
}

/// One blob of exactly [`BLOB_SIZE`] bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob(Bytes);

impl Blob {
    pub fn new(data: impl Into<Bytes>) -> Result<Self, CodecError> {
        let data = data.into();
        if data.len() != BLOB_SIZE {
            return Err(CodecError::InvalidLength {
                expected: BLOB_SIZE,
                got: data.len(),
            });
        }
        Ok(Self(data))
    }

    pub fn zeroed() -> Self {
        Self(Bytes::from(vec![0u8; BLOB_SIZE]))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({} bytes)", self.0.len())
    }
}

impl Encodable for Blob {
    fn encode(&self, out: &mut Vec<u8>) {
        self.0.encode(out)
    }
}

impl Decodable for Blob {
    fn decode(stream: &mut Stream<'_>) -> Result<Self, CodecError> {
        Self::new(Bytes::copy_from_slice(stream.bytes()?))
    }
}

/// Layout of the proofs in a sidecar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SidecarVersion {
    /// One proof per blob. No version byte on the wire.
    #[default]
    V0,
    /// Cell proofs, announced by a leading `1`.
    V1,
}

/// Blob data travelling alongside a [`BlobTx`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobSidecar {
    pub version: SidecarVersion,
    pub blobs: Vec<Blob>,
    pub commitments: Vec<Bytes48>,
    pub proofs: Vec<Bytes48>,
}

impl BlobSidecar {
    /// Versioned hash of each commitment, in order.
    pub fn versioned_hashes(&self) -> Vec<B256> {
        self.commitments.iter().map(kzg_to_versioned_hash).collect()
    }

    fn encode_fields(&self, list: &mut ListEncoder) {
        if self.version == SidecarVersion::V1 {
            list.push(&1u8);
        }
        list.push(&self.blobs)
            .push(&self.commitments)
            .push(&self.proofs);
    }

    fn decode_fields(rest: &mut Stream<'_>) -> Result<Self, DecodeError> {
        let version = if rest.kind()?.kind == Kind::List {
            SidecarVersion::V0
        } else {
            let version: U256 = rest.decode()?;
            if version != U256::from(1u64) {
                return Err(DecodeError::UnsupportedSidecarVersion(version));
            }
            SidecarVersion::V1
        };
        Ok(Self {
            version,
            blobs: rest.decode()?,
            commitments: rest.decode()?,
            proofs: rest.decode()?,
        })
    }
}

/// `sha256(commitment)` with the first byte replaced by the version.
pub fn kzg_to_versioned_hash(commitment: &Bytes48) -> B256 {
    let mut hash = B256::from_slice(&Sha256::digest(commitment.as_slice()));
    hash.0[0] = VERSIONED_HASH_VERSION_KZG;
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_codec::encode;

    fn sidecar(version: SidecarVersion) -> BlobSidecar {
        BlobSidecar {
            version,
            blobs: vec![Blob::zeroed()],
            commitments: vec![Bytes48::repeat_byte(0xc0)],
            proofs: vec![Bytes48::repeat_byte(0xc1)],
        }
    }

    fn tx_with(sidecar: Option<BlobSidecar>) -> BlobTx {
        BlobTx {
            chain_id: 1,
            to: Address::repeat_byte(0x42),
            blob_hashes: vec![B256::repeat_byte(0x01)],
            sidecar,
            ..Default::default()
        }
    }

    #[test]
    fn versioned_hash_has_version_byte() {
        let hash = kzg_to_versioned_hash(&Bytes48::ZERO);
        assert_eq!(hash[0], VERSIONED_HASH_VERSION_KZG);
        let mut expected = B256::from_slice(&Sha256::digest([0u8; 48]));
        expected.0[0] = 0x01;
        assert_eq!(hash, expected);
    }

    #[test]
    fn blob_rejects_wrong_size() {
        assert_eq!(
            Blob::new(vec![0u8; 10]),
            Err(CodecError::InvalidLength {
                expected: BLOB_SIZE,
                got: 10
            })
        );
    }

    #[test]
    fn network_form_wraps_canonical() {
        let canonical = {
            let mut out = Vec::new();
            tx_with(None).encode_network(&mut out);
            out
        };
        for version in [SidecarVersion::V0, SidecarVersion::V1] {
            let tx = tx_with(Some(sidecar(version)));
            let mut out = Vec::new();
            tx.encode_network(&mut out);

            let mut outer = Stream::new(&out);
            let mut items = outer.list().unwrap();
            assert_eq!(items.raw().unwrap(), canonical.as_slice());
            assert_eq!(items.kind().unwrap().kind == Kind::List, version == SidecarVersion::V0);

            let decoded = BlobTx::decode_network(&mut Stream::new(&out)).unwrap();
            assert_eq!(decoded, tx);
        }
    }

    fn network_bytes_with_version(version: u64) -> Vec<u8> {
        let tx = tx_with(None);
        let mut fields = ListEncoder::new();
        tx.encode_fields(&mut fields);
        let mut outer = ListEncoder::new();
        outer
            .push_raw(&fields.finish())
            .push(&version)
            .push(&Vec::<Blob>::new())
            .push(&Vec::<Bytes48>::new())
            .push(&Vec::<Bytes48>::new());
        outer.finish()
    }

    #[test]
    fn unknown_sidecar_version_is_rejected() {
        let bytes = network_bytes_with_version(2);
        assert_eq!(
            BlobTx::decode_network(&mut Stream::new(&bytes)),
            Err(DecodeError::UnsupportedSidecarVersion(U256::from(2u64)))
        );
    }

    #[test]
    fn wide_sidecar_version_is_reported_as_unsupported() {
        let bytes = network_bytes_with_version(256);
        assert_eq!(
            BlobTx::decode_network(&mut Stream::new(&bytes)),
            Err(DecodeError::UnsupportedSidecarVersion(U256::from(256u64)))
        );
    }

    #[test]
    fn blob_gas_scales_with_hashes() {
        let tx = tx_with(None);
        assert_eq!(tx.blob_gas(), BLOB_GAS_PER_BLOB);
        assert_eq!(encode(&tx.blob_hashes)[0], 0xe1);
    }
}
