use k256::ecdsa::SigningKey;
use keel_types::transaction::LegacyTx;
use keel_types::{Address, ChainConfig, SignerId, Transaction, TxPayload, TxType, B256, U256};
use tracing::{debug, trace};

use crate::{recover_address, sign_hash, SignerError, SECP256K1_N};

/// Rule set a signer applies, oldest first. Each generation accepts every
/// transaction type the previous one did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Generation {
    /// Legacy only, high-s signatures allowed.
    Frontier,
    /// Legacy only, low-s required.
    Homestead,
    /// Legacy with the chain id folded into `v`.
    Eip155,
    Berlin,
    London,
    Cancun,
    Prague,
}

impl Generation {
    /// Oldest generation that can sign `tx_type`.
    fn introducing(tx_type: TxType) -> Self {
        match tx_type {
            TxType::Legacy | TxType::Deposit => Generation::Frontier,
            TxType::AccessList => Generation::Berlin,
            TxType::DynamicFee => Generation::London,
            TxType::Blob => Generation::Cancun,
            TxType::SetCode => Generation::Prague,
        }
    }
}

/// Digest and sender-recovery strategy for one chain and rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signer {
    generation: Generation,
    chain_id: u64,
}

impl Signer {
    /// Pre-replay-protection generations ignore `chain_id`.
    pub fn new(generation: Generation, chain_id: u64) -> Self {
        let chain_id = match generation {
            Generation::Frontier | Generation::Homestead => 0,
            _ => chain_id,
        };
        Self {
            generation,
            chain_id,
        }
    }

    pub fn frontier() -> Self {
        Self::new(Generation::Frontier, 0)
    }

    pub fn homestead() -> Self {
        Self::new(Generation::Homestead, 0)
    }

    pub fn eip155(chain_id: u64) -> Self {
        Self::new(Generation::Eip155, chain_id)
    }

    pub fn berlin(chain_id: u64) -> Self {
        Self::new(Generation::Berlin, chain_id)
    }

    pub fn london(chain_id: u64) -> Self {
        Self::new(Generation::London, chain_id)
    }

    pub fn cancun(chain_id: u64) -> Self {
        Self::new(Generation::Cancun, chain_id)
    }

    pub fn prague(chain_id: u64) -> Self {
        Self::new(Generation::Prague, chain_id)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Key under which this signer caches recovered senders.
    pub fn id(&self) -> SignerId {
        SignerId {
            generation: self.generation as u8,
            chain_id: self.chain_id,
        }
    }

    pub fn supports(&self, tx_type: TxType) -> bool {
        self.generation >= Generation::introducing(tx_type)
    }

    fn replay_protected(&self) -> bool {
        self.generation >= Generation::Eip155
    }

    fn check_supported(&self, tx: &Transaction) -> Result<(), SignerError> {
        let tx_type = tx.tx_type();
        if self.supports(tx_type) {
            Ok(())
        } else {
            Err(SignerError::UnsupportedSignerForTxType(tx_type))
        }
    }

    /// Digest this signer signs for `tx`.
    pub fn sig_hash(&self, tx: &Transaction) -> Result<B256, SignerError> {
        self.check_supported(tx)?;
        let chain_id = match tx.tx_type() {
            TxType::Legacy if !self.replay_protected() => 0,
            _ => self.chain_id,
        };
        tx.payload()
            .sig_hash(chain_id)
            .ok_or(SignerError::UnsupportedSignerForTxType(tx.tx_type()))
    }

    /// Address that signed `tx`. Deposits report their `from` field.
    ///
    /// The result is cached on the transaction for this signer's identity.
    pub fn sender(&self, tx: &Transaction) -> Result<Address, SignerError> {
        if let TxPayload::Deposit(deposit) = tx.payload() {
            return Ok(deposit.from);
        }
        self.check_supported(tx)?;
        if let Some(sender) = tx.cached_sender(self.id()) {
            return Ok(sender);
        }
        let sender = self.recover_sender(tx).inspect_err(|err| {
            debug!(tx = %tx.hash(), signer = ?self, %err, "sender recovery failed");
        })?;
        tx.cache_sender(self.id(), sender);
        Ok(sender)
    }

    fn recover_sender(&self, tx: &Transaction) -> Result<Address, SignerError> {
        let payload = tx.payload();
        let (v, r, s) = tx.raw_signature_values();

        if let TxPayload::Legacy(legacy) = payload {
            return self.recover_legacy(legacy, payload, v, r, s);
        }

        let have = tx.chain_id().unwrap_or_default();
        if have != self.chain_id {
            return Err(SignerError::InvalidChainId {
                have,
                want: self.chain_id,
            });
        }
        let hash = payload
            .sig_hash(self.chain_id)
            .ok_or(SignerError::UnsupportedSignerForTxType(tx.tx_type()))?;
        // typed transactions store the bare parity bit
        recover_plain(&hash, r, s, v.saturating_add(U256::from(27u64)), true)
    }

    fn recover_legacy(
        &self,
        legacy: &LegacyTx,
        payload: &TxPayload,
        v: U256,
        r: U256,
        s: U256,
    ) -> Result<Address, SignerError> {
        let unprotected_hash = || {
            payload
                .sig_hash(0)
                .ok_or(SignerError::UnsupportedSignerForTxType(TxType::Legacy))
        };

        if !legacy.protected() {
            let homestead = self.generation != Generation::Frontier;
            return recover_plain(&unprotected_hash()?, r, s, v, homestead);
        }
        if !self.replay_protected() {
            return Err(SignerError::UnexpectedProtection);
        }

        let have = legacy.chain_id().ok_or(SignerError::InvalidSignature)?;
        if have != self.chain_id {
            return Err(SignerError::InvalidChainId {
                have,
                want: self.chain_id,
            });
        }
        // v = recid + 35 + 2 * chain_id  =>  recid + 27
        let offset = U256::from(self.chain_id) * U256::from(2u64) + U256::from(8u64);
        let v = v.checked_sub(offset).ok_or(SignerError::InvalidSignature)?;
        let hash = payload
            .sig_hash(self.chain_id)
            .ok_or(SignerError::UnsupportedSignerForTxType(TxType::Legacy))?;
        recover_plain(&hash, r, s, v, true)
    }

    /// Splits a 65-byte `r || s || recid` signature into the `(v, r, s)`
    /// values `tx` stores.
    pub fn signature_values(
        &self,
        tx: &Transaction,
        sig: &[u8],
    ) -> Result<(U256, U256, U256), SignerError> {
        if sig.len() != 65 {
            return Err(SignerError::InvalidSignatureLength(sig.len()));
        }
        self.check_supported(tx)?;

        let r = U256::from_be_slice(&sig[..32]);
        let s = U256::from_be_slice(&sig[32..64]);
        let recid = U256::from(sig[64]);

        let v = match tx.payload() {
            TxPayload::Deposit(_) => {
                return Err(SignerError::UnsupportedSignerForTxType(TxType::Deposit))
            }
            TxPayload::Legacy(_) if self.replay_protected() && self.chain_id != 0 => {
                recid + U256::from(35u64) + U256::from(self.chain_id) * U256::from(2u64)
            }
            TxPayload::Legacy(_) => recid + U256::from(27u64),
            _ => {
                // zero means "not yet bound"; the signer fills it in
                if let Some(have) = tx.chain_id().filter(|id| *id != 0) {
                    if have != self.chain_id {
                        return Err(SignerError::InvalidChainId {
                            have,
                            want: self.chain_id,
                        });
                    }
                }
                recid
            }
        };
        Ok((v, r, s))
    }

    /// Copy of `tx` carrying `sig`. Typed transactions are also bound to
    /// this signer's chain id.
    pub fn with_signature(&self, tx: &Transaction, sig: &[u8]) -> Result<Transaction, SignerError> {
        let (v, r, s) = self.signature_values(tx, sig)?;
        let chain_id = match tx.tx_type() {
            TxType::Legacy => None,
            _ => Some(self.chain_id),
        };
        Ok(Transaction::new(
            tx.payload().with_signature_values(chain_id, v, r, s),
        ))
    }

    /// Signs `tx` with `key` under this signer's rules.
    pub fn sign_tx(&self, tx: &Transaction, key: &SigningKey) -> Result<Transaction, SignerError> {
        let hash = self.sig_hash(tx)?;
        let sig = sign_hash(key, &hash)?;
        trace!(%hash, tx_type = %tx.tx_type(), "signed transaction");
        self.with_signature(tx, &sig)
    }
}

/// Whether `(v, r, s)` is a well-formed secp256k1 signature. `v` is the bare
/// recovery id. With `homestead`, `s` must lie in the lower half of the order.
pub fn validate_signature_values(v: u8, r: &U256, s: &U256, homestead: bool) -> bool {
    if r.is_zero() || s.is_zero() || *r >= SECP256K1_N || *s >= SECP256K1_N {
        return false;
    }
    if homestead && *s > SECP256K1_N >> 1usize {
        return false;
    }
    v <= 1
}

/// Recovers the signer of `hash` from a signature whose `v` is `27` or `28`.
pub(crate) fn recover_plain(
    hash: &B256,
    r: U256,
    s: U256,
    v: U256,
    homestead: bool,
) -> Result<Address, SignerError> {
    let recid = u8::try_from(v)
        .ok()
        .and_then(|v| v.checked_sub(27))
        .ok_or(SignerError::InvalidSignature)?;
    if !validate_signature_values(recid, &r, &s, homestead) {
        return Err(SignerError::InvalidSignature);
    }
    let mut sig = [0u8; 65];
    sig[..32].copy_from_slice(&r.to_be_bytes::<32>());
    sig[32..64].copy_from_slice(&s.to_be_bytes::<32>());
    sig[64] = recid;
    recover_address(hash, &sig).map_err(|_| SignerError::InvalidSignature)
}

/// Signer for the rules active at block `number` and timestamp `time`.
pub fn make_signer(config: &ChainConfig, number: u64, time: u64) -> Signer {
    let generation = if config.is_prague(number, time) {
        Generation::Prague
    } else if config.is_cancun(number, time) {
        Generation::Cancun
    } else if config.is_london(number) {
        Generation::London
    } else if config.is_berlin(number) {
        Generation::Berlin
    } else if config.is_eip155(number) {
        Generation::Eip155
    } else if config.is_homestead(number) {
        Generation::Homestead
    } else {
        Generation::Frontier
    };
    debug!(chain_id = config.chain_id, number, time, ?generation, "selected signer");
    Signer::new(generation, config.chain_id)
}

/// Most permissive signer `config` will ever schedule, regardless of the
/// current block. For accepting transactions ahead of the fork that enables
/// them.
pub fn latest_signer(config: &ChainConfig) -> Signer {
    let generation = if config.prague_time.is_some() {
        Generation::Prague
    } else if config.cancun_time.is_some() {
        Generation::Cancun
    } else if config.london_block.is_some() {
        Generation::London
    } else if config.berlin_block.is_some() {
        Generation::Berlin
    } else if config.eip155_block.is_some() {
        Generation::Eip155
    } else {
        Generation::Homestead
    };
    Signer::new(generation, config.chain_id)
}

/// Newest signer for `chain_id`, or a Homestead signer when there is none.
pub fn latest_signer_for_chain_id(chain_id: Option<u64>) -> Signer {
    match chain_id {
        Some(id) => Signer::prague(id),
        None => Signer::homestead(),
    }
}
