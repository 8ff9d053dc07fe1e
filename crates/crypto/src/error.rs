use keel_types::TxType;

/// Key and signature primitive failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid secret key")]
    InvalidSecretKey,
    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),
    #[error("signature does not recover to a public key")]
    Recovery,
    #[error("signing failed")]
    Signing,
}

/// Why a transaction signature was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    #[error("invalid transaction v, r, s values")]
    InvalidSignature,
    #[error("invalid chain id for signer: have {have} want {want}")]
    InvalidChainId { have: u64, want: u64 },
    #[error("transaction type {0} not supported by this signer")]
    UnsupportedSignerForTxType(TxType),
    #[error("replay-protected transaction given to an unprotected signer")]
    UnexpectedProtection,
    #[error("wrong size for signature: got {0}, want 65")]
    InvalidSignatureLength(usize),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
