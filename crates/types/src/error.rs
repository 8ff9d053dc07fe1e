use alloy_primitives::U256;
use keel_codec::CodecError;

use crate::extras::CarrierKind;

/// Object-level decode failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("transaction type {0:#04x} not supported")]
    UnsupportedTxType(u8),
    #[error("typed transaction too short")]
    EmptyTypedTx,
    #[error("blob sidecar version {0} not supported")]
    UnsupportedSidecarVersion(U256),
}

/// Misuse of the extension registry.
///
/// These point at an integration defect and are not meant to be recovered
/// from outside of tests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtrasError {
    #[error("{kind} extras already registered as {registered}")]
    DoubleRegistration {
        kind: CarrierKind,
        registered: &'static str,
    },
    #[error("no extras registered for {0}")]
    NotRegistered(CarrierKind),
    #[error("{kind} extras are {registered}, requested {requested}")]
    TypeMismatch {
        kind: CarrierKind,
        registered: &'static str,
        requested: &'static str,
    },
    #[error("process-wide extras registry already installed")]
    AlreadyInstalled,
    #[error("process-wide extras registry not installed")]
    NotInstalled,
}
