//! Core data objects: transactions, headers, bodies and accounts, with their
//! canonical encodings and the extension payloads they can carry.

mod account;
mod body;
pub mod config;
pub mod derive;
mod error;
pub mod extras;
mod header;
mod tail;
pub mod transaction;

pub use alloy_primitives::{Address, Bytes, B256, B64, U256};
pub use keel_codec;

pub use account::{StateAccount, EMPTY_CODE_HASH, EMPTY_ROOT_HASH};
pub use body::{Block, Body, Withdrawal};
pub use config::ChainConfig;
pub use derive::{derive_sha, DerivableList, ListHasher};
pub use error::{DecodeError, ExtrasError};
pub use extras::{
    Carrier, CarrierKind, ExtraPayload, Payload, Payloads, Registry, RegistryBuilder,
};
pub use header::{Bloom, Header};
pub use transaction::{SignerId, Transaction, TxPayload, TxType};
