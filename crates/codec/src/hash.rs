use alloy_primitives::B256;
use sha3::{Digest, Keccak256};

/// Content hash used for every identifier in this workspace.
pub fn keccak256(data: impl AsRef<[u8]>) -> B256 {
    B256::from_slice(&Keccak256::digest(data.as_ref()))
}

/// keccak256 over `prefix || data`, the form used by typed payloads.
pub fn keccak256_prefixed(prefix: u8, data: &[u8]) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update([prefix]);
    hasher.update(data);
    B256::from_slice(&hasher.finalize())
}
