//! secp256k1 keys, recoverable signatures and transaction signers.

mod authorization;
mod error;
mod signer;

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use keel_codec::keccak256;
use keel_types::{Address, B256, U256};
use rand_core::OsRng;

pub use authorization::{authority, sign_authorization};
pub use error::{CryptoError, SignerError};
pub use signer::{
    latest_signer, latest_signer_for_chain_id, make_signer, validate_signature_values,
    Generation, Signer,
};

pub use k256::ecdsa::{SigningKey as SecretKey, VerifyingKey as PublicKey};

/// `r || s || recovery id`.
pub type SignatureBytes = [u8; 65];

/// Order of the secp256k1 group.
pub const SECP256K1_N: U256 = U256::from_limbs([
    0xbfd2_5e8c_d036_4141,
    0xbaae_dce6_af48_a03b,
    0xffff_ffff_ffff_fffe,
    0xffff_ffff_ffff_ffff,
]);

/// Derive the 20-byte address from a public key:
/// address = keccak256(x || y)[12..]
pub fn address_from_pubkey(pk: &VerifyingKey) -> Address {
    let point = pk.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

pub fn address_of(sk: &SigningKey) -> Address {
    address_from_pubkey(sk.verifying_key())
}

/// Parse a secret key from its 32-byte scalar.
pub fn secret_key_from_bytes(bytes: &[u8; 32]) -> Result<SigningKey, CryptoError> {
    SigningKey::from_slice(bytes).map_err(|_| CryptoError::InvalidSecretKey)
}

/// Fresh key from the operating system's RNG.
pub fn generate_secret_key() -> SigningKey {
    SigningKey::random(&mut OsRng)
}

/// Deterministic (RFC 6979) low-s signature over a 32-byte digest.
pub fn sign_hash(sk: &SigningKey, hash: &B256) -> Result<SignatureBytes, CryptoError> {
    let (sig, recid) = sk
        .sign_prehash_recoverable(hash.as_slice())
        .map_err(|_| CryptoError::Signing)?;
    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&sig.to_bytes());
    out[64] = recid.to_byte();
    Ok(out)
}

/// Public key that produced `sig` over `hash`. High-s signatures are
/// accepted; callers decide whether to allow them.
pub fn recover_pubkey(hash: &B256, sig: &SignatureBytes) -> Result<VerifyingKey, CryptoError> {
    let signature = Signature::from_slice(&sig[..64]).map_err(|_| CryptoError::Recovery)?;
    let recid = RecoveryId::from_byte(sig[64]).ok_or(CryptoError::InvalidRecoveryId(sig[64]))?;
    // (r, n - s) with the opposite parity recovers the same key
    let (signature, recid) = match signature.normalize_s() {
        Some(low) => (
            low,
            RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced()),
        ),
        None => (signature, recid),
    };
    VerifyingKey::recover_from_prehash(hash.as_slice(), &signature, recid)
        .map_err(|_| CryptoError::Recovery)
}

pub fn recover_address(hash: &B256, sig: &SignatureBytes) -> Result<Address, CryptoError> {
    recover_pubkey(hash, sig).map(|pk| address_from_pubkey(&pk))
}

/// True if `sig` over `hash` recovers to `pk`.
pub fn verify_hash(pk: &VerifyingKey, hash: &B256, sig: &SignatureBytes) -> bool {
    recover_pubkey(hash, sig).is_ok_and(|recovered| recovered == *pk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn address_of_key_one() {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        let sk = secret_key_from_bytes(&bytes).unwrap();
        assert_eq!(
            address_of(&sk),
            Address::new(hex!("7e5f4552091a69125d5dfcb7b8c2659029395bdf"))
        );
    }

    #[test]
    fn zero_key_is_rejected() {
        assert_eq!(
            secret_key_from_bytes(&[0u8; 32]).err(),
            Some(CryptoError::InvalidSecretKey)
        );
    }

    #[test]
    fn sign_and_recover_roundtrip() {
        let sk = secret_key_from_bytes(&[7u8; 32]).unwrap();
        let hash = keccak256(b"hello world");
        let sig = sign_hash(&sk, &hash).unwrap();

        assert!(sig[64] <= 1);
        assert_eq!(recover_address(&hash, &sig), Ok(address_of(&sk)));
        assert!(verify_hash(sk.verifying_key(), &hash, &sig));

        // and a different message recovers someone else
        let other = keccak256(b"hello world!");
        assert_ne!(recover_address(&other, &sig), Ok(address_of(&sk)));
    }

    #[test]
    fn signing_is_deterministic_and_low_s() {
        let sk = secret_key_from_bytes(&[9u8; 32]).unwrap();
        let hash = keccak256(b"payload");
        let a = sign_hash(&sk, &hash).unwrap();
        let b = sign_hash(&sk, &hash).unwrap();
        assert_eq!(a, b);

        let s = U256::from_be_slice(&a[32..64]);
        assert!(s <= SECP256K1_N >> 1usize);
    }

    #[test]
    fn high_s_recovers_same_key() {
        let sk = secret_key_from_bytes(&[3u8; 32]).unwrap();
        let hash = keccak256(b"malleable");
        let sig = sign_hash(&sk, &hash).unwrap();

        let s = U256::from_be_slice(&sig[32..64]);
        let mut high = sig;
        high[32..64].copy_from_slice(&(SECP256K1_N - s).to_be_bytes::<32>());
        high[64] ^= 1;
        assert_eq!(recover_address(&hash, &high), Ok(address_of(&sk)));
    }

    #[test]
    fn bad_recovery_id_is_rejected() {
        let sk = secret_key_from_bytes(&[5u8; 32]).unwrap();
        let hash = keccak256(b"x");
        let mut sig = sign_hash(&sk, &hash).unwrap();
        sig[64] = 4;
        assert_eq!(
            recover_address(&hash, &sig),
            Err(CryptoError::InvalidRecoveryId(4))
        );
    }

    #[test]
    fn generated_keys_differ() {
        let a = generate_secret_key();
        let b = generate_secret_key();
        assert_ne!(address_of(&a), address_of(&b));
    }
}
