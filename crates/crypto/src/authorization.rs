use k256::ecdsa::SigningKey;
use keel_types::transaction::Authorization;
use keel_types::{Address, U256};

use crate::signer::recover_plain;
use crate::{sign_hash, CryptoError, SignerError};

/// Signs `auth` with `key`, replacing any signature it carried.
pub fn sign_authorization(
    key: &SigningKey,
    auth: Authorization,
) -> Result<Authorization, CryptoError> {
    let sig = sign_hash(key, &auth.sig_hash())?;
    Ok(Authorization {
        y_parity: sig[64],
        r: U256::from_be_slice(&sig[..32]),
        s: U256::from_be_slice(&sig[32..64]),
        ..auth
    })
}

/// Account that signed `auth`. High-s signatures are rejected.
pub fn authority(auth: &Authorization) -> Result<Address, SignerError> {
    let v = U256::from(auth.y_parity) + U256::from(27u64);
    recover_plain(&auth.sig_hash(), auth.r, auth.s, v, true)
}
