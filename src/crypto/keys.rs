//! Key derivation helpers using HKDF-SHA256.
//!
//! From a single master key we derive:
//! - The **credential key** that encrypts every credential field.
//! - A **verifier key**, whose HMAC over a fixed context is stored in the
//!   vault so unlock can check the password without storing it.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::kdf::KEY_LEN;
use crate::errors::{Result, VaultedError};

const CREDENTIAL_INFO: &[u8] = b"vaulted-credential-key";
const VERIFIER_INFO: &[u8] = b"vaulted-verifier-key";
const VERIFIER_CONTEXT: &[u8] = b"vaulted-password-verifier-v1";

/// Length of the stored password verifier (an HMAC-SHA256 tag).
pub const VERIFIER_LEN: usize = 32;

/// Run HKDF-SHA256 expand with the given `info`.
///
/// The master key is used directly as the PRK: it already has full
/// entropy because it came out of Argon2id.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| VaultedError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A 32-byte master key that zeroes its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Derive the key used to encrypt credential fields.
    pub fn derive_credential_key(&self) -> Result<[u8; KEY_LEN]> {
        hkdf_derive(&self.bytes, CREDENTIAL_INFO)
    }

    /// Compute the verifier stored alongside the KDF parameters.
    pub fn verifier(&self) -> Result<Vec<u8>> {
        let mut verifier_key = hkdf_derive(&self.bytes, VERIFIER_INFO)?;
        let mac = Hmac::<Sha256>::new_from_slice(&verifier_key);
        verifier_key.zeroize();

        let mut mac =
            mac.map_err(|e| VaultedError::KeyDerivationFailed(format!("invalid HMAC key: {e}")))?;
        mac.update(VERIFIER_CONTEXT);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Check this key against a stored verifier in constant time.
    pub fn matches_verifier(&self, stored: &[u8]) -> Result<bool> {
        let actual = self.verifier()?;
        Ok(actual.as_slice().ct_eq(stored).into())
    }
}
