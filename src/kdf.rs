//! HKDF-SHA256 derivations for the payload and header keys.

use hkdf::Hkdf;
use sha2::Sha256;

/// Derive a 32-byte key from `ikm` under `(salt, info)`.
pub fn derive_key(ikm: &[u8], salt: &[u8], info: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = [0u8; 32];
    hk.expand(info, &mut okm)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    okm
}
