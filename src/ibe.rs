//! Boneh-Franklin identity-based encryption over BLS12-381, with the role
//! swap used by drand timelock: the master public key lives in G2 and
//! identities hash to G1, so a beacon signature is exactly the private key
//! for its round.
//!
//! The scheme carries the Fujisaki-Okamoto transform: the encryption scalar
//! is derived from the random mask and the plaintext, and decryption
//! recomputes the commitment to detect any tampering. The plaintext is the
//! fixed-size file key of the hybrid layer.

use ff::Field;
use group::Group;
use rand_core::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::bls::{g2_to_bytes, gt_to_bytes, hash_to_g1, hash_to_scalar, pairing, Fr, Target, G1, G2};
use crate::errors::Error;

/// Size of the wrapped file key, and of the `V` and `W` ciphertext fields.
pub const FILE_KEY_LEN: usize = 16;

const TAG_H2: &[u8] = b"IBE-H2";
const TAG_H3: &[u8] = b"IBE-H3";
const TAG_H4: &[u8] = b"IBE-H4";

/// IBE ciphertext of one file key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    /// Ephemeral commitment `r * G2`.
    pub u: G2,
    /// Mask of the random sigma value.
    pub v: [u8; FILE_KEY_LEN],
    /// Mask of the file key.
    pub w: [u8; FILE_KEY_LEN],
}

/// Encrypt `file_key` to `identity` under the beacon public key `pk`.
pub fn encrypt(
    pk: &G2,
    identity: &[u8],
    file_key: &[u8; FILE_KEY_LEN],
    rng: &mut dyn RngCore,
) -> Ciphertext {
    let mut sigma = [0u8; FILE_KEY_LEN];
    rng.fill_bytes(&mut sigma);

    // r = H3(sigma || file_key), so the commitment is recomputable on decrypt.
    let mut r = hash_to_scalar(TAG_H3, &[&sigma, file_key]);
    let u = G2::generator() * r;

    let q = hash_to_g1(identity, crate::bls::SIGNATURE_DST);
    let g_id = pairing(&q, pk) * r;

    let v = xor_block(&sigma, &mask_target(&g_id));
    let w = xor_block(file_key, &mask_sigma(&sigma));

    sigma.zeroize();
    wipe_scalar(&mut r);
    Ciphertext { u, v, w }
}

/// Recover the file key from `ct` using the beacon signature for the round
/// the ciphertext was produced for.
///
/// Fails with [`Error::Integrity`] when the ciphertext was tampered with or
/// the signature belongs to a different round.
pub fn decrypt(signature: &G1, ct: &Ciphertext) -> Result<[u8; FILE_KEY_LEN], Error> {
    let g = pairing(signature, &ct.u);

    let mut sigma = xor_block(&ct.v, &mask_target(&g));
    let mut file_key = xor_block(&ct.w, &mask_sigma(&sigma));

    let mut r = hash_to_scalar(TAG_H3, &[&sigma, &file_key]);
    sigma.zeroize();

    let commitment_matches = G2::generator() * r == ct.u;
    wipe_scalar(&mut r);

    if !commitment_matches {
        file_key.zeroize();
        return Err(Error::Integrity);
    }
    Ok(file_key)
}

/// `Scalar` carries no `Zeroize` impl; overwrite it in place.
fn wipe_scalar(r: &mut Fr) {
    *r = Fr::ZERO;
}

/// H2: GT element to a sigma-sized mask.
fn mask_target(t: &Target) -> [u8; FILE_KEY_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(TAG_H2);
    hasher.update(gt_to_bytes(t));
    truncate(hasher.finalize().into())
}

/// H4: sigma to a file-key-sized mask.
fn mask_sigma(sigma: &[u8; FILE_KEY_LEN]) -> [u8; FILE_KEY_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(TAG_H4);
    hasher.update(sigma);
    truncate(hasher.finalize().into())
}

fn truncate(digest: [u8; 32]) -> [u8; FILE_KEY_LEN] {
    let mut out = [0u8; FILE_KEY_LEN];
    out.copy_from_slice(&digest[..FILE_KEY_LEN]);
    out
}

fn xor_block(a: &[u8; FILE_KEY_LEN], b: &[u8; FILE_KEY_LEN]) -> [u8; FILE_KEY_LEN] {
    let mut out = [0u8; FILE_KEY_LEN];
    for i in 0..FILE_KEY_LEN {
        out[i] = a[i] ^ b[i];
    }
    out
}

/// Serialize `(U, V, W)` for the recipient stanza.
pub fn ciphertext_to_bytes(ct: &Ciphertext) -> Vec<u8> {
    let mut out = Vec::with_capacity(96 + 2 * FILE_KEY_LEN);
    out.extend_from_slice(&g2_to_bytes(&ct.u));
    out.extend_from_slice(&ct.v);
    out.extend_from_slice(&ct.w);
    out
}

/// Parse `(U, V, W)` from a recipient stanza body, rejecting off-curve or
/// off-subgroup commitments.
pub fn ciphertext_from_bytes(bytes: &[u8]) -> Option<Ciphertext> {
    if bytes.len() != 96 + 2 * FILE_KEY_LEN {
        return None;
    }
    let u = crate::bls::g2_from_bytes(&bytes[..96])?;
    let mut v = [0u8; FILE_KEY_LEN];
    let mut w = [0u8; FILE_KEY_LEN];
    v.copy_from_slice(&bytes[96..96 + FILE_KEY_LEN]);
    w.copy_from_slice(&bytes[96 + FILE_KEY_LEN..]);
    Some(Ciphertext { u, v, w })
}
