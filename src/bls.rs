//! BLS12-381 helpers (blstrs): hash-to-curve, pairing, serialization.

use blstrs::{Compress, G1Affine, G1Projective, G2Affine, G2Projective, Gt, Scalar};
use ff::Field;
use group::Curve;
use sha2::{Digest, Sha256};

pub type Fr = Scalar;
pub type G1 = G1Projective;
pub type G2 = G2Projective;
pub type Target = Gt;

/// Domain separation tag of the drand unchained G1 signature suite. Round
/// identities are hashed into G1 under this tag, and beacon signatures are
/// produced over the same hash.
pub const SIGNATURE_DST: &[u8] = b"BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_NUL_";

pub fn hash_to_g1(msg: &[u8], dst: &[u8]) -> G1 {
    G1Projective::hash_to_curve(msg, dst, &[])
}

pub fn pairing(g1: &G1, g2: &G2) -> Target {
    blstrs::pairing(&g1.to_affine(), &g2.to_affine())
}

/// Map arbitrary input to a uniform nonzero scalar.
///
/// Counter-based rejection sampling over SHA-256 output; deterministic for a
/// given `(dst, inputs)` pair.
pub fn hash_to_scalar(dst: &[u8], inputs: &[&[u8]]) -> Fr {
    let mut counter: u16 = 1;
    loop {
        let mut hasher = Sha256::new();
        hasher.update(dst);
        hasher.update(counter.to_be_bytes());
        for input in inputs {
            hasher.update(input);
        }
        let digest: [u8; 32] = hasher.finalize().into();
        if let Some(scalar) = Option::<Fr>::from(Fr::from_bytes_be(&digest)) {
            if !bool::from(scalar.is_zero()) {
                return scalar;
            }
        }
        counter = counter.wrapping_add(1);
    }
}

pub fn g1_to_bytes(p: &G1) -> [u8; 48] {
    // Compressed encoding for G1.
    p.to_affine().to_compressed()
}

pub fn g1_from_bytes(bytes: &[u8]) -> Option<G1> {
    // Decode compressed G1, rejecting invalid or off-subgroup points.
    if bytes.len() != 48 {
        return None;
    }
    let mut raw = [0u8; 48];
    raw.copy_from_slice(bytes);
    Option::<G1Affine>::from(G1Affine::from_compressed(&raw)).map(Into::into)
}

pub fn g2_to_bytes(p: &G2) -> [u8; 96] {
    // Compressed encoding for G2.
    p.to_affine().to_compressed()
}

pub fn g2_from_bytes(bytes: &[u8]) -> Option<G2> {
    // Decode compressed G2, rejecting invalid or off-subgroup points.
    if bytes.len() != 96 {
        return None;
    }
    let mut raw = [0u8; 96];
    raw.copy_from_slice(bytes);
    Option::<G2Affine>::from(G2Affine::from_compressed(&raw)).map(Into::into)
}

pub fn gt_to_bytes(t: &Target) -> Vec<u8> {
    // Compressed GT encoding for KDF inputs.
    let mut bytes = Vec::with_capacity(288);
    t.write_compressed(&mut bytes)
        .expect("in-memory serialization should not fail");
    bytes
}
