//! Beacon chain metadata and the round/identity mapping.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

use crate::bls::G2;
use crate::errors::Error;

/// Scheme identifiers whose round message is `H(round)` alone. Only these
/// work for timelock: the encryptor must be able to compute the identity of
/// a future round without knowing any earlier signature.
const UNCHAINED_SCHEME_IDS: [&str; 3] = [
    "pedersen-bls-unchained",
    "bls-unchained-on-g1",
    "bls-unchained-g1-rfc9380",
];

/// Chain metadata as served by a beacon network.
#[derive(Clone, Debug)]
pub struct ChainInfo {
    /// Beacon public key `P = s * G2`.
    pub public_key: G2,
    /// Seconds between consecutive rounds.
    pub period_secs: u64,
    /// Unix time of round 1.
    pub genesis_time: u64,
    /// 32-byte chain identifier.
    pub chain_hash: [u8; 32],
    /// Scheme identifier, e.g. `pedersen-bls-unchained`.
    pub scheme_id: String,
}

impl ChainInfo {
    /// Reject chains this core cannot timelock against.
    pub fn validate(&self) -> Result<(), Error> {
        if !UNCHAINED_SCHEME_IDS.iter().any(|id| *id == self.scheme_id) {
            return Err(Error::NotUnchained);
        }
        if self.period_secs == 0 {
            return Err(Error::Network("chain reports a zero period".into()));
        }
        Ok(())
    }

    /// Latest round emitted at wall-clock time `t`. Times before genesis map
    /// to round 1, the first round ever emitted.
    pub fn round_at(&self, t: SystemTime) -> u64 {
        let secs = t
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        let elapsed = secs.saturating_sub(self.genesis_time);
        elapsed / self.period_secs + 1
    }
}

/// Identity bytes a round is encrypted to: `SHA-256(BE8(round))`.
pub fn round_identity(round: u64) -> [u8; 32] {
    Sha256::digest(round.to_be_bytes()).into()
}
