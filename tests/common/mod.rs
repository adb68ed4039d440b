//! In-process beacon network holding a known master scalar, so tests can
//! mint or withhold the threshold signature for any round.

#![allow(dead_code)]

use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};

use blstrs::Scalar;
use group::Group;
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

use tlock::beacon::{round_identity, ChainInfo};
use tlock::bls::{g1_to_bytes, hash_to_g1, SIGNATURE_DST};
use tlock::errors::Error;
use tlock::network::Network;

pub const TEST_CHAIN_HEX: &str =
    "7672797f548f3f4748ac4bf3352fc6c6b6468c9ad40ad456a397545c6e2df5bf";
pub const PERIOD_SECS: u64 = 30;

pub struct TestNetwork {
    master: Scalar,
    chain_hash: [u8; 32],
    genesis_time: u64,
    available_round: u64,
}

impl TestNetwork {
    /// A network whose latest emitted round is `available_round`.
    pub fn new(available_round: u64) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock predates the unix epoch")
            .as_secs();
        let genesis_time = now - available_round.saturating_sub(1) * PERIOD_SECS;
        TestNetwork {
            master: Scalar::from(0x746c_6f63_6b21u64),
            chain_hash: chain_hash(),
            genesis_time,
            available_round,
        }
    }

    pub fn with_chain_hash(mut self, chain_hash: [u8; 32]) -> Self {
        self.chain_hash = chain_hash;
        self
    }

    /// Mint the signature for `round`, availability aside.
    pub fn signature_for(&self, round: u64) -> Vec<u8> {
        let q = hash_to_g1(&round_identity(round), SIGNATURE_DST);
        g1_to_bytes(&(q * self.master)).to_vec()
    }
}

impl Network for TestNetwork {
    fn chain_hash(&self) -> [u8; 32] {
        self.chain_hash
    }

    fn chain_info(&self) -> Result<ChainInfo, Error> {
        Ok(ChainInfo {
            public_key: blstrs::G2Projective::generator() * self.master,
            period_secs: PERIOD_SECS,
            genesis_time: self.genesis_time,
            chain_hash: self.chain_hash,
            scheme_id: "pedersen-bls-unchained".into(),
        })
    }

    fn signature(&self, round: u64) -> Result<Vec<u8>, Error> {
        if round > self.available_round {
            return Err(Error::TooEarly);
        }
        Ok(self.signature_for(round))
    }
}

/// Serves signatures for the wrong round, as a misbehaving beacon would.
pub struct WrongRoundNetwork(pub TestNetwork);

impl Network for WrongRoundNetwork {
    fn chain_hash(&self) -> [u8; 32] {
        self.0.chain_hash()
    }

    fn chain_info(&self) -> Result<ChainInfo, Error> {
        self.0.chain_info()
    }

    fn signature(&self, round: u64) -> Result<Vec<u8>, Error> {
        Ok(self.0.signature_for(round + 1))
    }
}

/// Panics if any signature is fetched. For asserting that a check happens
/// before network access.
pub struct NoFetchNetwork(pub TestNetwork);

impl Network for NoFetchNetwork {
    fn chain_hash(&self) -> [u8; 32] {
        self.0.chain_hash()
    }

    fn chain_info(&self) -> Result<ChainInfo, Error> {
        self.0.chain_info()
    }

    fn signature(&self, _round: u64) -> Result<Vec<u8>, Error> {
        panic!("signature fetched before local checks passed");
    }
}

pub fn chain_hash() -> [u8; 32] {
    let raw = hex::decode(TEST_CHAIN_HEX).expect("test chain hex");
    let mut out = [0u8; 32];
    out.copy_from_slice(&raw);
    out
}

/// Encrypt `payload` toward `round` with a seeded RNG.
pub fn encrypt_to_vec(network: &impl Network, round: u64, payload: &[u8]) -> Vec<u8> {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let mut container = Vec::new();
    tlock::encrypt_with_rng(
        &mut container,
        &mut Cursor::new(payload.to_vec()),
        network,
        round,
        &mut rng,
    )
    .expect("encrypt");
    container
}

pub fn decrypt_to_vec(network: &impl Network, container: &[u8]) -> Result<Vec<u8>, Error> {
    let mut plain = Vec::new();
    tlock::decrypt(&mut plain, &mut Cursor::new(container.to_vec()), network)?;
    Ok(plain)
}

/// Deterministic pseudo-random payload.
pub fn random_payload(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut payload = vec![0u8; len];
    rng.fill_bytes(&mut payload);
    payload
}

/// Split a binary container into its header text (through the MAC line's
/// newline) and the payload bytes that follow.
pub fn split_container(container: &[u8]) -> (String, Vec<u8>) {
    let mark = container
        .windows(5)
        .position(|w| w == b"\n--- ")
        .expect("container has a MAC line");
    let newline = container[mark + 1..]
        .iter()
        .position(|b| *b == b'\n')
        .expect("MAC line is newline-terminated");
    let header_end = mark + 1 + newline + 1;
    (
        String::from_utf8(container[..header_end].to_vec()).expect("header is ASCII"),
        container[header_end..].to_vec(),
    )
}
