//! drand HTTP implementation of the network port.
//!
//! Speaks the drand REST protocol: `GET {host}/{chain}/info` for chain
//! metadata and `GET {host}/{chain}/public/{round}` for round signatures.
//! Construction validates the chain: the scheme must be unchained and the
//! served chain hash must match the configured one.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::beacon::ChainInfo;
use crate::bls::g2_from_bytes;
use crate::errors::Error;
use crate::network::Network;

/// Deadline for every call to the beacon endpoint.
const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct InfoResponse {
    public_key: String,
    period: u64,
    genesis_time: u64,
    hash: String,
    #[serde(rename = "schemeID")]
    scheme_id: String,
}

#[derive(Debug, Deserialize)]
struct RoundResponse {
    round: u64,
    signature: String,
}

/// A beacon chain reached over HTTP.
///
/// The underlying agent pools connections and is safe to share, so one
/// `HttpNetwork` may serve concurrent encrypt and decrypt calls.
pub struct HttpNetwork {
    base: String,
    chain_hash: [u8; 32],
    agent: ureq::Agent,
}

impl HttpNetwork {
    /// Build a client for `chain_hash_hex` served by `host`, and validate
    /// the chain it serves. Unknown or chained schemes are rejected here,
    /// not at first use.
    pub fn new(host: &str, chain_hash_hex: &str) -> Result<Self, Error> {
        let chain_hash = parse_chain_hash(chain_hash_hex)?;
        let agent = ureq::AgentBuilder::new().timeout(TIMEOUT).build();
        let network = HttpNetwork {
            base: format!("{}/{}", host.trim_end_matches('/'), chain_hash_hex),
            chain_hash,
            agent,
        };

        let info = network.chain_info()?;
        info.validate()?;
        Ok(network)
    }
}

impl Network for HttpNetwork {
    fn chain_hash(&self) -> [u8; 32] {
        self.chain_hash
    }

    fn chain_info(&self) -> Result<ChainInfo, Error> {
        let url = format!("{}/info", self.base);
        debug!(%url, "fetching chain info");
        let raw: InfoResponse = self
            .agent
            .get(&url)
            .call()
            .map_err(transport_error)?
            .into_json()
            .map_err(|err| Error::Network(format!("decoding chain info: {err}")))?;

        let pk_bytes = hex::decode(&raw.public_key)
            .map_err(|_| Error::Network("chain public key is not valid hex".into()))?;
        let public_key = g2_from_bytes(&pk_bytes)
            .ok_or_else(|| Error::Network("chain public key is not a valid G2 point".into()))?;

        let served = parse_chain_hash(&raw.hash)
            .map_err(|_| Error::Network("chain info carries a malformed hash".into()))?;
        if served != self.chain_hash {
            return Err(Error::ChainMismatch);
        }

        Ok(ChainInfo {
            public_key,
            period_secs: raw.period,
            genesis_time: raw.genesis_time,
            chain_hash: served,
            scheme_id: raw.scheme_id,
        })
    }

    fn signature(&self, round: u64) -> Result<Vec<u8>, Error> {
        let url = format!("{}/public/{}", self.base, round);
        debug!(%url, "fetching round signature");
        let raw: RoundResponse = match self.agent.get(&url).call() {
            Ok(response) => response
                .into_json()
                .map_err(|err| Error::Network(format!("decoding round: {err}")))?,
            // The beacon returns 404 for rounds it has not emitted yet.
            Err(ureq::Error::Status(404, _)) => return Err(Error::TooEarly),
            Err(err) => return Err(transport_error(err)),
        };

        if raw.round != round {
            return Err(Error::Network(format!(
                "asked for round {round}, beacon answered for round {}",
                raw.round
            )));
        }
        hex::decode(&raw.signature)
            .map_err(|_| Error::Network("round signature is not valid hex".into()))
    }
}

fn transport_error(err: ureq::Error) -> Error {
    match err {
        ureq::Error::Status(code, _) => Error::Network(format!("beacon returned status {code}")),
        ureq::Error::Transport(transport) => Error::Network(transport.to_string()),
    }
}

/// Chain hashes are configured as 64 lowercase hex characters.
pub fn parse_chain_hash(hex_str: &str) -> Result<[u8; 32], Error> {
    if hex_str.len() != 64
        || !hex_str
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return Err(Error::Config(
            "chain hash must be 64 lowercase hex characters".into(),
        ));
    }
    let raw = hex::decode(hex_str).map_err(|_| Error::Config("bad chain hash hex".into()))?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&raw);
    Ok(out)
}
