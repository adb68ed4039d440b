//! The network port: the capability interface the core uses to reach a
//! beacon chain. The HTTP client is one implementation; tests provide an
//! in-process one holding a known master scalar.

use std::time::SystemTime;

use crate::beacon::ChainInfo;
use crate::errors::Error;

/// Access to one beacon chain.
///
/// Implementations must be safe to share across concurrent encrypt and
/// decrypt calls; all methods take `&self`.
pub trait Network: Sync {
    /// The 32-byte chain identifier this network was configured with.
    fn chain_hash(&self) -> [u8; 32];

    /// Fetch chain metadata. May block on I/O.
    fn chain_info(&self) -> Result<ChainInfo, Error>;

    /// Fetch the threshold signature for `round` as a compressed G1 point.
    ///
    /// Returns [`Error::TooEarly`] while the round has not been emitted.
    fn signature(&self, round: u64) -> Result<Vec<u8>, Error>;

    /// Latest round emitted at time `t`.
    fn round_at(&self, t: SystemTime) -> Result<u64, Error> {
        Ok(self.chain_info()?.round_at(t))
    }
}
