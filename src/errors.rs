//! Crate-wide error type.

use std::fmt;
use std::io;

/// Failure kinds surfaced by the core.
///
/// Every kind is terminal for the call except [`Error::TooEarly`], which
/// callers may legitimately retry once the target round has been emitted.
#[derive(Debug)]
pub enum Error {
    /// Bad caller-supplied configuration: malformed chain hash, past round.
    Config(String),
    /// Transport failure reaching the beacon endpoint.
    Network(String),
    /// The chain's scheme is not an unchained beacon scheme.
    NotUnchained,
    /// Container chain hash does not match the configured network.
    ChainMismatch,
    /// The beacon for the target round has not been published yet.
    TooEarly,
    /// IBE or AEAD authentication failure, including a signature for the
    /// wrong round.
    Integrity,
    /// Malformed container: bad header, wrong recipient, bad base64,
    /// truncated body.
    InvalidContainer(String),
    /// Source or destination stream failure.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration: {msg}"),
            Error::Network(msg) => write!(f, "network: {msg}"),
            Error::NotUnchained => {
                write!(f, "chain hash does not belong to an unchained network")
            }
            Error::ChainMismatch => {
                write!(f, "container chain hash does not match the configured chain")
            }
            Error::TooEarly => write!(f, "the target round is not yet available"),
            Error::Integrity => write!(f, "authentication failed"),
            Error::InvalidContainer(msg) => write!(f, "invalid container: {msg}"),
            Error::Io(err) => write!(f, "io: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
