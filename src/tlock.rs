//! Top-level timelock encrypt and decrypt.

use std::io::{BufReader, Read, Write};
use std::time::SystemTime;

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use tracing::debug;
use zeroize::Zeroizing;

use crate::beacon::round_identity;
use crate::bls::g1_from_bytes;
use crate::errors::Error;
use crate::header::Header;
use crate::ibe::{self, FILE_KEY_LEN};
use crate::network::Network;
use crate::stream;

/// Encrypt `src` into `dst` so it can be decrypted once the beacon behind
/// `network` emits its signature for `round`.
///
/// Rounds already emitted are refused: their signatures are public, so the
/// ciphertext would carry no timelock. Nothing is written to `dst` until the
/// round has been validated.
pub fn encrypt<R, W, N>(dst: &mut W, src: &mut R, network: &N, round: u64) -> Result<(), Error>
where
    R: Read,
    W: Write,
    N: Network + ?Sized,
{
    let mut rng = ChaCha20Rng::from_entropy();
    encrypt_with_rng(dst, src, network, round, &mut rng)
}

/// [`encrypt`] with a caller-supplied randomness source.
pub fn encrypt_with_rng<R, W, N>(
    dst: &mut W,
    src: &mut R,
    network: &N,
    round: u64,
    rng: &mut dyn RngCore,
) -> Result<(), Error>
where
    R: Read,
    W: Write,
    N: Network + ?Sized,
{
    let info = network.chain_info()?;
    info.validate()?;

    let current = info.round_at(SystemTime::now());
    if round < current {
        return Err(Error::Config(format!(
            "round {round} is in the past (current round is {current})"
        )));
    }
    debug!(round, current, "wrapping file key");

    let mut file_key = Zeroizing::new([0u8; FILE_KEY_LEN]);
    rng.fill_bytes(file_key.as_mut());

    let ciphertext = ibe::encrypt(&info.public_key, &round_identity(round), &file_key, rng);
    let header = Header {
        round,
        chain_hash: network.chain_hash(),
        ciphertext,
    };

    // The header is flushed in full before any body bytes, so a reader can
    // reject an unsupported recipient without buffering the payload.
    header.write(&file_key, dst)?;

    let mut nonce = [0u8; stream::NONCE_LEN];
    rng.fill_bytes(&mut nonce);
    dst.write_all(&nonce)?;
    stream::encrypt(&file_key, &nonce, src, dst)?;
    dst.flush()?;
    Ok(())
}

/// Decrypt a container produced by [`encrypt`].
///
/// The embedded chain hash is checked against `network` before any signature
/// is fetched; a container for a round the beacon has not reached yet fails
/// with [`Error::TooEarly`].
pub fn decrypt<R, W, N>(dst: &mut W, src: &mut R, network: &N) -> Result<(), Error>
where
    R: Read,
    W: Write,
    N: Network + ?Sized,
{
    let mut src = BufReader::new(src);
    let (header, mac) = Header::parse(&mut src)?;

    if header.chain_hash != network.chain_hash() {
        return Err(Error::ChainMismatch);
    }
    debug!(round = header.round, "fetching round signature");

    let signature_bytes = network.signature(header.round)?;
    let signature = g1_from_bytes(&signature_bytes)
        .ok_or_else(|| Error::Network("beacon signature is not a valid G1 point".into()))?;

    let file_key = Zeroizing::new(ibe::decrypt(&signature, &header.ciphertext)?);
    header.verify_mac(&file_key, &mac)?;

    let mut nonce = [0u8; stream::NONCE_LEN];
    src.read_exact(&mut nonce)
        .map_err(|_| Error::InvalidContainer("truncated payload nonce".into()))?;
    stream::decrypt(&file_key, &nonce, &mut src, dst)?;
    dst.flush()?;
    Ok(())
}
