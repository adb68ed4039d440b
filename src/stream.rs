//! Authenticated payload cipher: the age v1 STREAM construction.
//!
//! The 16-byte file key is expanded with HKDF into a body key bound to a
//! per-container nonce, and the payload is sealed in 64 KiB chunks with
//! ChaCha20-Poly1305. The 12-byte chunk nonce is an 11-byte big-endian
//! counter followed by a last-chunk flag byte, so chunks cannot be
//! reordered, dropped, or truncated without failing authentication.

use std::io::{Read, Write};

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use zeroize::Zeroizing;

use crate::errors::Error;
use crate::ibe::FILE_KEY_LEN;
use crate::kdf::derive_key;

/// Plaintext bytes per chunk.
pub const CHUNK_LEN: usize = 64 * 1024;
/// Poly1305 tag appended to each chunk.
pub const TAG_LEN: usize = 16;
/// Per-container payload nonce written between header and body.
pub const NONCE_LEN: usize = 16;

const INFO_PAYLOAD: &[u8] = b"payload";
const LAST_CHUNK_FLAG: u8 = 0x01;

fn body_cipher(file_key: &[u8; FILE_KEY_LEN], nonce: &[u8; NONCE_LEN]) -> ChaCha20Poly1305 {
    let key = Zeroizing::new(derive_key(file_key, nonce, INFO_PAYLOAD));
    ChaCha20Poly1305::new(Key::from_slice(key.as_ref()))
}

fn chunk_nonce(counter: u64, last: bool) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[3..11].copy_from_slice(&counter.to_be_bytes());
    if last {
        nonce[11] = LAST_CHUNK_FLAG;
    }
    nonce
}

/// Fill `buf` from `src`, stopping only at EOF or a full buffer.
fn read_full<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<usize, Error> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = src.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Seal `src` into `dst` under `file_key`. An empty source produces a single
/// empty final chunk, so every payload carries at least one tag.
pub fn encrypt<R: Read, W: Write>(
    file_key: &[u8; FILE_KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    src: &mut R,
    dst: &mut W,
) -> Result<(), Error> {
    let cipher = body_cipher(file_key, nonce);

    let mut current = vec![0u8; CHUNK_LEN];
    let mut next = vec![0u8; CHUNK_LEN];
    let mut current_len = read_full(src, &mut current)?;
    let mut counter: u64 = 0;

    loop {
        // One chunk of lookahead decides whether the current one is last.
        let next_len = if current_len == CHUNK_LEN {
            read_full(src, &mut next)?
        } else {
            0
        };
        let last = current_len < CHUNK_LEN || next_len == 0;

        let sealed = cipher
            .encrypt(
                Nonce::from_slice(&chunk_nonce(counter, last)),
                &current[..current_len],
            )
            .map_err(|_| Error::Integrity)?;
        dst.write_all(&sealed)?;

        if last {
            return Ok(());
        }
        std::mem::swap(&mut current, &mut next);
        current_len = next_len;
        counter += 1;
    }
}

/// Open the sealed body from `src` into `dst`, releasing each chunk only
/// after its tag verifies.
pub fn decrypt<R: Read, W: Write>(
    file_key: &[u8; FILE_KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    src: &mut R,
    dst: &mut W,
) -> Result<(), Error> {
    let cipher = body_cipher(file_key, nonce);

    let sealed_len = CHUNK_LEN + TAG_LEN;
    let mut current = vec![0u8; sealed_len];
    let mut next = vec![0u8; sealed_len];
    let mut current_len = read_full(src, &mut current)?;
    let mut counter: u64 = 0;

    loop {
        let next_len = if current_len == sealed_len {
            read_full(src, &mut next)?
        } else {
            0
        };
        let last = current_len < sealed_len || next_len == 0;

        if current_len < TAG_LEN {
            return Err(Error::InvalidContainer("truncated payload chunk".into()));
        }

        let opened = cipher
            .decrypt(
                Nonce::from_slice(&chunk_nonce(counter, last)),
                &current[..current_len],
            )
            .map_err(|_| Error::Integrity)?;

        // An empty chunk is only valid as the sole chunk of an empty payload.
        if last && opened.is_empty() && counter != 0 {
            return Err(Error::InvalidContainer("empty final chunk".into()));
        }
        dst.write_all(&opened)?;

        if last {
            return Ok(());
        }
        std::mem::swap(&mut current, &mut next);
        current_len = next_len;
        counter += 1;
    }
}
