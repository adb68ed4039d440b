//! The age v1 container header with the `tlock` recipient stanza.
//!
//! ```text
//! age-encryption.org/v1
//! -> tlock <round-decimal> <chain-hash-hex-lowercase-64>
//! <base64-no-pad of U || V || W, wrapped at 64 columns>
//! --- <base64-no-pad HMAC-SHA256>
//! ```
//!
//! The round and chain hash are readable from the header alone, before any
//! network access or MAC verification, so a caller can decide whether it
//! trusts the chain. The MAC key is derived from the file key, so header
//! integrity is checked right after the IBE unwrap succeeds.

use std::io::{BufRead, Read, Write};

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::Error;
use crate::ibe::{self, FILE_KEY_LEN};
use crate::kdf::derive_key;

pub const VERSION_LINE: &str = "age-encryption.org/v1";

const STANZA_TAG: &str = "tlock";
const MAC_PREFIX: &str = "--- ";
const WRAP_COLUMNS: usize = 64;
const INFO_HEADER: &[u8] = b"header";

/// Upper bound on one stanza body, in base64 characters.
const MAX_STANZA_BODY: usize = 1 << 20;
/// Upper bound on the whole header, so hostile input cannot balloon memory.
const MAX_HEADER_LEN: u64 = 2 << 20;

type HmacSha256 = Hmac<Sha256>;

/// Parsed (or to-be-written) container header.
#[derive(Clone, Debug)]
pub struct Header {
    pub round: u64,
    pub chain_hash: [u8; 32],
    pub ciphertext: ibe::Ciphertext,
}

impl Header {
    /// Canonical header text through the `---` mark, the input of the MAC.
    fn mac_input(&self) -> String {
        let mut text = String::new();
        text.push_str(VERSION_LINE);
        text.push('\n');
        text.push_str(&format!(
            "-> {STANZA_TAG} {} {}\n",
            self.round,
            hex::encode(self.chain_hash)
        ));
        let body = STANDARD_NO_PAD.encode(ibe::ciphertext_to_bytes(&self.ciphertext));
        for chunk in body.as_bytes().chunks(WRAP_COLUMNS) {
            text.push_str(std::str::from_utf8(chunk).expect("base64 is ASCII"));
            text.push('\n');
        }
        text.push_str("---");
        text
    }

    fn mac(&self, file_key: &[u8; FILE_KEY_LEN]) -> [u8; 32] {
        let key = derive_key(file_key, &[], INFO_HEADER);
        let mut mac = HmacSha256::new_from_slice(&key).expect("HMAC accepts any key length");
        mac.update(self.mac_input().as_bytes());
        mac.finalize().into_bytes().into()
    }

    /// Serialize the header, MAC included, into `dst`.
    pub fn write<W: Write>(&self, file_key: &[u8; FILE_KEY_LEN], dst: &mut W) -> Result<(), Error> {
        let mac = STANDARD_NO_PAD.encode(self.mac(file_key));
        dst.write_all(self.mac_input().as_bytes())?;
        dst.write_all(b" ")?;
        dst.write_all(mac.as_bytes())?;
        dst.write_all(b"\n")?;
        Ok(())
    }

    /// Check the stored MAC once the file key is known.
    pub fn verify_mac(
        &self,
        file_key: &[u8; FILE_KEY_LEN],
        stored: &[u8; 32],
    ) -> Result<(), Error> {
        let key = derive_key(file_key, &[], INFO_HEADER);
        let mut mac = HmacSha256::new_from_slice(&key).expect("HMAC accepts any key length");
        mac.update(self.mac_input().as_bytes());
        mac.verify_slice(stored).map_err(|_| Error::Integrity)
    }

    /// Parse a header from `src`, leaving the reader positioned at the first
    /// payload byte. Returns the header and the stored MAC; the MAC is not
    /// verified here because its key is derived from the still-wrapped file
    /// key.
    pub fn parse<R: BufRead>(src: &mut R) -> Result<(Header, [u8; 32]), Error> {
        let mut limited = src.take(MAX_HEADER_LEN);

        let version = read_header_line(&mut limited)?;
        if version != VERSION_LINE {
            return Err(Error::InvalidContainer("unrecognized version line".into()));
        }

        let mut stanzas: Vec<(u64, [u8; 32], String)> = Vec::new();
        let mac = loop {
            let line = read_header_line(&mut limited)?;
            if let Some(rest) = line.strip_prefix("-> ") {
                stanzas.push(parse_stanza_intro(rest)?);
            } else if let Some(mac_b64) = line.strip_prefix(MAC_PREFIX) {
                break decode_mac(mac_b64)?;
            } else if line == "---" {
                return Err(Error::InvalidContainer("missing header MAC".into()));
            } else {
                let Some((_, _, body)) = stanzas.last_mut() else {
                    return Err(Error::InvalidContainer("body line before stanza".into()));
                };
                if body.len() + line.len() > MAX_STANZA_BODY {
                    return Err(Error::InvalidContainer("oversized stanza".into()));
                }
                body.push_str(&line);
            }
        };

        let Some((round, chain_hash, body)) = stanzas.first() else {
            return Err(Error::InvalidContainer("no recipient stanza".into()));
        };
        if stanzas
            .iter()
            .any(|(r, c, _)| r != round || c != chain_hash)
        {
            return Err(Error::InvalidContainer(
                "recipient stanzas disagree on round or chain".into(),
            ));
        }

        let raw = STANDARD_NO_PAD
            .decode(body.as_bytes())
            .map_err(|_| Error::InvalidContainer("bad stanza base64".into()))?;
        let ciphertext = ibe::ciphertext_from_bytes(&raw)
            .ok_or_else(|| Error::InvalidContainer("bad stanza ciphertext".into()))?;

        Ok((
            Header {
                round: *round,
                chain_hash: *chain_hash,
                ciphertext,
            },
            mac,
        ))
    }
}

/// One line of header text, without its newline. Lines must be
/// newline-terminated; EOF inside the header is a truncation.
fn read_header_line<R: BufRead>(src: &mut R) -> Result<String, Error> {
    let mut line = String::new();
    let n = src.read_line(&mut line).map_err(|err| {
        if err.kind() == std::io::ErrorKind::InvalidData {
            Error::InvalidContainer("header is not valid UTF-8".into())
        } else {
            Error::Io(err)
        }
    })?;
    if n == 0 || !line.ends_with('\n') {
        return Err(Error::InvalidContainer("truncated header".into()));
    }
    line.pop();
    if line.ends_with('\r') {
        return Err(Error::InvalidContainer("CRLF line ending in header".into()));
    }
    Ok(line)
}

fn parse_stanza_intro(rest: &str) -> Result<(u64, [u8; 32], String), Error> {
    let mut parts = rest.split(' ');
    let tag = parts
        .next()
        .ok_or_else(|| Error::InvalidContainer("empty stanza".into()))?;
    if tag != STANZA_TAG {
        return Err(Error::InvalidContainer(format!(
            "unsupported recipient type {tag:?}"
        )));
    }
    let round_arg = parts
        .next()
        .ok_or_else(|| Error::InvalidContainer("stanza is missing its round".into()))?;
    let chain_arg = parts
        .next()
        .ok_or_else(|| Error::InvalidContainer("stanza is missing its chain hash".into()))?;
    if parts.next().is_some() {
        return Err(Error::InvalidContainer("too many stanza arguments".into()));
    }

    let round: u64 = round_arg
        .parse()
        .map_err(|_| Error::InvalidContainer("stanza round is not a decimal number".into()))?;
    let chain_hash = decode_chain_arg(chain_arg)?;
    Ok((round, chain_hash, String::new()))
}

/// The chain argument is always the 32-byte chain hash in lowercase hex.
/// Beacon-ID names found in legacy containers are rejected rather than
/// silently accepted.
fn decode_chain_arg(arg: &str) -> Result<[u8; 32], Error> {
    if arg.len() != 64
        || !arg
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return Err(Error::InvalidContainer(
            "chain argument is not 64 lowercase hex characters".into(),
        ));
    }
    let raw = hex::decode(arg).map_err(|_| Error::InvalidContainer("bad chain hex".into()))?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&raw);
    Ok(out)
}

fn decode_mac(mac_b64: &str) -> Result<[u8; 32], Error> {
    let raw = STANDARD_NO_PAD
        .decode(mac_b64.as_bytes())
        .map_err(|_| Error::InvalidContainer("bad MAC base64".into()))?;
    let mut out = [0u8; 32];
    if raw.len() != out.len() {
        return Err(Error::InvalidContainer("bad MAC length".into()));
    }
    out.copy_from_slice(&raw);
    Ok(out)
}
