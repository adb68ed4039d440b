//! ASCII armor: a PEM-like textual envelope around the binary container.

use std::io::{BufRead, Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::errors::Error;

pub const BEGIN_LINE: &str = "-----BEGIN AGE ENCRYPTED FILE-----";
pub const END_LINE: &str = "-----END AGE ENCRYPTED FILE-----";

const WRAP_COLUMNS: usize = 64;

/// Wrap the binary container from `src` into an armored block on `dst`.
pub fn armor<R: Read, W: Write>(src: &mut R, dst: &mut W) -> Result<(), Error> {
    let mut raw = Vec::new();
    src.read_to_end(&mut raw)?;

    let encoded = STANDARD.encode(&raw);
    dst.write_all(BEGIN_LINE.as_bytes())?;
    dst.write_all(b"\n")?;
    for chunk in encoded.as_bytes().chunks(WRAP_COLUMNS) {
        dst.write_all(chunk)?;
        dst.write_all(b"\n")?;
    }
    dst.write_all(END_LINE.as_bytes())?;
    dst.write_all(b"\n")?;
    Ok(())
}

/// Recover the binary container from an armored block.
///
/// The header and footer lines must match exactly and the body must be
/// canonically wrapped, so re-armoring the output reproduces the input.
pub fn unarmor<R: BufRead>(src: &mut R) -> Result<Vec<u8>, Error> {
    let mut lines = src.lines();

    let first = next_line(&mut lines)?;
    if first != BEGIN_LINE {
        return Err(Error::InvalidContainer("bad armor header line".into()));
    }

    let mut body = String::new();
    let mut saw_short_line = false;
    loop {
        let line = next_line(&mut lines)?;
        if line == END_LINE {
            break;
        }
        // Canonical wrapping: only the final body line may be short.
        if saw_short_line {
            return Err(Error::InvalidContainer("bad armor wrapping".into()));
        }
        if line.len() > WRAP_COLUMNS || line.is_empty() {
            return Err(Error::InvalidContainer("bad armor wrapping".into()));
        }
        saw_short_line = line.len() < WRAP_COLUMNS;
        body.push_str(&line);
    }

    // Nothing but trailing whitespace may follow the footer.
    for line in lines {
        let line = line.map_err(Error::Io)?;
        if !line.trim().is_empty() {
            return Err(Error::InvalidContainer("data after armor footer".into()));
        }
    }

    STANDARD
        .decode(body.as_bytes())
        .map_err(|_| Error::InvalidContainer("bad armor base64".into()))
}

fn next_line<I: Iterator<Item = std::io::Result<String>>>(lines: &mut I) -> Result<String, Error> {
    match lines.next() {
        Some(Ok(line)) => Ok(line),
        Some(Err(err)) => Err(Error::Io(err)),
        None => Err(Error::InvalidContainer("truncated armor block".into())),
    }
}
