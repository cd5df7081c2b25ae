//! Decoding of the "modified UTF-8" used by `CONSTANT_Utf8` entries.
//!
//! It differs from standard UTF-8 in two ways: `\0` is written as the two
//! byte sequence `C0 80`, and supplementary characters are written as a
//! surrogate pair with each half encoded as three bytes.
//!
//! See <https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.4.7>.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Mutf8Error {
    #[error("illegal leading byte {byte:#04x} at offset {offset}")]
    IllegalByte { byte: u8, offset: usize },
    #[error("bad continuation byte at offset {0}")]
    BadContinuation(usize),
    #[error("sequence starting at offset {0} runs past the end")]
    Truncated(usize),
}

pub fn decode(bytes: &[u8]) -> Result<String, Mutf8Error> {
    if bytes.iter().all(|b| *b != 0 && *b < 0x80) {
        // plain ASCII is identical in both encodings
        return Ok(bytes.iter().map(|b| *b as char).collect());
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let x = bytes[i];
        if x & 0x80 == 0 {
            units.push(x as u16);
            i += 1;
        } else if x & 0xE0 == 0xC0 {
            let y = continuation(bytes, i, 1)?;
            units.push(((x as u16 & 0x1F) << 6) | (y as u16 & 0x3F));
            i += 2;
        } else if x & 0xF0 == 0xE0 {
            let y = continuation(bytes, i, 1)?;
            let z = continuation(bytes, i, 2)?;
            units.push(((x as u16 & 0x0F) << 12) | ((y as u16 & 0x3F) << 6) | (z as u16 & 0x3F));
            i += 3;
        } else {
            return Err(Mutf8Error::IllegalByte { byte: x, offset: i });
        }
    }

    Ok(char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect())
}

fn continuation(bytes: &[u8], start: usize, n: usize) -> Result<u8, Mutf8Error> {
    let b = *bytes.get(start + n).ok_or(Mutf8Error::Truncated(start))?;
    if b & 0xC0 != 0x80 {
        return Err(Mutf8Error::BadContinuation(start + n));
    }
    Ok(b)
}
