//! # Compressed Column Values
//!
//! Tagged values whose flags byte carries `value_flags::COMPRESSED` hold one
//! of two encodings, selected by the first byte of the value:
//!
//! ```text
//! 0x18 | u16 uncompressed size | XPRESS stream      (LZ77 with 32-bit flag words)
//! 0x?? | 7-bit packed characters                   (any other leading byte)
//! ```
//!
//! ## 7-bit packing
//!
//! Each output byte uses 7 bits of input; bits are consumed LSB first, so
//! every 7 input bytes yield 8 output bytes. The output size is
//! `(len - 1) * 8 / 7`. Bit 0x10 of the leading byte marks narrow text; when
//! it is clear the unpacked bytes are UTF-16LE code units.
//!
//! ## XPRESS
//!
//! The stream alternates 32-bit little-endian indicator words with up to 32
//! items. A clear indicator bit (MSB first) copies one literal byte; a set bit
//! reads a u16 tuple `offset - 1 << 3 | length - 3` with nibble, byte and u16
//! length extensions, then copies `length` bytes from `offset` bytes back.

use eyre::Result;

use crate::config::{SEVEN_BIT_NARROW_FLAG, XPRESS_MARKER, XPRESS_MAX_MATCH};
use crate::encoding::bytes::{read_u16, read_u32, read_u8};
use crate::error::EseError;

pub fn decompressed_size(data: &[u8]) -> Result<usize> {
    let marker = read_u8(data, 0, "compressed value marker")?;
    if marker == XPRESS_MARKER {
        Ok(read_u16(data, 1, "xpress uncompressed size")? as usize)
    } else {
        Ok(((data.len() - 1) * 8) / 7)
    }
}

/// Decompresses either encoding into a fresh buffer.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let marker = read_u8(data, 0, "compressed value marker")?;
    if marker == XPRESS_MARKER {
        xpress_decompress(data)
    } else {
        seven_bit_decompress(data)
    }
}

pub fn seven_bit_decompress(data: &[u8]) -> Result<Vec<u8>> {
    let marker = read_u8(data, 0, "7-bit value marker")?;
    if marker == XPRESS_MARKER {
        return Err(EseError::UnsupportedFormat("xpress data passed to 7-bit decoder".into()).into());
    }
    let mut out = Vec::with_capacity(((data.len() - 1) * 8) / 7);
    let mut bits: u16 = 0;
    let mut bit_index: u8 = 0;

    for &byte in &data[1..] {
        bits |= (byte as u16) << bit_index;
        out.push((bits & 0x7f) as u8);
        bits >>= 7;
        bit_index += 1;

        if bit_index == 7 {
            out.push((bits & 0x7f) as u8);
            bits >>= 7;
            bit_index = 0;
        }
    }
    if bits != 0 {
        tracing::trace!(remaining = bits, "7-bit value has trailing bits");
    }
    Ok(out)
}

pub fn xpress_decompress(data: &[u8]) -> Result<Vec<u8>> {
    let marker = read_u8(data, 0, "xpress marker")?;
    if marker != XPRESS_MARKER {
        return Err(EseError::UnsupportedFormat(format!(
            "xpress marker {:#04x} expected, found {:#04x}",
            XPRESS_MARKER, marker
        ))
        .into());
    }
    let expected = read_u16(data, 1, "xpress uncompressed size")? as usize;
    let mut out: Vec<u8> = Vec::with_capacity(expected);
    let mut pos = 3usize;
    let mut shared_nibble: Option<usize> = None;

    while pos < data.len() && out.len() < expected {
        let indicator = read_u32(data, pos, "xpress indicator")?;
        pos += 4;

        for bit in (0..32).rev() {
            if pos >= data.len() || out.len() >= expected {
                break;
            }
            if indicator & (1 << bit) == 0 {
                out.push(data[pos]);
                pos += 1;
                continue;
            }

            let tuple = read_u16(data, pos, "xpress match")?;
            pos += 2;
            let offset = ((tuple >> 3) as usize) + 1;
            let mut length = (tuple & 0x07) as usize;

            if length == 0x07 {
                match shared_nibble.take() {
                    None => {
                        let nibble = read_u8(data, pos, "xpress length nibble")?;
                        length += (nibble & 0x0f) as usize;
                        shared_nibble = Some(pos);
                        pos += 1;
                    }
                    Some(at) => length += (data[at] >> 4) as usize,
                }
            }
            if length == 0x07 + 0x0f {
                length += read_u8(data, pos, "xpress length byte")? as usize;
                pos += 1;
            }
            if length == 0x07 + 0x0f + 0xff {
                length = read_u16(data, pos, "xpress length word")? as usize;
                pos += 2;
            }
            length += 3;

            if length > XPRESS_MAX_MATCH {
                return Err(EseError::UnsupportedFormat(format!("xpress match of {} bytes", length)).into());
            }
            if offset > out.len() {
                return Err(EseError::out_of_bounds("xpress match offset", offset, length, out.len()).into());
            }
            let start = out.len() - offset;
            for i in 0..length {
                if out.len() >= expected {
                    break;
                }
                let b = out[start + i];
                out.push(b);
            }
        }
    }
    Ok(out)
}

/// Decompresses a text value and converts it to a `String`.
///
/// XPRESS output and 7-bit output without the narrow flag are tried as
/// UTF-16LE first when their length is even; anything else is narrow text.
pub fn decompress_text(data: &[u8]) -> Result<String> {
    let marker = read_u8(data, 0, "compressed value marker")?;
    let bytes = decompress(data)?;
    let maybe_wide = marker == XPRESS_MARKER || marker & SEVEN_BIT_NARROW_FLAG == 0;

    if maybe_wide && bytes.len() % 2 == 0 {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        if let Ok(text) = String::from_utf16(&units) {
            return Ok(trim_nul(text));
        }
    }
    Ok(trim_nul(String::from_utf8_lossy(&bytes).into_owned()))
}

fn trim_nul(mut text: String) -> String {
    while text.ends_with('\0') {
        text.pop();
    }
    text
}
