//! Bounds-checked little-endian reads over untrusted buffers.
//!
//! Every offset and size in an ESE file comes from file content, so nothing
//! is sliced before `offset + size <= data.len()` has been checked. Failures
//! surface as `EseError::OutOfBounds` naming the structure being read.

use eyre::Result;

use crate::error::EseError;

#[inline]
pub fn slice<'a>(data: &'a [u8], offset: usize, size: usize, what: &'static str) -> Result<&'a [u8]> {
    match offset.checked_add(size) {
        Some(end) if end <= data.len() => Ok(&data[offset..end]),
        _ => Err(EseError::out_of_bounds(what, offset, size, data.len()).into()),
    }
}

#[inline]
pub fn read_u8(data: &[u8], offset: usize, what: &'static str) -> Result<u8> {
    Ok(slice(data, offset, 1, what)?[0])
}

#[inline]
pub fn read_u16(data: &[u8], offset: usize, what: &'static str) -> Result<u16> {
    let b = slice(data, offset, 2, what)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

#[inline]
pub fn read_u32(data: &[u8], offset: usize, what: &'static str) -> Result<u32> {
    let b = slice(data, offset, 4, what)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[inline]
pub fn read_u64(data: &[u8], offset: usize, what: &'static str) -> Result<u64> {
    let b = slice(data, offset, 8, what)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(b);
    Ok(u64::from_le_bytes(buf))
}

/// Copies a span into a fixed array, failing with `WrongSpanSize` unless the
/// lengths match exactly.
#[inline]
pub fn exact<const N: usize>(span: &[u8]) -> Result<[u8; N]> {
    <[u8; N]>::try_from(span).map_err(|_| {
        EseError::WrongSpanSize {
            expected: N,
            found: span.len(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ese_error;

    #[test]
    fn slice_within_bounds() {
        let data = [1u8, 2, 3, 4];

        assert_eq!(slice(&data, 1, 2, "test").unwrap(), &[2, 3]);
        assert_eq!(slice(&data, 4, 0, "test").unwrap(), &[] as &[u8]);
    }

    #[test]
    fn slice_past_end_reports_out_of_bounds() {
        let data = [1u8, 2, 3, 4];
        let err = slice(&data, 3, 2, "row header").unwrap_err();

        assert_eq!(
            ese_error(&err),
            Some(&EseError::OutOfBounds {
                what: "row header",
                offset: 3,
                size: 2,
                available: 4
            })
        );
    }

    #[test]
    fn slice_offset_overflow_does_not_panic() {
        let data = [0u8; 4];

        assert!(slice(&data, usize::MAX, 2, "test").is_err());
    }

    #[test]
    fn reads_little_endian_integers() {
        let data = [0x34, 0x12, 0x78, 0x56, 0x00, 0x00, 0x00, 0x00];

        assert_eq!(read_u16(&data, 0, "t").unwrap(), 0x1234);
        assert_eq!(read_u32(&data, 0, "t").unwrap(), 0x5678_1234);
        assert_eq!(read_u64(&data, 0, "t").unwrap(), 0x5678_1234);
        assert_eq!(read_u8(&data, 3, "t").unwrap(), 0x56);
    }

    #[test]
    fn exact_rejects_wrong_length() {
        let err = exact::<4>(&[1, 2, 3]).unwrap_err();

        assert_eq!(
            ese_error(&err),
            Some(&EseError::WrongSpanSize {
                expected: 4,
                found: 3
            })
        );
        assert_eq!(exact::<2>(&[9, 8]).unwrap(), [9, 8]);
    }
}
