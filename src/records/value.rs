//! # Column Value Codec
//!
//! Pure conversions from a column's byte span to a typed value. Every
//! fixed-width conversion requires the span to be exactly the type's width
//! and fails with `EseError::WrongSpanSize` otherwise; nothing here reads
//! past the span it was given.
//!
//! ## Representations
//!
//! | Type | Encoding |
//! |------|----------|
//! | integers | little-endian, two's complement for signed types |
//! | Currency | i64, units of 1/10000 |
//! | Float32/Float64 | IEEE 754 little-endian |
//! | DateTime | FILETIME: u64 count of 100ns intervals since 1601-01-01 UTC |
//! | Guid | 16 bytes; first three groups little-endian in text form |
//! | Boolean | one byte, nonzero is true |
//! | Text | codepage-dependent, trailing NULs removed |
//!
//! ## Codepage 1200
//!
//! Writers disagree on what "Unicode" means: some store UTF-16LE, some
//! store UTF-8 under the same codepage. A span is read as UTF-16LE when it
//! contains a zero byte that is followed somewhere later by a nonzero byte,
//! otherwise as UTF-8.

use std::borrow::Cow;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use eyre::Result;

use crate::encoding::bytes::exact;
use crate::records::codepage::{decode_narrow, decode_utf16le, CodepageTable};
use crate::records::types::ColumnType;

/// 100ns intervals between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_EPOCH: u64 = 116_444_736_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileTime(pub u64);

impl FileTime {
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Seconds relative to the Unix epoch; negative before 1970.
    pub fn unix_seconds(self) -> i64 {
        (self.0 as i128 - FILETIME_UNIX_EPOCH as i128).div_euclid(10_000_000) as i64
    }

    /// `None` for timestamps before the Unix epoch.
    pub fn to_system_time(self) -> Option<SystemTime> {
        let since_epoch = self.0.checked_sub(FILETIME_UNIX_EPOCH)?;
        let secs = since_epoch / 10_000_000;
        let nanos = (since_epoch % 10_000_000) as u32 * 100;
        UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            u16::from_le_bytes([b[4], b[5]]),
            u16::from_le_bytes([b[6], b[7]]),
            b[8],
            b[9],
            b[10],
            b[11],
            b[12],
            b[13],
            b[14],
            b[15]
        )
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}

/// A decoded column value. Binary values borrow from the row when they can.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue<'a> {
    Null,
    Boolean(bool),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    Currency(i64),
    Float32(f32),
    Float64(f64),
    DateTime(FileTime),
    Guid(Guid),
    Binary(Cow<'a, [u8]>),
    Text(String),
}

pub fn to_bool(span: &[u8]) -> Result<bool> {
    Ok(exact::<1>(span)?[0] != 0)
}

pub fn to_u8(span: &[u8]) -> Result<u8> {
    Ok(exact::<1>(span)?[0])
}

pub fn to_i16(span: &[u8]) -> Result<i16> {
    Ok(i16::from_le_bytes(exact(span)?))
}

pub fn to_u16(span: &[u8]) -> Result<u16> {
    Ok(u16::from_le_bytes(exact(span)?))
}

pub fn to_i32(span: &[u8]) -> Result<i32> {
    Ok(i32::from_le_bytes(exact(span)?))
}

pub fn to_u32(span: &[u8]) -> Result<u32> {
    Ok(u32::from_le_bytes(exact(span)?))
}

pub fn to_i64(span: &[u8]) -> Result<i64> {
    Ok(i64::from_le_bytes(exact(span)?))
}

pub fn to_u64(span: &[u8]) -> Result<u64> {
    Ok(u64::from_le_bytes(exact(span)?))
}

pub fn to_f32(span: &[u8]) -> Result<f32> {
    Ok(f32::from_le_bytes(exact(span)?))
}

pub fn to_f64(span: &[u8]) -> Result<f64> {
    Ok(f64::from_le_bytes(exact(span)?))
}

pub fn to_filetime(span: &[u8]) -> Result<FileTime> {
    Ok(FileTime(to_u64(span)?))
}

pub fn to_guid(span: &[u8]) -> Result<Guid> {
    Ok(Guid(exact(span)?))
}

/// Decodes text stored with `codepage` (0 selects the table's default).
pub fn to_text(span: &[u8], codepage: u32, codepages: &dyn CodepageTable) -> Result<String> {
    let codepage = codepages.resolve(codepage);
    let text = if codepages.is_unicode(codepage) {
        if looks_like_utf16(span) {
            decode_utf16le(span)
        } else {
            String::from_utf8_lossy(span).into_owned()
        }
    } else {
        decode_narrow(span, codepage)?
    };
    Ok(trim_trailing_nul(text))
}

fn looks_like_utf16(span: &[u8]) -> bool {
    match span.iter().position(|&b| b == 0) {
        Some(zero) => span[zero + 1..].iter().any(|&b| b != 0),
        None => false,
    }
}

fn trim_trailing_nul(mut text: String) -> String {
    let trimmed = text.trim_end_matches('\0').len();
    text.truncate(trimmed);
    text
}

/// Converts a span according to the column type.
pub fn decode_value<'a>(
    column_type: ColumnType,
    span: &'a [u8],
    codepage: u32,
    codepages: &dyn CodepageTable,
) -> Result<ColumnValue<'a>> {
    let value = match column_type {
        ColumnType::Null => ColumnValue::Null,
        ColumnType::Boolean => ColumnValue::Boolean(to_bool(span)?),
        ColumnType::UInt8 => ColumnValue::UInt8(to_u8(span)?),
        ColumnType::Int16 => ColumnValue::Int16(to_i16(span)?),
        ColumnType::UInt16 => ColumnValue::UInt16(to_u16(span)?),
        ColumnType::Int32 => ColumnValue::Int32(to_i32(span)?),
        ColumnType::UInt32 => ColumnValue::UInt32(to_u32(span)?),
        ColumnType::Int64 => ColumnValue::Int64(to_i64(span)?),
        ColumnType::Currency => ColumnValue::Currency(to_i64(span)?),
        ColumnType::Float32 => ColumnValue::Float32(to_f32(span)?),
        ColumnType::Float64 => ColumnValue::Float64(to_f64(span)?),
        ColumnType::DateTime => ColumnValue::DateTime(to_filetime(span)?),
        ColumnType::Guid => ColumnValue::Guid(to_guid(span)?),
        ColumnType::Text | ColumnType::LargeText => {
            ColumnValue::Text(to_text(span, codepage, codepages)?)
        }
        ColumnType::Binary | ColumnType::LargeBinary | ColumnType::SuperLarge => {
            ColumnValue::Binary(Cow::Borrowed(span))
        }
    };
    Ok(value)
}
