//! # Decode Errors
//!
//! Every fallible operation returns `eyre::Result`. Failures that callers may
//! want to react to (skip a corrupt row, report an unsupported format) are
//! raised as an [`EseError`] inside the report, so they can be recovered with
//! `report.downcast_ref::<EseError>()` and classified with
//! [`EseError::kind`].
//!
//! ```ignore
//! match table.record_at(cursor) {
//!     Ok(record) => process(record),
//!     Err(report) if esedb::error::kind_of(&report) == Some(ErrorKind::OutOfBounds) => {
//!         skipped += 1;
//!     }
//!     Err(report) => return Err(report),
//! }
//! ```
//!
//! A key lookup miss is not an error: navigators return `Ok(None)`.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    OutOfBounds,
    UnsupportedFormat,
    IoFailure,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EseError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{what} out of bounds: {size} bytes at offset {offset} exceed {available} available")]
    OutOfBounds {
        what: &'static str,
        offset: usize,
        size: usize,
        available: usize,
    },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported column type: {0}")]
    UnsupportedColumnType(u32),

    #[error("truncated row: column {column_id} needs {size} bytes at offset {offset} but row has {row_len}")]
    TruncatedRow {
        column_id: u32,
        offset: usize,
        size: usize,
        row_len: usize,
    },

    #[error("inconsistent tagged offsets: {current:#06x} follows {previous:#06x}")]
    InconsistentTaggedOffsets { previous: u16, current: u16 },

    #[error("inconsistent variable offsets: column {column_id} ends at {current} before previous end {previous}")]
    InconsistentVariableOffsets {
        column_id: u32,
        previous: u16,
        current: u16,
    },

    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("malformed tree at page {page_number}: {reason}")]
    MalformedTree { page_number: u32, reason: String },

    #[error("malformed page {page_number}: {reason}")]
    MalformedPage { page_number: u32, reason: String },

    #[error("non-contiguous long value segment: expected offset {expected} but found {found}")]
    NonContiguousSegment { expected: u32, found: u32 },

    #[error("wrong span size: expected {expected} bytes, found {found}")]
    WrongSpanSize { expected: usize, found: usize },

    #[error("checksum mismatch on page {page_number}: stored {stored:#010x}, calculated {calculated:#010x}")]
    ChecksumMismatch {
        page_number: u32,
        stored: u32,
        calculated: u32,
    },

    #[error("i/o failure: {0}")]
    Io(String),
}

impl EseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EseError::InvalidArgument(_) | EseError::WrongSpanSize { .. } => {
                ErrorKind::InvalidArgument
            }
            EseError::OutOfBounds { .. }
            | EseError::TruncatedRow { .. }
            | EseError::InconsistentTaggedOffsets { .. }
            | EseError::InconsistentVariableOffsets { .. }
            | EseError::MalformedKey(_)
            | EseError::MalformedTree { .. }
            | EseError::MalformedPage { .. }
            | EseError::NonContiguousSegment { .. }
            | EseError::ChecksumMismatch { .. } => ErrorKind::OutOfBounds,
            EseError::UnsupportedFormat(_) | EseError::UnsupportedColumnType(_) => {
                ErrorKind::UnsupportedFormat
            }
            EseError::Io(_) => ErrorKind::IoFailure,
        }
    }

    pub(crate) fn out_of_bounds(what: &'static str, offset: usize, size: usize, available: usize) -> Self {
        EseError::OutOfBounds {
            what,
            offset,
            size,
            available,
        }
    }
}

/// Returns the typed error carried by `report`, if any.
pub fn ese_error(report: &eyre::Report) -> Option<&EseError> {
    report.downcast_ref::<EseError>()
}

/// Returns the kind of the typed error carried by `report`, if any.
pub fn kind_of(report: &eyre::Report) -> Option<ErrorKind> {
    ese_error(report).map(EseError::kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ese_error_survives_conversion_into_report() {
        let report: eyre::Report = EseError::UnsupportedColumnType(42).into();

        assert_eq!(ese_error(&report), Some(&EseError::UnsupportedColumnType(42)));
        assert_eq!(kind_of(&report), Some(ErrorKind::UnsupportedFormat));
    }

    #[test]
    fn plain_eyre_reports_have_no_kind() {
        let report = eyre::eyre!("something else");

        assert_eq!(kind_of(&report), None);
    }

    #[test]
    fn truncated_row_display_names_column_and_sizes() {
        let err = EseError::TruncatedRow {
            column_id: 3,
            offset: 10,
            size: 8,
            row_len: 12,
        };

        let msg = err.to_string();
        assert!(msg.contains("column 3"));
        assert!(msg.contains("8 bytes"));
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn checksum_mismatch_display_uses_hex() {
        let err = EseError::ChecksumMismatch {
            page_number: 7,
            stored: 0x1234,
            calculated: 0xabcd,
        };

        assert_eq!(
            err.to_string(),
            "checksum mismatch on page 7: stored 0x00001234, calculated 0x0000abcd"
        );
    }
}
