//! # Column Types
//!
//! The catalog stores a column's type as a `u32` code. Codes 0 through 17 are
//! defined; anything else makes the column undecodable and surfaces as
//! `EseError::UnsupportedColumnType` the first time a row of that table is
//! decoded.
//!
//! ## Type Codes
//!
//! | Code | Type | Fixed size |
//! |------|------|------------|
//! | 0 | Null | 0 |
//! | 1 | Boolean | 1 |
//! | 2 | UInt8 | 1 |
//! | 3 | Int16 | 2 |
//! | 4 | Int32 | 4 |
//! | 5 | Currency | 8 |
//! | 6 | Float32 | 4 |
//! | 7 | Float64 | 8 |
//! | 8 | DateTime (FILETIME) | 8 |
//! | 9 | Binary | variable |
//! | 10 | Text | variable |
//! | 11 | LargeBinary | variable |
//! | 12 | LargeText | variable |
//! | 13 | SuperLarge | variable |
//! | 14 | UInt32 | 4 |
//! | 15 | Int64 | 8 |
//! | 16 | Guid | 16 |
//! | 17 | UInt16 | 2 |

use eyre::Result;

use crate::error::EseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Null,
    Boolean,
    UInt8,
    Int16,
    Int32,
    Currency,
    Float32,
    Float64,
    DateTime,
    Binary,
    Text,
    LargeBinary,
    LargeText,
    SuperLarge,
    UInt32,
    Int64,
    Guid,
    UInt16,
}

impl ColumnType {
    pub fn from_code(code: u32) -> Result<Self> {
        let column_type = match code {
            0 => ColumnType::Null,
            1 => ColumnType::Boolean,
            2 => ColumnType::UInt8,
            3 => ColumnType::Int16,
            4 => ColumnType::Int32,
            5 => ColumnType::Currency,
            6 => ColumnType::Float32,
            7 => ColumnType::Float64,
            8 => ColumnType::DateTime,
            9 => ColumnType::Binary,
            10 => ColumnType::Text,
            11 => ColumnType::LargeBinary,
            12 => ColumnType::LargeText,
            13 => ColumnType::SuperLarge,
            14 => ColumnType::UInt32,
            15 => ColumnType::Int64,
            16 => ColumnType::Guid,
            17 => ColumnType::UInt16,
            _ => return Err(EseError::UnsupportedColumnType(code).into()),
        };
        Ok(column_type)
    }

    pub fn code(self) -> u32 {
        match self {
            ColumnType::Null => 0,
            ColumnType::Boolean => 1,
            ColumnType::UInt8 => 2,
            ColumnType::Int16 => 3,
            ColumnType::Int32 => 4,
            ColumnType::Currency => 5,
            ColumnType::Float32 => 6,
            ColumnType::Float64 => 7,
            ColumnType::DateTime => 8,
            ColumnType::Binary => 9,
            ColumnType::Text => 10,
            ColumnType::LargeBinary => 11,
            ColumnType::LargeText => 12,
            ColumnType::SuperLarge => 13,
            ColumnType::UInt32 => 14,
            ColumnType::Int64 => 15,
            ColumnType::Guid => 16,
            ColumnType::UInt16 => 17,
        }
    }

    /// Storage size of a fixed-width type, `None` for variable-width types.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            ColumnType::Null => Some(0),
            ColumnType::Boolean | ColumnType::UInt8 => Some(1),
            ColumnType::Int16 | ColumnType::UInt16 => Some(2),
            ColumnType::Int32 | ColumnType::UInt32 | ColumnType::Float32 => Some(4),
            ColumnType::Currency
            | ColumnType::Float64
            | ColumnType::DateTime
            | ColumnType::Int64 => Some(8),
            ColumnType::Guid => Some(16),
            ColumnType::Binary
            | ColumnType::Text
            | ColumnType::LargeBinary
            | ColumnType::LargeText
            | ColumnType::SuperLarge => None,
        }
    }

    pub fn is_text(self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::LargeText)
    }

    pub fn is_binary(self) -> bool {
        matches!(
            self,
            ColumnType::Binary | ColumnType::LargeBinary | ColumnType::SuperLarge
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Null => "null",
            ColumnType::Boolean => "boolean",
            ColumnType::UInt8 => "uint8",
            ColumnType::Int16 => "int16",
            ColumnType::Int32 => "int32",
            ColumnType::Currency => "currency",
            ColumnType::Float32 => "float32",
            ColumnType::Float64 => "float64",
            ColumnType::DateTime => "datetime",
            ColumnType::Binary => "binary",
            ColumnType::Text => "text",
            ColumnType::LargeBinary => "large binary",
            ColumnType::LargeText => "large text",
            ColumnType::SuperLarge => "super large",
            ColumnType::UInt32 => "uint32",
            ColumnType::Int64 => "int64",
            ColumnType::Guid => "guid",
            ColumnType::UInt16 => "uint16",
        }
    }
}

impl TryFrom<u32> for ColumnType {
    type Error = eyre::Report;

    fn try_from(code: u32) -> Result<Self> {
        Self::from_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ese_error;

    #[test]
    fn every_defined_code_round_trips() {
        for code in 0..=17 {
            assert_eq!(ColumnType::from_code(code).unwrap().code(), code);
        }
    }

    #[test]
    fn unknown_code_is_unsupported_column_type() {
        let err = ColumnType::from_code(18).unwrap_err();

        assert_eq!(ese_error(&err), Some(&EseError::UnsupportedColumnType(18)));
    }

    #[test]
    fn fixed_sizes_match_storage_widths() {
        assert_eq!(ColumnType::Boolean.fixed_size(), Some(1));
        assert_eq!(ColumnType::UInt16.fixed_size(), Some(2));
        assert_eq!(ColumnType::Float32.fixed_size(), Some(4));
        assert_eq!(ColumnType::DateTime.fixed_size(), Some(8));
        assert_eq!(ColumnType::Guid.fixed_size(), Some(16));
        assert_eq!(ColumnType::LargeText.fixed_size(), None);
    }

    #[test]
    fn text_and_binary_are_disjoint() {
        assert!(ColumnType::Text.is_text());
        assert!(!ColumnType::Text.is_binary());
        assert!(ColumnType::SuperLarge.is_binary());
        assert!(!ColumnType::Int32.is_text());
    }
}
