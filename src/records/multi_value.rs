//! # Multi-Valued Columns
//!
//! A tagged value flagged `MULTI_VALUE` packs several values behind a table
//! of u16 start offsets:
//!
//! ```text
//! +-----------+-----------+-----+---------+---------+-----+
//! | offset 0  | offset 1  | ... | value 0 | value 1 | ... |
//! +-----------+-----------+-----+---------+---------+-----+
//!   count = (offset 0 & 0x7fff) / 2
//! ```
//!
//! Offsets are masked with 0x7fff and must not decrease; each value runs to
//! the next offset, the last one to the end of the span. Values stored in a
//! long-value tree and the compact two-value layout (flag 0x10) are not
//! decoded here.

use eyre::Result;

use crate::config::{value_flags, VARIABLE_OFFSET_MASK};
use crate::encoding::bytes::read_u16;
use crate::error::EseError;

#[derive(Debug, Clone)]
pub struct MultiValue<'a> {
    data: &'a [u8],
    bounds: Vec<(usize, usize)>,
}

impl<'a> MultiValue<'a> {
    pub fn parse(span: &'a [u8], flags: u8) -> Result<Self> {
        if flags & value_flags::MULTI_VALUE == 0 {
            return Err(EseError::InvalidArgument(format!(
                "value flags {:#04x} do not mark a multi-value",
                flags
            ))
            .into());
        }
        if flags & (value_flags::LONG_VALUE | value_flags::MULTI_VALUE_OFFSET) != 0 {
            return Err(EseError::UnsupportedFormat(format!(
                "multi-value with flags {:#04x}",
                flags
            ))
            .into());
        }

        let first = (read_u16(span, 0, "multi-value offset table")? & VARIABLE_OFFSET_MASK) as usize;
        let count = first / 2;
        eyre::ensure!(count > 0, "multi-value offset table is empty");

        let mut starts = Vec::with_capacity(count);
        for i in 0..count {
            let start = (read_u16(span, i * 2, "multi-value offset table")? & VARIABLE_OFFSET_MASK) as usize;
            if let Some(&previous) = starts.last() {
                if start < previous {
                    return Err(EseError::InconsistentTaggedOffsets {
                        previous: previous as u16,
                        current: start as u16,
                    }
                    .into());
                }
            }
            if start > span.len() {
                return Err(EseError::out_of_bounds("multi-value entry", start, 0, span.len()).into());
            }
            starts.push(start);
        }

        let bounds = starts
            .iter()
            .enumerate()
            .map(|(i, &start)| (start, starts.get(i + 1).copied().unwrap_or(span.len())))
            .collect();

        Ok(Self { data: span, bounds })
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        let &(start, end) = self.bounds.get(index)?;
        Some(&self.data[start..end])
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        self.bounds.iter().map(|&(start, end)| &self.data[start..end])
    }
}
