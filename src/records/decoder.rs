//! # Record Decoder
//!
//! Splits a data-definition row into one slot per schema column. The decoder
//! never converts values; it only locates them, so a decoded record is a
//! list of borrowed spans plus the optional flags byte of tagged values.
//!
//! ## Row Layout
//!
//! ```text
//! +----------+----------+-----------+----------------+--------------+----------------+
//! | last     | last     | variable  | fixed columns  | variable end | variable data  | tagged region ...
//! | fixed id | var id   | offset    | (schema order) | offsets (u16)|                |
//! | u8       | u8       | u16       |                | 128..=last   |                |
//! +----------+----------+-----------+----------------+--------------+----------------+
//!  0          1          2           4                ^ variable offset
//! ```
//!
//! Columns are routed by identifier:
//!
//! | Identifier | Region | Absent when |
//! |------------|--------|-------------|
//! | 1..=127 | fixed | id > last fixed id |
//! | 128..=255 | variable | id > last var id, or end offset has bit 0x8000 |
//! | 256.. | tagged | no tagged entry carries the id |
//!
//! ## Tagged Region
//!
//! Two layouts exist. The index layout starts with a table of
//! `(u16 id, u16 offset)` pairs; the first offset doubles as the table size.
//! On pages without the extended header offsets are 14 bits and bit 0x4000
//! announces a leading flags byte; with the extended header offsets are 15
//! bits and every value starts with a flags byte.
//!
//! ```text
//! index:  [id|off][id|off]...[value][value]...
//! linear: [id|size][value][id|size][value]...     size bit 0x8000: flags byte
//! ```
//!
//! ## Templates
//!
//! A table derived from a template stores the template's columns and its
//! own columns in one row. The schema lists template columns first; the
//! table's own columns must then start at the first tagged identifier.

use eyre::Result;
use smallvec::SmallVec;
use tracing::Span;

use crate::config::{
    value_flags, DecodeContext, FormatOptions, EXTENDED_TAGGED_OFFSET_MASK, FIRST_TAGGED_COLUMN_ID,
    FIRST_VARIABLE_COLUMN_ID, LINEAR_TAGGED_HAS_FLAGS_BIT, LINEAR_TAGGED_SIZE_MASK,
    MAX_FIXED_COLUMN_ID, MAX_VARIABLE_COLUMN_ID, ROW_HEADER_SIZE, TAGGED_ENTRY_SIZE,
    TAGGED_HAS_FLAGS_BIT, TAGGED_OFFSET_MASK, VARIABLE_ABSENT_BIT, VARIABLE_OFFSET_MASK,
};
use crate::encoding::bytes::read_u16;
use crate::error::EseError;
use crate::records::schema::RecordSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowHeader {
    pub last_fixed_column_id: u8,
    pub last_variable_column_id: u8,
    pub variable_offset: u16,
}

impl RowHeader {
    pub fn parse(row: &[u8]) -> Result<Self> {
        if row.len() < ROW_HEADER_SIZE {
            return Err(EseError::TruncatedRow {
                column_id: 0,
                offset: 0,
                size: ROW_HEADER_SIZE,
                row_len: row.len(),
            }
            .into());
        }
        Ok(Self {
            last_fixed_column_id: row[0],
            last_variable_column_id: row[1],
            variable_offset: u16::from_le_bytes([row[2], row[3]]),
        })
    }

    pub fn variable_column_count(&self) -> usize {
        (self.last_variable_column_id as u32).saturating_sub(MAX_FIXED_COLUMN_ID) as usize
    }
}

/// A located column value: its bytes and, for tagged values, the flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordValue<'a> {
    data: &'a [u8],
    flags: Option<u8>,
}

impl<'a> RecordValue<'a> {
    pub fn new(data: &'a [u8], flags: Option<u8>) -> Self {
        Self { data, flags }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn flags(&self) -> Option<u8> {
        self.flags
    }

    fn has_flag(&self, flag: u8) -> bool {
        self.flags.is_some_and(|f| f & flag != 0)
    }

    /// The data is a long-value identifier, not the value itself.
    pub fn is_long_value(&self) -> bool {
        self.has_flag(value_flags::LONG_VALUE)
    }

    pub fn is_multi_value(&self) -> bool {
        self.has_flag(value_flags::MULTI_VALUE)
    }

    pub fn is_compressed(&self) -> bool {
        self.has_flag(value_flags::COMPRESSED)
    }
}

/// One slot per schema column, in schema order.
#[derive(Debug, Clone)]
pub struct DecodedRecord<'a> {
    row: &'a [u8],
    slots: Vec<Option<RecordValue<'a>>>,
}

impl<'a> DecodedRecord<'a> {
    pub fn row(&self) -> &'a [u8] {
        self.row
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn value(&self, index: usize) -> Option<RecordValue<'a>> {
        self.slots.get(index).copied().flatten()
    }

    pub fn is_present(&self, index: usize) -> bool {
        self.value(index).is_some()
    }

    pub fn slots(&self) -> &[Option<RecordValue<'a>>] {
        &self.slots
    }

    pub fn present_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

#[derive(Debug, Clone, Copy)]
struct TaggedEntry<'a> {
    column_id: u16,
    value: RecordValue<'a>,
}

type TaggedEntries<'a> = SmallVec<[TaggedEntry<'a>; 8]>;

#[derive(Debug, Clone)]
pub struct RecordDecoder {
    format: FormatOptions,
    span: Span,
}

impl RecordDecoder {
    pub fn new(ctx: &DecodeContext) -> Self {
        Self {
            format: ctx.format,
            span: ctx.span().clone(),
        }
    }

    pub fn with_format(format: FormatOptions) -> Self {
        Self {
            format,
            span: Span::none(),
        }
    }

    pub fn format(&self) -> &FormatOptions {
        &self.format
    }

    pub fn decode<'a>(&self, row: &'a [u8], schema: &RecordSchema) -> Result<DecodedRecord<'a>> {
        let _guard = self.span.enter();
        let header = RowHeader::parse(row)?;

        for column in schema.columns() {
            column.column_type()?;
        }
        if schema.template_count() > 0 {
            if let Some(first) = schema.own_columns().first() {
                if first.identifier != FIRST_TAGGED_COLUMN_ID {
                    return Err(EseError::UnsupportedFormat(format!(
                        "first column {} of a templated table is not {}",
                        first.identifier, FIRST_TAGGED_COLUMN_ID
                    ))
                    .into());
                }
            }
        }

        let (variable_spans, tagged_start) = variable_region(row, &header)?;
        let tagged: TaggedEntries<'a> = if schema.has_tagged_columns() {
            let region = &row[tagged_start..];
            if self.format.legacy_tagged_layout {
                linear_tagged_entries(region, tagged_start, row.len())?
            } else {
                indexed_tagged_entries(region, tagged_start, row.len(), self.format.extended_page_header)?
            }
        } else {
            TaggedEntries::new()
        };

        let mut slots = Vec::with_capacity(schema.len());
        for (index, column) in schema.columns().iter().enumerate() {
            let id = column.identifier;
            let slot = if id <= MAX_FIXED_COLUMN_ID {
                if id > header.last_fixed_column_id as u32 {
                    None
                } else {
                    let offset = schema.fixed_offset(index).unwrap_or(ROW_HEADER_SIZE);
                    let width = column.fixed_width();
                    let data = offset
                        .checked_add(width)
                        .filter(|&end| end <= row.len())
                        .map(|end| &row[offset..end])
                        .ok_or(EseError::TruncatedRow {
                            column_id: id,
                            offset,
                            size: width,
                            row_len: row.len(),
                        })?;
                    Some(RecordValue::new(data, None))
                }
            } else if id <= MAX_VARIABLE_COLUMN_ID {
                let slot = (id - FIRST_VARIABLE_COLUMN_ID) as usize;
                variable_spans
                    .get(slot)
                    .copied()
                    .flatten()
                    .map(|(start, end)| RecordValue::new(&row[start..end], None))
            } else {
                tagged
                    .iter()
                    .find(|entry| entry.column_id as u32 == id)
                    .map(|entry| entry.value)
            };

            if slot.is_none() {
                tracing::trace!(column_id = id, name = %column.name, "column absent");
            }
            slots.push(slot);
        }

        Ok(DecodedRecord { row, slots })
    }
}

/// Resolves variable column spans and returns them with the tagged region
/// start.
fn variable_region(row: &[u8], header: &RowHeader) -> Result<(SmallVec<[Option<(usize, usize)>; 16]>, usize)> {
    let count = header.variable_column_count();
    let table_offset = header.variable_offset as usize;
    let table_len = count * 2;

    if table_offset < ROW_HEADER_SIZE || table_offset + table_len > row.len() {
        return Err(EseError::TruncatedRow {
            column_id: FIRST_VARIABLE_COLUMN_ID,
            offset: table_offset,
            size: table_len,
            row_len: row.len(),
        }
        .into());
    }

    let payload = table_offset + table_len;
    let mut spans = SmallVec::with_capacity(count);
    let mut previous: u16 = 0;

    for i in 0..count {
        let column_id = FIRST_VARIABLE_COLUMN_ID + i as u32;
        let raw = read_u16(row, table_offset + i * 2, "variable offset table")?;
        if raw & VARIABLE_ABSENT_BIT != 0 {
            spans.push(None);
            continue;
        }
        let end = raw & VARIABLE_OFFSET_MASK;
        if end < previous {
            return Err(EseError::InconsistentVariableOffsets {
                column_id,
                previous,
                current: end,
            }
            .into());
        }
        let start = payload + previous as usize;
        let stop = payload + end as usize;
        if stop > row.len() {
            return Err(EseError::TruncatedRow {
                column_id,
                offset: start,
                size: (end - previous) as usize,
                row_len: row.len(),
            }
            .into());
        }
        spans.push(Some((start, stop)));
        previous = end;
    }

    Ok((spans, payload + previous as usize))
}

fn indexed_tagged_entries(
    region: &[u8],
    region_offset: usize,
    row_len: usize,
    extended: bool,
) -> Result<TaggedEntries<'_>> {
    let mut entries = TaggedEntries::new();
    if region.is_empty() {
        return Ok(entries);
    }
    if region.len() < TAGGED_ENTRY_SIZE {
        return Err(EseError::TruncatedRow {
            column_id: FIRST_TAGGED_COLUMN_ID,
            offset: region_offset,
            size: TAGGED_ENTRY_SIZE,
            row_len,
        }
        .into());
    }

    let mask = if extended {
        EXTENDED_TAGGED_OFFSET_MASK
    } else {
        TAGGED_OFFSET_MASK
    };
    let first_offset = read_u16(region, 2, "tagged offset table")?;
    let table_len = (first_offset & mask) as usize;
    let count = table_len / TAGGED_ENTRY_SIZE;
    if count == 0 {
        return Err(EseError::InconsistentTaggedOffsets {
            previous: 0,
            current: first_offset,
        }
        .into());
    }
    if count * TAGGED_ENTRY_SIZE > region.len() {
        return Err(EseError::TruncatedRow {
            column_id: read_u16(region, 0, "tagged offset table")? as u32,
            offset: region_offset,
            size: count * TAGGED_ENTRY_SIZE,
            row_len,
        }
        .into());
    }

    let mut table: SmallVec<[(u16, u16); 8]> = SmallVec::with_capacity(count);
    for i in 0..count {
        let column_id = read_u16(region, i * TAGGED_ENTRY_SIZE, "tagged offset table")?;
        let raw = read_u16(region, i * TAGGED_ENTRY_SIZE + 2, "tagged offset table")?;
        if let Some(&(_, previous)) = table.last() {
            if raw & mask < previous & mask {
                return Err(EseError::InconsistentTaggedOffsets {
                    previous,
                    current: raw,
                }
                .into());
            }
        }
        table.push((column_id, raw));
    }

    for (i, &(column_id, raw)) in table.iter().enumerate() {
        let start = (raw & mask) as usize;
        let end = table
            .get(i + 1)
            .map(|&(_, next)| (next & mask) as usize)
            .unwrap_or(region.len());
        // The last entry runs to the end of the region, so its start may lie past it.
        if end > region.len() || start > end {
            return Err(EseError::TruncatedRow {
                column_id: column_id as u32,
                offset: region_offset + start,
                size: end.saturating_sub(start),
                row_len,
            }
            .into());
        }

        let span = &region[start..end];
        let has_flags = extended || raw & TAGGED_HAS_FLAGS_BIT != 0;
        let value = match span.split_first() {
            Some((&flags, data)) if has_flags => RecordValue::new(data, Some(flags)),
            _ => RecordValue::new(span, None),
        };
        entries.push(TaggedEntry { column_id, value });
    }

    Ok(entries)
}

fn linear_tagged_entries(region: &[u8], region_offset: usize, row_len: usize) -> Result<TaggedEntries<'_>> {
    let mut entries = TaggedEntries::new();
    let mut pos = 0usize;

    while pos < region.len() {
        if region.len() - pos < TAGGED_ENTRY_SIZE {
            return Err(EseError::TruncatedRow {
                column_id: FIRST_TAGGED_COLUMN_ID,
                offset: region_offset + pos,
                size: TAGGED_ENTRY_SIZE,
                row_len,
            }
            .into());
        }
        let column_id = read_u16(region, pos, "linear tagged entry")?;
        let raw_size = read_u16(region, pos + 2, "linear tagged entry")?;
        pos += TAGGED_ENTRY_SIZE;

        let has_flags = raw_size & LINEAR_TAGGED_HAS_FLAGS_BIT != 0;
        let size = if has_flags {
            (raw_size & LINEAR_TAGGED_SIZE_MASK) as usize
        } else {
            raw_size as usize
        };
        if pos + size > region.len() || (has_flags && size == 0) {
            return Err(EseError::TruncatedRow {
                column_id: column_id as u32,
                offset: region_offset + pos,
                size,
                row_len,
            }
            .into());
        }

        let span = &region[pos..pos + size];
        let value = match span.split_first() {
            Some((&flags, data)) if has_flags => RecordValue::new(data, Some(flags)),
            _ => RecordValue::new(span, None),
        };
        entries.push(TaggedEntry { column_id, value });
        pos += size;
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ese_error;
    use crate::records::schema::SchemaEntry;
    use crate::records::types::ColumnType;

    fn schema() -> RecordSchema {
        RecordSchema::new(vec![
            SchemaEntry::column(1, ColumnType::Int32, "id"),
            SchemaEntry::column(2, ColumnType::Int16, "small"),
            SchemaEntry::column(128, ColumnType::Text, "name"),
            SchemaEntry::column(129, ColumnType::Binary, "blob"),
            SchemaEntry::column(256, ColumnType::LargeText, "note"),
            SchemaEntry::column(257, ColumnType::LargeBinary, "data"),
        ])
    }

    #[test]
    fn row_header_reads_three_fields() {
        let header = RowHeader::parse(&[2, 129, 0x0a, 0x00]).unwrap();

        assert_eq!(header.last_fixed_column_id, 2);
        assert_eq!(header.last_variable_column_id, 129);
        assert_eq!(header.variable_offset, 10);
        assert_eq!(header.variable_column_count(), 2);
    }

    #[test]
    fn short_row_is_truncated() {
        let err = RecordDecoder::with_format(FormatOptions::default())
            .decode(&[1, 2], &schema())
            .unwrap_err();

        assert!(matches!(ese_error(&err), Some(EseError::TruncatedRow { .. })));
    }

    #[test]
    fn fixed_columns_beyond_last_fixed_are_absent() {
        let row = [1u8, 127, 0x08, 0x00, 7, 0, 0, 0];
        let record = RecordDecoder::with_format(FormatOptions::default())
            .decode(&row, &schema())
            .unwrap();

        assert_eq!(record.len(), 6);
        assert_eq!(record.value(0).unwrap().data(), &[7, 0, 0, 0]);
        assert!(!record.is_present(1));
        assert!(!record.is_present(2));
        assert_eq!(record.present_count(), 1);
    }

    #[test]
    fn fixed_column_past_row_end_is_truncated() {
        let row = [2u8, 127, 0x08, 0x00, 7, 0, 0, 0];
        let err = RecordDecoder::with_format(FormatOptions::default())
            .decode(&row, &schema())
            .unwrap_err();

        assert_eq!(
            ese_error(&err),
            Some(&EseError::TruncatedRow {
                column_id: 2,
                offset: 8,
                size: 2,
                row_len: 8
            })
        );
    }

    #[test]
    fn linear_tagged_entries_carry_flags() {
        let region = [
            0x00, 0x01, 0x02, 0x00, b'h', b'i', // 256, no flags
            0x01, 0x01, 0x03, 0x80, 0x04, 0x2a, 0x00, // 257, flags 0x04
        ];
        let entries = linear_tagged_entries(&region, 0, region.len()).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].column_id, 256);
        assert_eq!(entries[0].value.data(), b"hi");
        assert_eq!(entries[1].value.flags(), Some(0x04));
        assert_eq!(entries[1].value.data(), &[0x2a, 0x00]);
        assert!(entries[1].value.is_long_value());
    }

    #[test]
    fn linear_entry_overrunning_region_is_truncated() {
        let region = [0x00, 0x01, 0x09, 0x00, b'h'];

        assert!(linear_tagged_entries(&region, 0, region.len()).is_err());
    }

    #[test]
    fn extended_index_entries_always_start_with_flags() {
        let region = [0x00, 0x01, 0x04, 0x00, 0x08, b'x', b'y'];
        let entries = indexed_tagged_entries(&region, 0, region.len(), true).unwrap();

        assert_eq!(entries[0].value.flags(), Some(0x08));
        assert_eq!(entries[0].value.data(), b"xy");
        assert!(entries[0].value.is_multi_value());
    }

    #[test]
    fn legacy_index_entries_need_flag_bit() {
        let region = [
            0x00, 0x01, 0x08, 0x00, // 256 at 8, no flags
            0x01, 0x01, 0x0a, 0x40, // 257 at 10, flags byte
            b'a', b'b', 0x02, b'z',
        ];
        let entries = indexed_tagged_entries(&region, 0, region.len(), false).unwrap();

        assert_eq!(entries[0].value, RecordValue::new(b"ab", None));
        assert_eq!(entries[1].value, RecordValue::new(b"z", Some(0x02)));
        assert!(entries[1].value.is_compressed());
    }

    #[test]
    fn zero_first_tagged_offset_is_rejected() {
        let region = [0x00, 0x01, 0x00, 0x00, b'a'];

        assert!(indexed_tagged_entries(&region, 0, region.len(), false).is_err());
    }
}
