//! # RecordView - Typed Column Access
//!
//! A [`RecordView`] pairs a decoded record with its schema and converts
//! column spans on request. Getters come in pairs: `get_int32` fails when
//! the column is absent, `get_int32_opt` returns `None` instead.
//!
//! ```ignore
//! let view = RecordView::new(record, &schema);
//! let id: i32 = view.get_int32(0)?;
//! let name: Option<String> = view.get_text_opt(2)?;
//! ```
//!
//! Values flagged as stored in the long-value tree cannot be read from the
//! row; open them through `Table::long_value`. Compressed text and binary
//! values are decompressed by `get_text` and `get_binary`.

use std::borrow::Cow;

use eyre::Result;

use crate::encoding::compression::{decompress, decompress_text};
use crate::error::EseError;
use crate::records::codepage::WindowsCodepages;
use crate::records::decoder::{DecodedRecord, RecordValue};
use crate::records::schema::{RecordSchema, SchemaEntry};
use crate::records::value::{self, ColumnValue, FileTime, Guid};

#[derive(Debug, Clone)]
pub struct RecordView<'a> {
    record: DecodedRecord<'a>,
    schema: &'a RecordSchema,
    codepages: WindowsCodepages,
}

impl<'a> RecordView<'a> {
    pub fn new(record: DecodedRecord<'a>, schema: &'a RecordSchema) -> Self {
        Self {
            record,
            schema,
            codepages: WindowsCodepages::default(),
        }
    }

    pub fn with_codepages(mut self, codepages: WindowsCodepages) -> Self {
        self.codepages = codepages;
        self
    }

    pub fn record(&self) -> &DecodedRecord<'a> {
        &self.record
    }

    pub fn schema(&self) -> &'a RecordSchema {
        self.schema
    }

    pub fn column_count(&self) -> usize {
        self.record.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.position(name)
    }

    pub fn column(&self, index: usize) -> Result<&'a SchemaEntry> {
        self.schema.column(index).ok_or_else(|| {
            EseError::InvalidArgument(format!(
                "column index {} out of range for {} columns",
                index,
                self.schema.len()
            ))
            .into()
        })
    }

    /// The located value of a column, `None` when absent.
    pub fn value(&self, index: usize) -> Result<Option<RecordValue<'a>>> {
        self.column(index)?;
        Ok(self.record.value(index))
    }

    pub fn is_present(&self, index: usize) -> bool {
        self.record.is_present(index)
    }

    pub fn is_long_value(&self, index: usize) -> bool {
        self.record.value(index).is_some_and(|v| v.is_long_value())
    }

    pub fn is_multi_value(&self, index: usize) -> bool {
        self.record.value(index).is_some_and(|v| v.is_multi_value())
    }

    column_getters! {
        bool: bool => value::to_bool,
        uint8: u8 => value::to_u8,
        int16: i16 => value::to_i16,
        uint16: u16 => value::to_u16,
        int32: i32 => value::to_i32,
        uint32: u32 => value::to_u32,
        int64: i64 => value::to_i64,
        currency: i64 => value::to_i64,
        float32: f32 => value::to_f32,
        float64: f64 => value::to_f64,
        datetime: FileTime => value::to_filetime,
        guid: Guid => value::to_guid,
    }

    pub fn get_text_opt(&self, index: usize) -> Result<Option<String>> {
        let column = self.column(index)?;
        let Some(value) = self.record.value(index) else {
            return Ok(None);
        };
        self.reject_long_value(index, &value)?;
        if value.is_compressed() {
            return decompress_text(value.data()).map(Some);
        }
        value::to_text(value.data(), column.codepage(), &self.codepages).map(Some)
    }

    pub fn get_text(&self, index: usize) -> Result<String> {
        self.get_text_opt(index)?.ok_or_else(|| self.absent(index))
    }

    pub fn get_binary_opt(&self, index: usize) -> Result<Option<Cow<'a, [u8]>>> {
        self.column(index)?;
        let Some(value) = self.record.value(index) else {
            return Ok(None);
        };
        self.reject_long_value(index, &value)?;
        if value.is_compressed() {
            return decompress(value.data()).map(|bytes| Some(Cow::Owned(bytes)));
        }
        Ok(Some(Cow::Borrowed(value.data())))
    }

    pub fn get_binary(&self, index: usize) -> Result<Cow<'a, [u8]>> {
        self.get_binary_opt(index)?.ok_or_else(|| self.absent(index))
    }

    /// Converts a column according to its declared type.
    pub fn get_value(&self, index: usize) -> Result<ColumnValue<'a>> {
        let column = self.column(index)?;
        let column_type = column.column_type()?;
        if column_type.is_text() {
            return Ok(self.get_text_opt(index)?.map_or(ColumnValue::Null, ColumnValue::Text));
        }
        if column_type.is_binary() {
            return Ok(self.get_binary_opt(index)?.map_or(ColumnValue::Null, ColumnValue::Binary));
        }
        match self.inline_value(index)? {
            Some(data) => value::decode_value(column_type, data, column.codepage(), &self.codepages),
            None => Ok(ColumnValue::Null),
        }
    }

    fn inline_value(&self, index: usize) -> Result<Option<&'a [u8]>> {
        self.column(index)?;
        match self.record.value(index) {
            Some(value) => {
                self.reject_long_value(index, &value)?;
                if value.is_compressed() {
                    return Err(EseError::UnsupportedFormat(format!(
                        "column {} is compressed and not text or binary",
                        index
                    ))
                    .into());
                }
                Ok(Some(value.data()))
            }
            None => Ok(None),
        }
    }

    fn reject_long_value(&self, index: usize, value: &RecordValue<'a>) -> Result<()> {
        if value.is_long_value() {
            return Err(EseError::UnsupportedFormat(format!(
                "column {} is stored in the long-value tree",
                index
            ))
            .into());
        }
        Ok(())
    }

    fn absent(&self, index: usize) -> eyre::Report {
        let name = self.schema.column(index).map(|c| c.name.as_str()).unwrap_or("?");
        EseError::InvalidArgument(format!("column {} ({}) is absent", index, name)).into()
    }
}
