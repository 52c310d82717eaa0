//! # Tables and Records
//!
//! A [`Table`] is a borrowed handle on one catalog table: its definition,
//! its record schema and the database pages. Records are read from the
//! table's tree (rooted at the table's father data page) in key order.
//!
//! ```ignore
//! let table = db.table("Users").ok_or_else(|| eyre!("no Users table"))?;
//! for record in table.records()? {
//!     let record = record?;
//!     let name = record.get_text_opt(1)?;
//!     if let Some(photo) = table.long_value(&record, 3)? {
//!         let bytes = photo.read_all()?;
//!     }
//! }
//! ```
//!
//! A row that fails to decode is returned as an `Err` item; iteration may
//! continue past it.

use std::ops::Deref;

use eyre::Result;

use super::builder::DynPageSource;
use super::database::Database;
use crate::btree::{LeafValues, TreeNavigator, TreeValue, ValueLocation};
use crate::encoding::Key;
use crate::error::EseError;
use crate::records::{
    LongValueAssembler, LongValueHandle, LongValueKey, MultiValue, RecordDecoder, RecordSchema, RecordView,
    TableDefinition, WindowsCodepages,
};

#[derive(Clone, Copy)]
pub struct Table<'db> {
    db: &'db Database,
    definition: &'db TableDefinition,
    schema: &'db RecordSchema,
}

impl<'db> Table<'db> {
    pub(crate) fn new(db: &'db Database, definition: &'db TableDefinition, schema: &'db RecordSchema) -> Self {
        Self { db, definition, schema }
    }

    pub fn name(&self) -> &'db str {
        self.definition.name()
    }

    pub fn definition(&self) -> &'db TableDefinition {
        self.definition
    }

    pub fn schema(&self) -> &'db RecordSchema {
        self.schema
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.position(name)
    }

    fn navigator(&self) -> TreeNavigator<'db, DynPageSource> {
        TreeNavigator::new(self.db.page_source(), self.db.context())
    }

    /// All records in key order.
    pub fn records(&self) -> Result<Records<'db>> {
        let root = self.definition.father_data_page_number();
        let values = self.navigator().leaf_values(root)?;
        tracing::debug!(table = %self.name(), root, "scanning table");
        Ok(Records {
            values,
            decoder: RecordDecoder::new(self.db.context()),
            schema: self.schema,
            codepages: self.db.codepages(),
        })
    }

    /// Looks a record up by its full tree key. A miss is `Ok(None)`.
    pub fn find_record(&self, key: &[u8]) -> Result<Option<Record<'db>>> {
        let root = self.definition.father_data_page_number();
        match self.navigator().find_leaf(root, key, false)? {
            Some(value) => {
                let decoder = RecordDecoder::new(self.db.context());
                Record::decode(value, &decoder, self.schema, self.db.codepages()).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Opens the long value referenced by a long-value-flagged column.
    ///
    /// Returns `Ok(None)` when the column is absent or the long-value tree
    /// has no anchor for the referenced identifier.
    pub fn long_value(&self, record: &Record<'db>, column_index: usize) -> Result<Option<LongValueHandle<'db>>> {
        let Some(value) = record.value(column_index)? else {
            return Ok(None);
        };
        if !value.is_long_value() {
            return Err(EseError::InvalidArgument(format!(
                "column {} is not stored in the long-value tree",
                column_index
            ))
            .into());
        }
        let root = self.definition.long_value_page_number().ok_or_else(|| {
            EseError::InvalidArgument(format!("table '{}' has no long-value tree", self.name()))
        })?;

        let key = LongValueKey::from_record(value.data())?;
        LongValueAssembler::new(self.db.page_source(), self.db.context(), root).open(&key)
    }

    /// Splits a multi-valued column. `Ok(None)` when the column is absent.
    pub fn multi_value(&self, record: &Record<'db>, column_index: usize) -> Result<Option<MultiValue<'db>>> {
        let Some(value) = record.value(column_index)? else {
            return Ok(None);
        };
        let flags = value.flags().ok_or_else(|| {
            EseError::InvalidArgument(format!("column {} carries no value flags", column_index))
        })?;
        MultiValue::parse(value.data(), flags).map(Some)
    }
}

impl std::fmt::Debug for Table<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name())
            .field("columns", &self.schema.len())
            .finish()
    }
}

/// One decoded row together with its tree key and location.
#[derive(Debug, Clone)]
pub struct Record<'db> {
    key: Key,
    location: ValueLocation,
    view: RecordView<'db>,
}

impl<'db> Record<'db> {
    fn decode(
        value: TreeValue<'db>,
        decoder: &RecordDecoder,
        schema: &'db RecordSchema,
        codepages: WindowsCodepages,
    ) -> Result<Self> {
        let record = decoder.decode(value.data(), schema)?;
        Ok(Self {
            key: value.key().clone(),
            location: value.location(),
            view: RecordView::new(record, schema).with_codepages(codepages),
        })
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn location(&self) -> ValueLocation {
        self.location
    }

    pub fn view(&self) -> &RecordView<'db> {
        &self.view
    }
}

impl<'db> Deref for Record<'db> {
    type Target = RecordView<'db>;

    fn deref(&self) -> &Self::Target {
        &self.view
    }
}

/// Iterator over a table's records in key order.
pub struct Records<'db> {
    values: LeafValues<'db, DynPageSource>,
    decoder: RecordDecoder,
    schema: &'db RecordSchema,
    codepages: WindowsCodepages,
}

impl<'db> Iterator for Records<'db> {
    type Item = Result<Record<'db>>;

    fn next(&mut self) -> Option<Self::Item> {
        let value = match self.values.next()? {
            Ok(value) => value,
            Err(err) => return Some(Err(err)),
        };
        let location = value.location();
        let record = Record::decode(value, &self.decoder, self.schema, self.codepages);
        if let Err(err) = &record {
            tracing::warn!(
                page = location.page_number,
                tag = location.tag_index,
                error = %err,
                "record failed to decode"
            );
        }
        Some(record)
    }
}
