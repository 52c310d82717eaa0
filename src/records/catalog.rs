//! # Catalog
//!
//! The catalog table (`MSysObjects`, rooted at page 4) lists every table
//! together with its columns, indexes, long-value tree and callbacks. Rows
//! are ordered by owning table, so one scan of the catalog leaves yields
//! complete table definitions.
//!
//! ```text
//! catalog leaf values ──decode──> SchemaEntry ──group by owner──> TableDefinition
//!                                                                    │
//!                          template_name ──resolve by name──> template_columns
//! ```
//!
//! Catalog rows are decoded with the ordinary record decoder against a
//! built-in schema. A row that fails to decode is logged and skipped so
//! that one damaged entry does not hide the rest of the database.

use eyre::Result;

use crate::btree::TreeNavigator;
use crate::config::{
    DecodeContext, CATALOG_DEFAULT_VALUE_COLUMN, CATALOG_MAX_LAST_FIXED, CATALOG_MIN_LAST_FIXED,
    CATALOG_NAME_COLUMN, CATALOG_ROOT_PAGE, CATALOG_TEMPLATE_COLUMN, CODEPAGE_WINDOWS_1252,
};
use crate::error::EseError;
use crate::records::codepage::decode_narrow;
use crate::records::decoder::{DecodedRecord, RecordDecoder, RowHeader};
use crate::records::schema::{RecordSchema, SchemaEntry, SchemaEntryKind};
use crate::records::types::ColumnType;
use crate::records::value::{to_u16, to_u32};
use crate::storage::PageSource;

const OBJECT_ID_SLOT: usize = 0;
const TYPE_SLOT: usize = 1;
const IDENTIFIER_SLOT: usize = 2;
const UNION_SLOT: usize = 3;
const SPACE_USAGE_SLOT: usize = 4;
const FLAGS_SLOT: usize = 5;
const PAGES_OR_LOCALE_SLOT: usize = 6;
const NAME_SLOT: usize = 12;
const TEMPLATE_SLOT: usize = 14;
const DEFAULT_VALUE_SLOT: usize = 15;

/// Column layout of the catalog table itself.
pub fn catalog_schema() -> RecordSchema {
    RecordSchema::new(vec![
        SchemaEntry::column(1, ColumnType::Int32, "ObjidTable"),
        SchemaEntry::column(2, ColumnType::Int16, "Type"),
        SchemaEntry::column(3, ColumnType::Int32, "Id"),
        SchemaEntry::column(4, ColumnType::Int32, "ColtypOrPgnoFDP"),
        SchemaEntry::column(5, ColumnType::Int32, "SpaceUsage"),
        SchemaEntry::column(6, ColumnType::Int32, "Flags"),
        SchemaEntry::column(7, ColumnType::Int32, "PagesOrLocale"),
        SchemaEntry::column(8, ColumnType::Boolean, "RootFlag"),
        SchemaEntry::column(9, ColumnType::Int16, "RecordOffset"),
        SchemaEntry::column(10, ColumnType::Int32, "LCMapFlags"),
        SchemaEntry::column(11, ColumnType::UInt16, "KeyMost"),
        SchemaEntry::column(12, ColumnType::Int32, "LVChunkMax"),
        SchemaEntry::column(CATALOG_NAME_COLUMN, ColumnType::Text, "Name"),
        SchemaEntry::column(129, ColumnType::Binary, "Stats"),
        SchemaEntry::column(CATALOG_TEMPLATE_COLUMN, ColumnType::Text, "TemplateTable"),
        SchemaEntry::column(CATALOG_DEFAULT_VALUE_COLUMN, ColumnType::Binary, "DefaultValue"),
    ])
}

/// Decodes one catalog row into a schema entry.
pub fn decode_catalog_entry(row: &[u8], schema: &RecordSchema, decoder: &RecordDecoder) -> Result<SchemaEntry> {
    let header = RowHeader::parse(row)?;
    if !(CATALOG_MIN_LAST_FIXED..=CATALOG_MAX_LAST_FIXED).contains(&header.last_fixed_column_id) {
        return Err(EseError::UnsupportedFormat(format!(
            "catalog row with last fixed column {}",
            header.last_fixed_column_id
        ))
        .into());
    }

    let record = decoder.decode(row, schema)?;
    let u32_at = |slot: usize| -> Result<u32> {
        match record.value(slot) {
            Some(value) => to_u32(value.data()),
            None => Ok(0),
        }
    };

    let type_code = match record.value(TYPE_SLOT) {
        Some(value) => to_u16(value.data())?,
        None => 0,
    };
    let kind = SchemaEntryKind::from_catalog(type_code, u32_at(UNION_SLOT)?, u32_at(PAGES_OR_LOCALE_SLOT)?)?;

    Ok(SchemaEntry {
        identifier: u32_at(IDENTIFIER_SLOT)?,
        father_data_page_object_identifier: u32_at(OBJECT_ID_SLOT)?,
        kind,
        size: u32_at(SPACE_USAGE_SLOT)?,
        flags: u32_at(FLAGS_SLOT)?,
        name: catalog_text(&record, NAME_SLOT)?.unwrap_or_default(),
        template_name: catalog_text(&record, TEMPLATE_SLOT)?.filter(|name| !name.is_empty()),
        default_value: record.value(DEFAULT_VALUE_SLOT).map(|v| v.data().to_vec()),
    })
}

fn catalog_text(record: &DecodedRecord<'_>, slot: usize) -> Result<Option<String>> {
    match record.value(slot) {
        Some(value) => {
            let text = decode_narrow(value.data(), CODEPAGE_WINDOWS_1252)?;
            Ok(Some(text.trim_end_matches('\0').to_string()))
        }
        None => Ok(None),
    }
}

#[derive(Debug, Clone)]
pub struct TableDefinition {
    pub table: SchemaEntry,
    pub columns: Vec<SchemaEntry>,
    pub indexes: Vec<SchemaEntry>,
    pub long_value: Option<SchemaEntry>,
    pub callback: Option<SchemaEntry>,
    pub template_columns: Vec<SchemaEntry>,
}

impl TableDefinition {
    pub fn new(table: SchemaEntry) -> Self {
        Self {
            table,
            columns: Vec::new(),
            indexes: Vec::new(),
            long_value: None,
            callback: None,
            template_columns: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.table.name
    }

    pub fn identifier(&self) -> u32 {
        self.table.identifier
    }

    pub fn father_data_page_number(&self) -> u32 {
        self.table.kind.union_value()
    }

    pub fn long_value_page_number(&self) -> Option<u32> {
        self.long_value.as_ref().and_then(SchemaEntry::father_data_page_number)
    }

    pub fn template_name(&self) -> Option<&str> {
        self.table.template_name.as_deref()
    }

    /// Template columns followed by the table's own columns.
    pub fn record_schema(&self) -> RecordSchema {
        RecordSchema::with_template(self.template_columns.clone(), self.columns.clone())
    }

    pub fn column(&self, name: &str) -> Option<&SchemaEntry> {
        self.template_columns
            .iter()
            .chain(self.columns.iter())
            .find(|c| c.name == name)
    }

    fn add(&mut self, entry: SchemaEntry) {
        match entry.kind {
            SchemaEntryKind::Table { .. } => {}
            SchemaEntryKind::Column { .. } => self.columns.push(entry),
            SchemaEntryKind::Index { .. } => self.indexes.push(entry),
            SchemaEntryKind::LongValue { .. } => self.long_value = Some(entry),
            SchemaEntryKind::Callback => self.callback = Some(entry),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: Vec<TableDefinition>,
}

impl Catalog {
    /// Scans the catalog tree and builds table definitions.
    pub fn load<S: PageSource + ?Sized>(source: &S, ctx: &DecodeContext) -> Result<Self> {
        let _entered = ctx.span().enter();
        let navigator = TreeNavigator::new(source, ctx);
        let decoder = RecordDecoder::new(ctx);
        let schema = catalog_schema();

        let mut entries = Vec::new();
        for value in navigator.leaf_values(CATALOG_ROOT_PAGE)? {
            let value = value?;
            match decode_catalog_entry(value.data(), &schema, &decoder) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    let location = value.location();
                    tracing::warn!(
                        page = location.page_number,
                        tag = location.tag_index,
                        error = %err,
                        "skipping undecodable catalog entry"
                    );
                }
            }
        }

        let catalog = Self::from_entries(entries);
        tracing::debug!(tables = catalog.tables.len(), "catalog loaded");
        Ok(catalog)
    }

    /// Groups entries in catalog order and resolves templates by name.
    pub fn from_entries(entries: Vec<SchemaEntry>) -> Self {
        let mut tables: Vec<TableDefinition> = Vec::new();

        for entry in entries {
            if let SchemaEntryKind::Table { .. } = entry.kind {
                tables.push(TableDefinition::new(entry));
                continue;
            }
            let owner = entry.father_data_page_object_identifier;
            match tables.iter_mut().rev().find(|t| t.identifier() == owner) {
                Some(table) => table.add(entry),
                None => tracing::warn!(
                    owner,
                    name = %entry.name,
                    "catalog entry has no owning table"
                ),
            }
        }

        for i in 0..tables.len() {
            let Some(template) = tables[i].template_name().map(str::to_owned) else {
                continue;
            };
            let columns = tables
                .iter()
                .find(|t| t.name() == template)
                .map(|t| t.columns.clone());
            match columns {
                Some(columns) => tables[i].template_columns = columns,
                None => tracing::warn!(
                    table = %tables[i].name(),
                    template = %template,
                    "template table not found"
                ),
            }
        }

        Self { tables }
    }

    pub fn tables(&self) -> &[TableDefinition] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.name() == name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
