//! # Schema Entries
//!
//! Every row of the catalog table describes one object: a table, one of its
//! columns, an index, its long-value tree or a callback. Rows share a layout
//! whose fourth fixed column is a union selected by the row's `type` field,
//! so the decoded form is a [`SchemaEntry`] carrying a [`SchemaEntryKind`].
//!
//! ## Catalog Row Fields
//!
//! ```text
//! fixed  1  u32  father data page object id (owning table)
//! fixed  2  u16  type: 1 table, 2 column, 3 index, 4 long value, 5 callback
//! fixed  3  u32  identifier
//! fixed  4  u32  union: column type | father data page number
//! fixed  5  u32  space usage (column size)
//! fixed  6  u32  flags
//! fixed  7  u32  union: codepage | locale | initial page count
//! var  128       name
//! var  130       template table name
//! var  131       default value
//! ```
//!
//! A [`RecordSchema`] is the ordered column list a row is decoded against:
//! template columns first, then the table's own columns. Fixed column
//! offsets are precomputed at construction.

use eyre::Result;

use crate::config::{column_flags, FIRST_TAGGED_COLUMN_ID, MAX_FIXED_COLUMN_ID, ROW_HEADER_SIZE};
use crate::error::EseError;
use crate::records::types::ColumnType;

pub const CATALOG_TYPE_TABLE: u16 = 1;
pub const CATALOG_TYPE_COLUMN: u16 = 2;
pub const CATALOG_TYPE_INDEX: u16 = 3;
pub const CATALOG_TYPE_LONG_VALUE: u16 = 4;
pub const CATALOG_TYPE_CALLBACK: u16 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaEntryKind {
    Table { father_data_page_number: u32 },
    /// `column_type` is the raw catalog code; it is validated when a row is
    /// decoded so that one odd column does not hide the whole table.
    Column { column_type: u32, codepage: u32 },
    Index { father_data_page_number: u32, locale: u32 },
    LongValue { father_data_page_number: u32 },
    Callback,
}

impl SchemaEntryKind {
    /// Selects the variant from the catalog `type` field and its two unions.
    pub fn from_catalog(type_code: u16, union_value: u32, pages_or_locale: u32) -> Result<Self> {
        let kind = match type_code {
            CATALOG_TYPE_TABLE => SchemaEntryKind::Table {
                father_data_page_number: union_value,
            },
            CATALOG_TYPE_COLUMN => SchemaEntryKind::Column {
                column_type: union_value,
                codepage: pages_or_locale,
            },
            CATALOG_TYPE_INDEX => SchemaEntryKind::Index {
                father_data_page_number: union_value,
                locale: pages_or_locale,
            },
            CATALOG_TYPE_LONG_VALUE => SchemaEntryKind::LongValue {
                father_data_page_number: union_value,
            },
            CATALOG_TYPE_CALLBACK => SchemaEntryKind::Callback,
            other => {
                return Err(EseError::UnsupportedFormat(format!(
                    "catalog entry type {}",
                    other
                ))
                .into())
            }
        };
        Ok(kind)
    }

    pub fn type_code(&self) -> u16 {
        match self {
            SchemaEntryKind::Table { .. } => CATALOG_TYPE_TABLE,
            SchemaEntryKind::Column { .. } => CATALOG_TYPE_COLUMN,
            SchemaEntryKind::Index { .. } => CATALOG_TYPE_INDEX,
            SchemaEntryKind::LongValue { .. } => CATALOG_TYPE_LONG_VALUE,
            SchemaEntryKind::Callback => CATALOG_TYPE_CALLBACK,
        }
    }

    /// The raw value of the fourth catalog column.
    pub fn union_value(&self) -> u32 {
        match *self {
            SchemaEntryKind::Table {
                father_data_page_number,
            }
            | SchemaEntryKind::Index {
                father_data_page_number,
                ..
            }
            | SchemaEntryKind::LongValue {
                father_data_page_number,
            } => father_data_page_number,
            SchemaEntryKind::Column { column_type, .. } => column_type,
            SchemaEntryKind::Callback => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    pub identifier: u32,
    pub father_data_page_object_identifier: u32,
    pub kind: SchemaEntryKind,
    pub size: u32,
    pub flags: u32,
    pub name: String,
    pub template_name: Option<String>,
    pub default_value: Option<Vec<u8>>,
}

impl SchemaEntry {
    pub fn new(identifier: u32, kind: SchemaEntryKind, name: impl Into<String>) -> Self {
        Self {
            identifier,
            father_data_page_object_identifier: 0,
            kind,
            size: 0,
            flags: 0,
            name: name.into(),
            template_name: None,
            default_value: None,
        }
    }

    pub fn column(identifier: u32, column_type: ColumnType, name: impl Into<String>) -> Self {
        Self::new(
            identifier,
            SchemaEntryKind::Column {
                column_type: column_type.code(),
                codepage: 0,
            },
            name,
        )
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_codepage(mut self, codepage: u32) -> Self {
        if let SchemaEntryKind::Column { codepage: cp, .. } = &mut self.kind {
            *cp = codepage;
        }
        self
    }

    pub fn with_owner(mut self, object_identifier: u32) -> Self {
        self.father_data_page_object_identifier = object_identifier;
        self
    }

    pub fn with_template_name(mut self, template_name: impl Into<String>) -> Self {
        self.template_name = Some(template_name.into());
        self
    }

    pub fn is_column(&self) -> bool {
        matches!(self.kind, SchemaEntryKind::Column { .. })
    }

    pub fn column_type(&self) -> Result<ColumnType> {
        match self.kind {
            SchemaEntryKind::Column { column_type, .. } => ColumnType::from_code(column_type),
            _ => Err(EseError::InvalidArgument(format!("{} is not a column", self.name)).into()),
        }
    }

    /// Declared codepage of a text column; 0 means the database default.
    pub fn codepage(&self) -> u32 {
        match self.kind {
            SchemaEntryKind::Column { codepage, .. } => codepage,
            _ => 0,
        }
    }

    pub fn father_data_page_number(&self) -> Option<u32> {
        match self.kind {
            SchemaEntryKind::Table {
                father_data_page_number,
            }
            | SchemaEntryKind::Index {
                father_data_page_number,
                ..
            }
            | SchemaEntryKind::LongValue {
                father_data_page_number,
            } => Some(father_data_page_number),
            _ => None,
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.identifier <= MAX_FIXED_COLUMN_ID
    }

    pub fn is_tagged(&self) -> bool {
        self.identifier >= FIRST_TAGGED_COLUMN_ID
    }

    pub fn is_templated(&self) -> bool {
        self.flags & column_flags::TEMPLATE_COLUMN != 0
    }

    pub fn is_multi_valued(&self) -> bool {
        self.flags & column_flags::MULTI_VALUED != 0
    }

    /// Bytes a fixed column occupies: the declared size, or the type's width
    /// when the catalog leaves the size at zero.
    pub fn fixed_width(&self) -> usize {
        if self.size != 0 {
            return self.size as usize;
        }
        self.column_type()
            .ok()
            .and_then(ColumnType::fixed_size)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordSchema {
    columns: Vec<SchemaEntry>,
    template_count: usize,
    fixed_offsets: Vec<Option<usize>>,
}

impl RecordSchema {
    pub fn new(columns: Vec<SchemaEntry>) -> Self {
        Self::with_template(Vec::new(), columns)
    }

    /// Builds the concatenated ordering used by tables derived from a
    /// template: template columns occupy the first slots.
    pub fn with_template(template_columns: Vec<SchemaEntry>, columns: Vec<SchemaEntry>) -> Self {
        let template_count = template_columns.len();
        let mut all = template_columns;
        all.extend(columns);

        let mut fixed_offsets = Vec::with_capacity(all.len());
        let mut offset = ROW_HEADER_SIZE;
        for column in &all {
            if column.is_fixed() {
                fixed_offsets.push(Some(offset));
                offset += column.fixed_width();
            } else {
                fixed_offsets.push(None);
            }
        }

        Self {
            columns: all,
            template_count,
            fixed_offsets,
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn template_count(&self) -> usize {
        self.template_count
    }

    pub fn columns(&self) -> &[SchemaEntry] {
        &self.columns
    }

    pub fn own_columns(&self) -> &[SchemaEntry] {
        &self.columns[self.template_count..]
    }

    pub fn column(&self, index: usize) -> Option<&SchemaEntry> {
        self.columns.get(index)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Row offset of a fixed column, `None` for variable and tagged columns.
    pub fn fixed_offset(&self, index: usize) -> Option<usize> {
        self.fixed_offsets.get(index).copied().flatten()
    }

    pub fn has_tagged_columns(&self) -> bool {
        self.columns.iter().any(SchemaEntry::is_tagged)
    }
}
