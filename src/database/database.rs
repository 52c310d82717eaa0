//! # Database
//!
//! The read-only entry point. Opening a database maps the file (or takes a
//! caller's page source), derives the layout switches from the file header,
//! and loads the catalog once. Record schemas for every table are built at
//! open time so that [`Table`] handles only borrow.
//!
//! ```text
//! Database
//!   ├── Box<dyn PageSource>      pages, optionally checksum-verified
//!   ├── DecodeContext            format switches, default codepage, span
//!   ├── Catalog                  TableDefinition per table, catalog order
//!   └── Vec<RecordSchema>        one per TableDefinition, same order
//! ```
//!
//! ## Thread Safety
//!
//! `Database` is `Send + Sync`: the page source is required to be, and
//! nothing is mutated after open. Table handles and records borrow the
//! database and the pages behind it.

use std::path::Path;

use eyre::Result;

use super::builder::{DatabaseBuilder, DynPageSource};
use super::table::Table;
use crate::config::{DecodeContext, FormatOptions};
use crate::records::{Catalog, RecordSchema, TableDefinition, WindowsCodepages};
use crate::storage::{DatabaseState, FileHeader};

/// Header fields of an opened file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub format_version: u32,
    pub format_revision: u32,
    pub creation_format_version: u32,
    pub creation_format_revision: u32,
    pub page_size: u32,
    pub file_type: u32,
    pub state: DatabaseState,
}

impl DatabaseInfo {
    pub fn from_header(header: &FileHeader) -> Self {
        Self {
            format_version: header.format_version(),
            format_revision: header.format_revision(),
            creation_format_version: header.creation_format_version(),
            creation_format_revision: header.creation_format_revision(),
            page_size: header.effective_page_size(),
            file_type: header.file_type(),
            state: header.database_state(),
        }
    }
}

pub struct Database {
    source: Box<DynPageSource>,
    info: Option<DatabaseInfo>,
    ctx: DecodeContext,
    catalog: Catalog,
    schemas: Vec<RecordSchema>,
}

impl Database {
    /// Opens the file at `path` with default settings.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder().path(path).open()
    }

    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    pub(crate) fn load(source: Box<DynPageSource>, info: Option<DatabaseInfo>, ctx: DecodeContext) -> Result<Self> {
        let catalog = Catalog::load(source.as_ref(), &ctx)?;
        let schemas = catalog
            .tables()
            .iter()
            .map(TableDefinition::record_schema)
            .collect();

        Ok(Self {
            source,
            info,
            ctx,
            catalog,
            schemas,
        })
    }

    /// Header fields, absent when the database was opened from a page
    /// source.
    pub fn info(&self) -> Option<&DatabaseInfo> {
        self.info.as_ref()
    }

    pub fn format(&self) -> &FormatOptions {
        &self.ctx.format
    }

    pub fn context(&self) -> &DecodeContext {
        &self.ctx
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn page_source(&self) -> &DynPageSource {
        self.source.as_ref()
    }

    pub(crate) fn codepages(&self) -> WindowsCodepages {
        WindowsCodepages::new(self.ctx.default_codepage)
    }

    /// Tables in catalog order.
    pub fn tables(&self) -> impl Iterator<Item = Table<'_>> + '_ {
        self.catalog
            .tables()
            .iter()
            .zip(self.schemas.iter())
            .map(move |(definition, schema)| Table::new(self, definition, schema))
    }

    pub fn table(&self, name: &str) -> Option<Table<'_>> {
        self.tables().find(|table| table.name() == name)
    }

    pub fn table_count(&self) -> usize {
        self.catalog.len()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("info", &self.info)
            .field("format", &self.ctx.format)
            .field("tables", &self.catalog.len())
            .finish()
    }
}
