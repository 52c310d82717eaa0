//! # esedb - Read-Only ESE Database Decoder
//!
//! esedb reads Extensible Storage Engine (ESE, "JET Blue") database files:
//! the format behind Windows Search, SRUM, Exchange mailboxes, Active
//! Directory and many other Windows stores. It never writes. It prioritizes:
//!
//! - **Zero-copy data access**: keys, rows and column spans borrow the mmap
//! - **No panics on malformed input**: every format-derived offset is
//!   bounds-checked and failures surface as typed errors
//! - **Explicit layout switches**: historical format variants are plain
//!   booleans that a caller can override
//!
//! ## Quick Start
//!
//! ```ignore
//! use esedb::Database;
//!
//! let db = Database::open("SRUDB.dat")?;
//! let table = db.table("SruDbIdMapTable").expect("table exists");
//!
//! for record in table.records()? {
//!     let record = record?;
//!     let id = record.get_int32(1)?;
//!     let blob = record.get_binary_opt(2)?;
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Database / Table / Record (API)   │
//! ├─────────────────────────────────────┤
//! │  Catalog │ Record decoder │ Values  │
//! ├─────────────────────────────────────┤
//! │  Long values  │  Multi values       │
//! ├─────────────────────────────────────┤
//! │   B-tree nodes and navigator        │
//! ├─────────────────────────────────────┤
//! │   Pages, tags, checksums            │
//! ├─────────────────────────────────────┤
//! │   PageSource (mmap / memory)        │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! ```text
//! block 0        file header (signature 0x89abcdef, versions, page size)
//! block 1        shadow file header (page 0)
//! block n + 1    page n
//!                page 4 is the root of the catalog (MSysObjects)
//! ```
//!
//! ## Module Overview
//!
//! - [`config`]: format constants and decode options
//! - [`error`]: `EseError` and its `ErrorKind` classification
//! - [`storage`]: file header, pages, page sources
//! - [`encoding`]: byte readers, keys, value decompression
//! - [`btree`]: tree values and navigation
//! - [`records`]: catalog, row decoding, typed column access
//! - [`database`]: `Database`, `Table`, `Record`

#[macro_use]
mod macros;

pub mod btree;
pub mod config;
pub mod database;
pub mod encoding;
pub mod error;
pub mod records;
pub mod storage;

pub use config::{DecodeContext, FormatOptions};
pub use database::{Database, DatabaseBuilder, DatabaseInfo, Record, Records, Table};
pub use error::{EseError, ErrorKind};
pub use records::{ColumnType, ColumnValue, FileTime, Guid, RecordView};
pub use storage::{MemoryPageSource, MmapPageSource, PageSource};
