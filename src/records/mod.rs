//! # Records
//!
//! Turns the payload of a table's leaf values into columns. ESE rows are
//! self-describing only in part: the row header says how many fixed and
//! variable columns are stored, but column widths, types and codepages come
//! from the catalog.
//!
//! ## Row Binary Layout
//!
//! ```text
//! +---------+---------+---------+---------------+-----------------+---------------+--------+
//! | last    | last    | var     | fixed columns | var end offsets | var payload   | tagged |
//! | fixed   | var     | offset  |               | u16 per id      |               | region |
//! | u8      | u8      | u16     |               | 128..=last var  |               |        |
//! +---------+---------+---------+---------------+-----------------+---------------+--------+
//! ```
//!
//! | Region | Identifiers | Locating a value |
//! |--------|-------------|------------------|
//! | **Fixed** | 1..=127 | precomputed offset from the schema |
//! | **Variable** | 128..=255 | cumulative end offsets, bit 0x8000 = absent |
//! | **Tagged** | 256.. | offset table or linear stream, optional flags byte |
//!
//! ## Module Structure
//!
//! - `types`: `ColumnType` codes and fixed widths
//! - `schema`: `SchemaEntry`, `SchemaEntryKind`, `RecordSchema`
//! - `catalog`: catalog scan into `TableDefinition`s
//! - `decoder`: `RecordDecoder` producing `DecodedRecord` slots
//! - `view`: `RecordView` typed getters
//! - `value`: pure span conversions
//! - `multi_value`: multi-valued tagged columns
//! - `long_value`: long-value trees
//! - `codepage`: `CodepageTable` and narrow text decoding

pub mod catalog;
pub mod codepage;
pub mod decoder;
pub mod long_value;
pub mod multi_value;
pub mod schema;
pub mod types;
pub mod value;
pub mod view;


pub use catalog::{Catalog, TableDefinition};
pub use codepage::{CodepageTable, WindowsCodepages};
pub use decoder::{DecodedRecord, RecordDecoder, RecordValue, RowHeader};
pub use long_value::{LongValueAssembler, LongValueHandle, LongValueKey, LongValueSegment};
pub use multi_value::MultiValue;
pub use schema::{RecordSchema, SchemaEntry, SchemaEntryKind};
pub use types::ColumnType;
pub use value::{ColumnValue, FileTime, Guid};
pub use view::RecordView;
