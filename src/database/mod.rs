//! # Database Module
//!
//! The public face of the decoder: open a file, list its tables, iterate
//! their records.
//!
//! ## Architecture
//!
//! ```text
//! DatabaseBuilder ──open()──> Database ──table(name)──> Table<'db>
//!                               │                          │
//!                               │ Catalog (page 4)         ├── records()      -> Records<'db>
//!                               │ RecordSchema per table   ├── find_record()  -> Record<'db>
//!                               │ DecodeContext            ├── long_value()   -> LongValueHandle<'db>
//!                               │                          └── multi_value()  -> MultiValue<'db>
//!                               └── Box<dyn PageSource>
//! ```
//!
//! Everything returned by a table borrows the database. Column values are
//! read through `Record`, which dereferences to a `RecordView`.
//!
//! ## Usage Example
//!
//! ```ignore
//! use esedb::Database;
//!
//! let db = Database::open("SRUDB.dat")?;
//! for table in db.tables() {
//!     println!("{} ({} columns)", table.name(), table.schema().len());
//! }
//! ```

mod builder;
#[allow(clippy::module_inception)]
mod database;
mod table;


pub use builder::DatabaseBuilder;
pub use database::{Database, DatabaseInfo};
pub use table::{Record, Records, Table};
