//! # Encoding Module
//!
//! Byte-level helpers shared by the page, tree and record layers:
//!
//! - **bytes**: bounds-checked little-endian reads over untrusted buffers
//! - **key**: B-tree key composition and comparison
//! - **compression**: 7-bit and XPRESS decoding of compressed column values

pub mod bytes;
pub mod compression;
pub mod key;

pub use key::{branch_covers, compare, Key};
