//! # Storage Module
//!
//! Read-only access to the pages of an ESE file. The decoder never owns page
//! memory: every page is borrowed from a [`PageSource`] for as long as the
//! source itself is borrowed, so a value decoded from a page cannot outlive
//! the mapping it points into.
//!
//! ## Architecture Overview
//!
//! ```text
//! PageSource (trait)                 Page<'a>
//!   ├── MmapPageSource  ──page()──>    ├── PageHeader (zerocopy, 40 bytes)
//!   ├── MemoryPageSource               ├── ExtendedPageHeader (+40 bytes)
//!   └── ChecksumVerifier<S>            │
//!                                      └── tags -> PageValue<'a>
//! FileHeader (zerocopy, first block)
//! ```
//!
//! ## Module Organization
//!
//! - `headers`: file header layout, database state, format options
//! - `page`: page header, page flags, page tags and checksums
//! - `mmap`: memory-mapped file pages
//! - `memory`: owned pages held in memory
//! - `verify`: page source wrapper that checks XOR checksums
//!
//! ## Thread Safety
//!
//! All sources are immutable after construction and therefore `Send + Sync`.
//! Decoders hold no interior state, so one source may back many readers.

mod headers;
mod memory;
mod mmap;
mod page;
mod verify;

pub use headers::{DatabaseState, FileHeader};
pub use memory::MemoryPageSource;
pub use mmap::MmapPageSource;
pub use page::{xor32_checksum, ExtendedPageHeader, Page, PageFlags, PageHeader, PageTag, PageValue};
pub use verify::ChecksumVerifier;

#[cfg(test)]
pub(crate) use headers::build_file_header;
#[cfg(test)]
pub(crate) use page::test_support::{tree_entry, PageWriter};

use eyre::Result;

/// Supplies page bytes by page number.
///
/// Implementations fail with an error rather than returning a short slice;
/// every slice returned is exactly `page_size()` bytes.
pub trait PageSource {
    fn page(&self, page_number: u32) -> Result<&[u8]>;

    fn page_size(&self) -> usize;

    fn page_count(&self) -> u32;
}

impl<T: PageSource + ?Sized> PageSource for &T {
    fn page(&self, page_number: u32) -> Result<&[u8]> {
        (**self).page(page_number)
    }

    fn page_size(&self) -> usize {
        (**self).page_size()
    }

    fn page_count(&self) -> u32 {
        (**self).page_count()
    }
}

impl<T: PageSource + ?Sized> PageSource for Box<T> {
    fn page(&self, page_number: u32) -> Result<&[u8]> {
        (**self).page(page_number)
    }

    fn page_size(&self) -> usize {
        (**self).page_size()
    }

    fn page_count(&self) -> u32 {
        (**self).page_count()
    }
}
