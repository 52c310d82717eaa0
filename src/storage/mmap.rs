//! # Memory-Mapped Page Source
//!
//! `MmapPageSource` maps an ESE file read-only and serves page slices that
//! point straight into the mapping. No page is copied and no cache sits in
//! between; the OS page cache does that work.
//!
//! ## File Layout
//!
//! ```text
//! Offset 0:                 file header block     (page_size bytes)
//! Offset page_size:         shadow header block   (page number 0)
//! Offset 2 * page_size:     page 1
//! Offset (n + 1) * page_size: page n
//! ```
//!
//! The page size is only known after the header has been read, so the file
//! is mapped first and the header is read from the start of the mapping.
//!
//! ## Safety Considerations
//!
//! The mapping is never remapped or written, so slices handed out by
//! [`PageSource::page`] stay valid for as long as `&self` is borrowed. A file
//! truncated by another process while mapped can still fault; that is the
//! usual caveat of file mappings and is documented on `open`.

use std::fs::File;
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};
use memmap2::Mmap;

use super::headers::FileHeader;
use super::PageSource;
use crate::config::FILE_HEADER_SIZE;
use crate::error::EseError;

#[derive(Debug)]
pub struct MmapPageSource {
    path: PathBuf,
    mmap: Mmap,
    page_size: usize,
    page_count: u32,
}

impl MmapPageSource {
    /// Maps `path` read-only. The file must not be truncated while mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path)
            .map_err(|e| EseError::Io(format!("failed to open '{}': {}", path.display(), e)))?;

        let file_size = file
            .metadata()
            .wrap_err_with(|| format!("failed to get metadata for '{}'", path.display()))?
            .len();

        ensure!(
            file_size >= FILE_HEADER_SIZE as u64,
            "file '{}' of {} bytes is too small to hold an ESE header",
            path.display(),
            file_size
        );

        // SAFETY: Mmap::map is unsafe because the file may be modified or
        // truncated by another process while mapped. The mapping is
        // read-only, never remapped, and every page access is bounds-checked
        // against the size captured at open time.
        let mmap = unsafe {
            Mmap::map(&file).wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        let header = FileHeader::from_bytes(&mmap)?;
        header.validate()?;
        let page_size = header.effective_page_size() as usize;
        let blocks = file_size / page_size as u64;
        let page_count = u32::try_from(blocks.saturating_sub(1)).map_err(|_| {
            EseError::UnsupportedFormat(format!("file of {} pages is too large", blocks))
        })?;

        if file_size % page_size as u64 != 0 {
            tracing::warn!(
                path = %path.display(),
                file_size,
                page_size,
                "file size is not a multiple of the page size"
            );
        }
        tracing::debug!(path = %path.display(), page_size, page_count, "mapped database file");

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            page_size,
            page_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> Result<&FileHeader> {
        FileHeader::from_bytes(&self.mmap)
    }

    /// The first page-sized block, which holds the file header.
    pub fn header_block(&self) -> &[u8] {
        &self.mmap[..self.page_size.min(self.mmap.len())]
    }

    pub fn file_size(&self) -> u64 {
        self.mmap.len() as u64
    }
}

impl PageSource for MmapPageSource {
    fn page(&self, page_number: u32) -> Result<&[u8]> {
        ensure!(
            page_number < self.page_count,
            "page {} out of bounds (page_count={})",
            page_number,
            self.page_count
        );

        let offset = (page_number as usize + 1) * self.page_size;
        Ok(&self.mmap[offset..offset + self.page_size])
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn page_count(&self) -> u32 {
        self.page_count
    }
}
