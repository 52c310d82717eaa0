//! Checksum-verifying page source.
//!
//! [`ChecksumVerifier`] wraps another [`PageSource`] and checks each page's
//! XOR checksum before handing the bytes out. Verification is opt-in because
//! it touches every byte of every page read; `DatabaseBuilder` installs the
//! wrapper when `verify_checksums(true)` is set.

use eyre::Result;

use super::{Page, PageSource};
use crate::config::FormatOptions;

#[derive(Debug)]
pub struct ChecksumVerifier<S> {
    inner: S,
    format: FormatOptions,
}

impl<S: PageSource> ChecksumVerifier<S> {
    pub fn new(inner: S, format: FormatOptions) -> Self {
        Self { inner, format }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: PageSource> PageSource for ChecksumVerifier<S> {
    fn page(&self, page_number: u32) -> Result<&[u8]> {
        let data = self.inner.page(page_number)?;
        Page::new(page_number, data, &self.format)?.verify_checksum(&self.format)?;
        Ok(data)
    }

    fn page_size(&self) -> usize {
        self.inner.page_size()
    }

    fn page_count(&self) -> u32 {
        self.inner.page_count()
    }
}
