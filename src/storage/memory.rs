//! In-memory page source for callers that already hold decoded pages (and for
//! tests that build trees by hand). Page slots that were never set read as a
//! `MalformedPage` error rather than as zeroes.

use eyre::{ensure, Result};

use super::PageSource;
use crate::error::EseError;

#[derive(Debug, Clone)]
pub struct MemoryPageSource {
    page_size: usize,
    pages: Vec<Option<Vec<u8>>>,
}

impl MemoryPageSource {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
        }
    }

    /// Stores `data` as page `page_number`, growing the source as needed.
    pub fn set_page(&mut self, page_number: u32, data: Vec<u8>) -> Result<()> {
        ensure!(
            data.len() == self.page_size,
            "page {} has {} bytes, expected {}",
            page_number,
            data.len(),
            self.page_size
        );
        let index = page_number as usize;
        if index >= self.pages.len() {
            self.pages.resize(index + 1, None);
        }
        self.pages[index] = Some(data);
        Ok(())
    }

    pub fn with_page(mut self, page_number: u32, data: Vec<u8>) -> Result<Self> {
        self.set_page(page_number, data)?;
        Ok(self)
    }
}

impl PageSource for MemoryPageSource {
    fn page(&self, page_number: u32) -> Result<&[u8]> {
        match self.pages.get(page_number as usize) {
            Some(Some(data)) => Ok(data),
            _ => Err(EseError::MalformedPage {
                page_number,
                reason: "page is not present".into(),
            }
            .into()),
        }
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }
}
