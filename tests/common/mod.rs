//! Synthetic ESE files for integration tests.
//!
//! Everything here writes the on-disk layout by hand: a signed file header,
//! its shadow copy, then pages in legacy (40-byte header) layout.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use esedb::storage::xor32_checksum;

pub const PAGE_SIZE: usize = 4096;

pub const ROOT: u32 = 0x0001;
pub const LEAF: u32 = 0x0002;
pub const PARENT: u32 = 0x0004;
pub const LONG_VALUE: u32 = 0x0080;

pub const FLAG_LONG_VALUE: u8 = 0x04;
pub const FLAG_MULTI_VALUE: u8 = 0x08;
pub const FLAG_COMPRESSED: u8 = 0x02;

const SIGNATURE: u32 = 0x89ab_cdef;
const HEADER_CHECKSUM_SIZE: usize = 668;

pub const STATE_DIRTY_SHUTDOWN: u32 = 2;
pub const STATE_CLEAN_SHUTDOWN: u32 = 3;

/// Routes decoder warnings to the test harness output. `ESEDB_TEST_LOG=debug`
/// raises the level.
pub fn init_tracing() {
    let level = std::env::var("ESEDB_TEST_LOG")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(tracing::Level::WARN);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_test_writer()
        .try_init();
}

pub fn file_header(format_version: u32, format_revision: u32, state: u32) -> Vec<u8> {
    let mut block = vec![0u8; PAGE_SIZE];
    block[4..8].copy_from_slice(&SIGNATURE.to_le_bytes());
    block[8..12].copy_from_slice(&format_version.to_le_bytes());
    block[52..56].copy_from_slice(&state.to_le_bytes());
    block[232..236].copy_from_slice(&format_revision.to_le_bytes());
    block[236..240].copy_from_slice(&(PAGE_SIZE as u32).to_le_bytes());
    block[340..344].copy_from_slice(&format_version.to_le_bytes());
    block[344..348].copy_from_slice(&format_revision.to_le_bytes());
    let checksum = xor32_checksum(&block[4..HEADER_CHECKSUM_SIZE], SIGNATURE);
    block[0..4].copy_from_slice(&checksum.to_le_bytes());
    block
}

/// One tree value: local key size, key, payload.
pub fn entry(key: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut out = (key.len() as u16).to_le_bytes().to_vec();
    out.extend_from_slice(key);
    out.extend_from_slice(payload);
    out
}

pub struct PageBuilder {
    flags: u32,
    previous: u32,
    next: u32,
    values: Vec<Vec<u8>>,
}

impl PageBuilder {
    pub fn new(flags: u32) -> Self {
        Self {
            flags,
            previous: 0,
            next: 0,
            values: vec![Vec::new()],
        }
    }

    pub fn links(mut self, previous: u32, next: u32) -> Self {
        self.previous = previous;
        self.next = next;
        self
    }

    pub fn value(mut self, key: &[u8], payload: &[u8]) -> Self {
        self.values.push(entry(key, payload));
        self
    }

    pub fn child(self, key: &[u8], page: u32) -> Self {
        self.value(key, &page.to_le_bytes())
    }

    pub fn build(self) -> Vec<u8> {
        let mut page = vec![0u8; PAGE_SIZE];
        page[16..20].copy_from_slice(&self.previous.to_le_bytes());
        page[20..24].copy_from_slice(&self.next.to_le_bytes());
        page[34..36].copy_from_slice(&(self.values.len() as u16).to_le_bytes());
        page[36..40].copy_from_slice(&self.flags.to_le_bytes());

        let mut offset = 0usize;
        for (i, value) in self.values.iter().enumerate() {
            let start = 40 + offset;
            page[start..start + value.len()].copy_from_slice(value);
            let tag = PAGE_SIZE - 4 * (i + 1);
            page[tag..tag + 2].copy_from_slice(&(value.len() as u16).to_le_bytes());
            page[tag + 2..tag + 4].copy_from_slice(&(offset as u16).to_le_bytes());
            offset += value.len();
        }
        page
    }
}

/// Row with the given fixed bytes, variable columns from 128 and a raw
/// tagged region.
pub fn row(last_fixed: u8, fixed: &[u8], vars: &[Option<&[u8]>], tagged: &[u8]) -> Vec<u8> {
    let mut out = vec![last_fixed, 127 + vars.len() as u8];
    out.extend_from_slice(&((4 + fixed.len()) as u16).to_le_bytes());
    out.extend_from_slice(fixed);

    let mut end = 0u16;
    let mut payload = Vec::new();
    for var in vars {
        match var {
            Some(data) => {
                end += data.len() as u16;
                payload.extend_from_slice(data);
                out.extend_from_slice(&end.to_le_bytes());
            }
            None => out.extend_from_slice(&(end | 0x8000).to_le_bytes()),
        }
    }
    out.extend_from_slice(&payload);
    out.extend_from_slice(tagged);
    out
}

/// Offset-table tagged region; entries must be in identifier order.
pub fn tagged(entries: &[(u16, Option<u8>, &[u8])]) -> Vec<u8> {
    let mut table = Vec::new();
    let mut data = Vec::new();
    let table_len = entries.len() * 4;
    for (id, flags, value) in entries {
        let mut offset = (table_len + data.len()) as u16;
        if let Some(flags) = flags {
            offset |= 0x4000;
            data.push(*flags);
        }
        data.extend_from_slice(value);
        table.extend_from_slice(&id.to_le_bytes());
        table.extend_from_slice(&offset.to_le_bytes());
    }
    table.extend_from_slice(&data);
    table
}

/// Catalog entry as stored in MSysObjects.
pub struct CatalogEntry<'a> {
    pub owner: u32,
    pub kind: u16,
    pub identifier: u32,
    pub union_value: u32,
    pub size: u32,
    pub flags: u32,
    pub pages_or_codepage: u32,
    pub name: &'a str,
    pub template: Option<&'a str>,
}

impl<'a> CatalogEntry<'a> {
    pub fn table(identifier: u32, root: u32, name: &'a str) -> Self {
        Self {
            owner: identifier,
            kind: 1,
            identifier,
            union_value: root,
            size: 0,
            flags: 0,
            pages_or_codepage: 0,
            name,
            template: None,
        }
    }

    pub fn column(owner: u32, identifier: u32, column_type: u32, size: u32, codepage: u32, name: &'a str) -> Self {
        Self {
            owner,
            kind: 2,
            identifier,
            union_value: column_type,
            size,
            flags: 0,
            pages_or_codepage: codepage,
            name,
            template: None,
        }
    }

    pub fn long_value(owner: u32, identifier: u32, root: u32) -> Self {
        Self {
            owner,
            kind: 4,
            identifier,
            union_value: root,
            size: 0,
            flags: 0,
            pages_or_codepage: 0,
            name: "LV",
            template: None,
        }
    }

    pub fn with_template(mut self, template: &'a str) -> Self {
        self.template = Some(template);
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut fixed = Vec::new();
        fixed.extend_from_slice(&self.owner.to_le_bytes());
        fixed.extend_from_slice(&self.kind.to_le_bytes());
        fixed.extend_from_slice(&self.identifier.to_le_bytes());
        fixed.extend_from_slice(&self.union_value.to_le_bytes());
        fixed.extend_from_slice(&self.size.to_le_bytes());
        fixed.extend_from_slice(&self.flags.to_le_bytes());
        fixed.extend_from_slice(&self.pages_or_codepage.to_le_bytes());
        fixed.push(1);

        let name = self.name.as_bytes();
        match self.template {
            Some(template) => row(8, &fixed, &[Some(name), None, Some(template.as_bytes())], &[]),
            None => row(8, &fixed, &[Some(name)], &[]),
        }
    }
}

/// Single-leaf catalog at page 4.
pub fn catalog_page(entries: &[CatalogEntry<'_>]) -> Vec<u8> {
    let mut page = PageBuilder::new(ROOT | LEAF);
    for (i, entry) in entries.iter().enumerate() {
        let mut key = entry.owner.to_be_bytes().to_vec();
        key.extend_from_slice(&(i as u16).to_be_bytes());
        page = page.value(&key, &entry.encode());
    }
    page.build()
}

pub struct FileBuilder {
    header: Vec<u8>,
    pages: BTreeMap<u32, Vec<u8>>,
}

impl FileBuilder {
    pub fn new(header: Vec<u8>) -> Self {
        Self {
            header,
            pages: BTreeMap::new(),
        }
    }

    pub fn page(mut self, number: u32, data: Vec<u8>) -> Self {
        self.pages.insert(number, data);
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let last = self.pages.keys().next_back().copied().unwrap_or(0);
        let mut bytes = self.header.clone();
        bytes.extend_from_slice(&self.header);
        for number in 1..=last {
            match self.pages.get(&number) {
                Some(page) => bytes.extend_from_slice(page),
                None => bytes.extend(std::iter::repeat(0u8).take(PAGE_SIZE)),
            }
        }
        bytes
    }

    pub fn write(&self, dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, self.to_bytes()).unwrap();
        path
    }
}
