//! # Tree Nodes
//!
//! A [`Node`] is one page decoded into its ordered tree values. Decoding
//! happens once, when the node is built: every live page tag after tag 0 is
//! split into its key and its payload, and the key is expanded to its full
//! form so that callers compare whole keys only.
//!
//! ## Entry Layout
//!
//! ```text
//! [ common_key_size: u16 ]   present when the tag has HAS_COMMON_KEY
//! [ local_key_size:  u16 ]
//! [ local key bytes      ]
//! [ payload              ]   leaf: record / long value / index entry
//!                            branch: child page number (u32)
//!
//! key = page common key[..common_key_size] ++ local key
//! ```
//!
//! Defunct tags (deleted but not yet reclaimed) are skipped. Pages flagged
//! empty hold no values at all.
//!
//! ## Value Kinds
//!
//! | page            | kind            |
//! |-----------------|-----------------|
//! | not a leaf      | `BranchPointer` |
//! | leaf, long value| `LongValue`     |
//! | leaf, index     | `Index`         |
//! | other leaf      | `Record`        |
//!
//! A node never fetches its children; it only exposes child page numbers.

use eyre::Result;

use crate::config::FormatOptions;
use crate::encoding::bytes::{read_u32, slice};
use crate::encoding::Key;
use crate::error::EseError;
use crate::storage::{Page, PageFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeValueKind {
    Record,
    LongValue,
    Index,
    BranchPointer,
}

/// Where a tree value was found, as a handle back into the page source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueLocation {
    pub page_number: u32,
    /// Offset of the tagged value from the start of the page.
    pub page_offset: usize,
    pub tag_index: usize,
    /// Offset of the payload within the tagged value (past the key).
    pub data_offset: usize,
}

#[derive(Debug, Clone)]
pub struct TreeValue<'a> {
    kind: TreeValueKind,
    key: Key,
    data: &'a [u8],
    location: ValueLocation,
    child_page: Option<u32>,
}

impl<'a> TreeValue<'a> {
    pub fn kind(&self) -> TreeValueKind {
        self.kind
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Payload bytes following the key, borrowed from the page.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn location(&self) -> ValueLocation {
        self.location
    }

    /// Child page of a branch pointer; `None` for leaf values.
    pub fn child_page(&self) -> Option<u32> {
        self.child_page
    }

    pub fn is_branch(&self) -> bool {
        self.kind == TreeValueKind::BranchPointer
    }
}

#[derive(Debug, Clone)]
pub struct Node<'a> {
    page: Page<'a>,
    values: Vec<TreeValue<'a>>,
}

impl<'a> Node<'a> {
    pub fn decode(page_number: u32, data: &'a [u8], format: &FormatOptions) -> Result<Self> {
        let page = Page::new(page_number, data, format)?;
        Self::from_page(page)
    }

    pub fn from_page(page: Page<'a>) -> Result<Self> {
        let flags = page.flags();
        if flags.is_empty() || page.tag_count() <= 1 {
            return Ok(Self {
                page,
                values: Vec::new(),
            });
        }

        let kind = kind_for(flags);
        let common_key = page.common_key()?;
        let mut values = Vec::with_capacity(page.tag_count() - 1);

        for tag_index in 1..page.tag_count() {
            let value = page.value(tag_index)?;
            if value.is_defunct() {
                tracing::trace!(page = page.number(), tag_index, "skipping defunct value");
                continue;
            }

            let mut offset = 0usize;
            let common_size = if value.has_common_key() {
                offset += 2;
                value.read_u16(0, "common key size")? as usize
            } else {
                0
            };
            let local_size = value.read_u16(offset, "local key size")? as usize;
            offset += 2;
            let local_key = slice(value.data, offset, local_size, "local key")?;
            offset += local_size;

            let common = common_key.as_ref().map(Key::as_bytes);
            let key = Key::compose_with_common(common, common_size, local_key).map_err(|e| {
                match crate::error::ese_error(&e) {
                    Some(EseError::MalformedKey(reason)) => EseError::MalformedKey(format!(
                        "page {} tag {}: {}",
                        page.number(),
                        tag_index,
                        reason
                    ))
                    .into(),
                    _ => e,
                }
            })?;
            let data = &value.data[offset..];

            let child_page = if kind == TreeValueKind::BranchPointer {
                Some(read_u32(data, 0, "child page number")?)
            } else {
                None
            };

            values.push(TreeValue {
                kind,
                key,
                data,
                location: ValueLocation {
                    page_number: page.number(),
                    page_offset: value.page_offset,
                    tag_index,
                    data_offset: offset,
                },
                child_page,
            });
        }

        Ok(Self { page, values })
    }

    pub fn page(&self) -> &Page<'a> {
        &self.page
    }

    pub fn page_number(&self) -> u32 {
        self.page.number()
    }

    pub fn is_leaf(&self) -> bool {
        self.page.flags().is_leaf()
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn value_at(&self, index: usize) -> Result<&TreeValue<'a>> {
        self.values.get(index).ok_or_else(|| {
            EseError::InvalidArgument(format!(
                "value {} requested from page {} holding {} values",
                index,
                self.page.number(),
                self.values.len()
            ))
            .into()
        })
    }

    pub fn values(&self) -> &[TreeValue<'a>] {
        &self.values
    }

    pub fn next_page(&self) -> u32 {
        self.page.next_page()
    }

    pub fn previous_page(&self) -> u32 {
        self.page.previous_page()
    }
}

fn kind_for(flags: PageFlags) -> TreeValueKind {
    if !flags.is_leaf() {
        TreeValueKind::BranchPointer
    } else if flags.is_long_value() {
        TreeValueKind::LongValue
    } else if flags.is_index() {
        TreeValueKind::Index
    } else {
        TreeValueKind::Record
    }
}
