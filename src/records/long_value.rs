//! # Long Values
//!
//! Values too large for a row live in the table's long-value tree. The row
//! keeps a 4-byte long-value identifier (flags byte `LONG_VALUE`); the tree
//! holds an anchor and the data segments:
//!
//! ```text
//! key                         value
//! ----------------------      --------------------------------------
//! lid (4, big-endian)         anchor: u32 reference count, u32 total size
//! lid ++ be32(0)              segment bytes [0, n0)
//! lid ++ be32(n0)             segment bytes [n0, n0 + n1)
//! ...
//! ```
//!
//! The identifier in the row is stored byte-reversed relative to the tree
//! key; [`LongValueKey::from_record`] undoes that. Each segment key's suffix
//! is the byte offset of the segment within the value, so consecutive
//! segments must be contiguous.
//!
//! Opening a long value only collects segment descriptors. Bytes are
//! copied out on [`LongValueHandle::read_at`] or
//! [`LongValueHandle::read_all`].

use std::fmt;

use eyre::Result;

use crate::btree::{TreeNavigator, ValueLocation};
use crate::config::{DecodeContext, LONG_VALUE_ANCHOR_SIZE, LONG_VALUE_KEY_SIZE, LONG_VALUE_SEGMENT_SUFFIX_SIZE};
use crate::encoding::bytes::exact;
use crate::encoding::Key;
use crate::error::EseError;
use crate::storage::PageSource;

/// Long-value identifier in tree key byte order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LongValueKey([u8; LONG_VALUE_KEY_SIZE]);

impl LongValueKey {
    /// Builds the tree key from the 4 bytes stored in a record.
    pub fn from_record(span: &[u8]) -> Result<Self> {
        let mut bytes: [u8; LONG_VALUE_KEY_SIZE] = exact(span)?;
        bytes.reverse();
        Ok(Self(bytes))
    }

    pub fn from_tree_key(bytes: [u8; LONG_VALUE_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; LONG_VALUE_KEY_SIZE] {
        &self.0
    }

    pub fn id(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    pub fn segment_key(&self, offset: u32) -> Key {
        let mut key = Key::new(&self.0);
        key.push_be_u32(offset);
        key
    }
}

impl fmt::Debug for LongValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LongValueKey({:#010x})", self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongValueSegment<'s> {
    pub offset: u32,
    pub location: ValueLocation,
    pub data: &'s [u8],
}

impl LongValueSegment<'_> {
    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn end(&self) -> u64 {
        self.offset as u64 + self.data.len() as u64
    }
}

#[derive(Debug, Clone)]
pub struct LongValueHandle<'s> {
    key: LongValueKey,
    declared_size: u32,
    segments: Vec<LongValueSegment<'s>>,
}

impl<'s> LongValueHandle<'s> {
    pub fn key(&self) -> LongValueKey {
        self.key
    }

    /// Size recorded in the anchor.
    pub fn declared_size(&self) -> u32 {
        self.declared_size
    }

    /// Number of bytes the segments actually hold.
    pub fn len(&self) -> u64 {
        self.segments.last().map(LongValueSegment::end).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn segments(&self) -> &[LongValueSegment<'s>] {
        &self.segments
    }

    /// Copies bytes starting at `offset` into `buf`; returns the number of
    /// bytes copied, 0 at or past the end.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset >= self.len() || buf.is_empty() {
            return Ok(0);
        }

        let first = self.segments.partition_point(|s| s.end() <= offset);
        let mut copied = 0usize;
        let mut position = offset;

        for segment in &self.segments[first..] {
            if copied == buf.len() {
                break;
            }
            let within = (position - segment.offset as u64) as usize;
            let available = &segment.data[within..];
            let n = available.len().min(buf.len() - copied);
            buf[copied..copied + n].copy_from_slice(&available[..n]);
            copied += n;
            position += n as u64;
        }
        Ok(copied)
    }

    pub fn read_all(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.len() as usize);
        for segment in &self.segments {
            out.extend_from_slice(segment.data);
        }
        Ok(out)
    }
}

/// Opens long values stored in one long-value tree.
pub struct LongValueAssembler<'s, S: PageSource + ?Sized> {
    navigator: TreeNavigator<'s, S>,
    root_page: u32,
}

impl<'s, S: PageSource + ?Sized> LongValueAssembler<'s, S> {
    pub fn new(source: &'s S, ctx: &DecodeContext, root_page: u32) -> Self {
        Self {
            navigator: TreeNavigator::new(source, ctx),
            root_page,
        }
    }

    /// Looks up the anchor and collects the segments. A missing anchor is
    /// `Ok(None)`.
    pub fn open(&self, key: &LongValueKey) -> Result<Option<LongValueHandle<'s>>> {
        let anchor = match self.navigator.find_leaf(self.root_page, key.as_bytes(), false)? {
            Some(anchor) => anchor,
            None => {
                tracing::debug!(?key, root = self.root_page, "long value anchor not found");
                return Ok(None);
            }
        };
        let anchor_data: [u8; LONG_VALUE_ANCHOR_SIZE] = exact(anchor.data())?;
        let declared_size = u32::from_le_bytes([anchor_data[4], anchor_data[5], anchor_data[6], anchor_data[7]]);

        let mut segments = Vec::new();
        let mut expected: u64 = 0;

        for value in self.navigator.seek(self.root_page, key.segment_key(0).as_bytes())? {
            let value = value?;
            let value_key = value.key().as_bytes();
            if !value_key.starts_with(key.as_bytes()) {
                break;
            }
            if value_key.len() != LONG_VALUE_KEY_SIZE + LONG_VALUE_SEGMENT_SUFFIX_SIZE {
                tracing::trace!(len = value_key.len(), "skipping non-segment key in long value range");
                continue;
            }

            let suffix: [u8; LONG_VALUE_SEGMENT_SUFFIX_SIZE] = exact(&value_key[LONG_VALUE_KEY_SIZE..])?;
            let offset = u32::from_be_bytes(suffix);
            if offset as u64 != expected {
                return Err(EseError::NonContiguousSegment {
                    expected: expected as u32,
                    found: offset,
                }
                .into());
            }

            expected += value.data().len() as u64;
            segments.push(LongValueSegment {
                offset,
                location: value.location(),
                data: value.data(),
            });
        }

        if expected != declared_size as u64 {
            tracing::warn!(
                ?key,
                declared = declared_size,
                assembled = expected,
                "long value size differs from anchor"
            );
        }

        Ok(Some(LongValueHandle {
            key: *key,
            declared_size,
            segments,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::page_flags;
    use crate::error::ese_error;
    use crate::storage::{tree_entry, MemoryPageSource, PageWriter};

    const LID: [u8; 4] = [0x00, 0x00, 0x00, 0x2a];

    fn anchor(total: u32) -> Vec<u8> {
        let mut data = 1u32.to_le_bytes().to_vec();
        data.extend_from_slice(&total.to_le_bytes());
        data
    }

    fn segment_key(lid: [u8; 4], offset: u32) -> Vec<u8> {
        let mut key = lid.to_vec();
        key.extend_from_slice(&offset.to_be_bytes());
        key
    }

    fn tree(entries: &[(Vec<u8>, Vec<u8>)]) -> MemoryPageSource {
        let mut writer = PageWriter::new(4096, page_flags::ROOT | page_flags::LEAF | page_flags::LONG_VALUE)
            .value(&[], 0);
        for (key, payload) in entries {
            writer = writer.value(&tree_entry(None, key, payload), 0);
        }
        MemoryPageSource::new(4096).with_page(9, writer.build()).unwrap()
    }

    fn segments_of(sizes: &[usize], start: u32) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut entries = vec![(LID.to_vec(), anchor(sizes.iter().sum::<usize>() as u32))];
        let mut offset = start;
        let mut fill = b'a';
        for &size in sizes {
            entries.push((segment_key(LID, offset), vec![fill; size]));
            offset += size as u32;
            fill += 1;
        }
        entries
    }

    #[test]
    fn record_identifier_is_byte_reversed() {
        let key = LongValueKey::from_record(&[0x2a, 0x00, 0x00, 0x00]).unwrap();

        assert_eq!(key.as_bytes(), &LID);
        assert_eq!(key.id(), 42);
        assert!(LongValueKey::from_record(&[1, 2, 3]).is_err());
    }

    #[test]
    fn segments_assemble_in_order() {
        let source = tree(&segments_of(&[5, 3, 7], 0));
        let assembler = LongValueAssembler::new(&source, &DecodeContext::default(), 9);

        let handle = assembler.open(&LongValueKey::from_tree_key(LID)).unwrap().unwrap();

        assert_eq!(handle.len(), 15);
        assert_eq!(handle.declared_size(), 15);
        assert_eq!(handle.segments().len(), 3);
        assert_eq!(handle.segments()[1].offset, 5);
        assert_eq!(handle.read_all().unwrap(), b"aaaaabbbccccccc");
    }

    #[test]
    fn read_at_spans_segment_boundaries() {
        let source = tree(&segments_of(&[5, 3, 7], 0));
        let assembler = LongValueAssembler::new(&source, &DecodeContext::default(), 9);
        let handle = assembler.open(&LongValueKey::from_tree_key(LID)).unwrap().unwrap();

        let mut buf = [0u8; 6];
        assert_eq!(handle.read_at(4, &mut buf).unwrap(), 6);
        assert_eq!(&buf, b"abbbcc");

        let mut tail = [0u8; 10];
        assert_eq!(handle.read_at(12, &mut tail).unwrap(), 3);
        assert_eq!(&tail[..3], b"ccc");

        assert_eq!(handle.read_at(15, &mut tail).unwrap(), 0);
    }

    #[test]
    fn wrong_starting_offset_is_non_contiguous() {
        let source = tree(&segments_of(&[5, 3], 4));
        let assembler = LongValueAssembler::new(&source, &DecodeContext::default(), 9);

        let err = assembler.open(&LongValueKey::from_tree_key(LID)).unwrap_err();

        assert_eq!(
            ese_error(&err),
            Some(&EseError::NonContiguousSegment {
                expected: 0,
                found: 4
            })
        );
    }

    #[test]
    fn missing_anchor_is_none() {
        let source = tree(&segments_of(&[2], 0));
        let assembler = LongValueAssembler::new(&source, &DecodeContext::default(), 9);

        let other = LongValueKey::from_tree_key([0, 0, 0, 0x2b]);
        assert!(assembler.open(&other).unwrap().is_none());
    }

    #[test]
    fn segments_of_neighbouring_values_are_not_collected() {
        let mut entries = segments_of(&[4], 0);
        let next = [0x00, 0x00, 0x00, 0x2b];
        entries.push((next.to_vec(), anchor(2)));
        entries.push((segment_key(next, 0), b"zz".to_vec()));
        let source = tree(&entries);
        let assembler = LongValueAssembler::new(&source, &DecodeContext::default(), 9);

        let handle = assembler.open(&LongValueKey::from_tree_key(LID)).unwrap().unwrap();

        assert_eq!(handle.read_all().unwrap(), b"aaaa");
    }
}
