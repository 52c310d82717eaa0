//! # Page Header and Page Tags
//!
//! Every ESE page starts with a fixed header and ends with an array of page
//! tags growing backwards from the end of the page. Each tag locates one
//! value inside the data area that follows the header.
//!
//! ## Page Header Layout (40 bytes)
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----------------------------
//! 0       4     XOR checksum
//! 4       4     page number (ECC checksum on newer revisions)
//! 8       8     database modification time
//! 16      4     previous page number
//! 20      4     next page number
//! 24      4     father data page object identifier
//! 28      2     available data size
//! 30      2     available uncommitted data size
//! 32      2     available data offset
//! 34      2     available page tag (number of tags)
//! 36      4     page flags
//! ```
//!
//! Pages of 16 KiB and larger written by revision 0x11 or later append a
//! second 40-byte block (three 64-bit checksums, the 64-bit page number and a
//! reserved word), moving the data area to offset 80.
//!
//! ## Page Tags
//!
//! ```text
//! page end - 4 * (i + 1):  [ size: u16 ][ offset: u16 ]
//!
//! legacy:   size & 0x1fff, offset & 0x1fff, flags = offset >> 13
//! extended: size & 0x7fff, offset & 0x7fff, flags = value[0..2] >> 13
//! ```
//!
//! Offsets are relative to the start of the data area. On extended pages the
//! flags live in the top three bits of the value's first little-endian u16,
//! so readers of that word must mask them off; [`PageValue::read_u16`] does
//! so for offset 0.
//!
//! Tag 0 never holds a tree entry: on root pages it is the external header,
//! elsewhere it is the page's common key.

use eyre::Result;
use zerocopy::little_endian::{U16, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{
    page_flags, tag_flags, FormatOptions, EXTENDED_PAGE_HEADER_SIZE, EXTENDED_TAG_VALUE_MASK,
    LEGACY_TAG_VALUE_MASK, PAGE_HEADER_SIZE, PAGE_TAG_SIZE, TAG_FLAGS_SHIFT, XOR_CHECKSUM_SEED,
};
use crate::encoding::bytes::{read_u16, slice};
use crate::encoding::Key;
use crate::error::EseError;

/// Keeps the low 5 bits of the second byte of an extended value, dropping
/// the tag flags stored above them.
const EXTENDED_FIRST_WORD_HIGH_MASK: u8 = (LEGACY_TAG_VALUE_MASK >> 8) as u8;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct PageHeader {
    xor_checksum: U32,
    page_number: U32,
    modification_time: [u8; 8],
    previous_page: U32,
    next_page: U32,
    father_data_page_object_id: U32,
    available_data_size: U16,
    available_uncommitted_data_size: U16,
    available_data_offset: U16,
    available_page_tag: U16,
    page_flags: U32,
}

const _: () = assert!(std::mem::size_of::<PageHeader>() == PAGE_HEADER_SIZE);

impl PageHeader {
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        let bytes = slice(data, 0, PAGE_HEADER_SIZE, "page header")?;
        Self::ref_from_bytes(bytes).map_err(|e| eyre::eyre!("failed to read PageHeader: {:?}", e))
    }

    zerocopy_getters! {
        xor_checksum: u32,
        page_number: u32,
        previous_page: u32,
        next_page: u32,
        father_data_page_object_id: u32,
        available_data_size: u16,
        available_uncommitted_data_size: u16,
        available_data_offset: u16,
        available_page_tag: u16,
    }

    raw_getters! {
        modification_time: 8,
    }

    pub fn flags(&self) -> PageFlags {
        PageFlags(self.page_flags.get())
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ExtendedPageHeader {
    checksum1: U64,
    checksum2: U64,
    checksum3: U64,
    page_number: U64,
    reserved: U64,
}

const _: () = assert!(
    std::mem::size_of::<ExtendedPageHeader>() == EXTENDED_PAGE_HEADER_SIZE - PAGE_HEADER_SIZE
);

impl ExtendedPageHeader {
    pub fn from_page(data: &[u8]) -> Result<&Self> {
        let bytes = slice(
            data,
            PAGE_HEADER_SIZE,
            EXTENDED_PAGE_HEADER_SIZE - PAGE_HEADER_SIZE,
            "extended page header",
        )?;
        Self::ref_from_bytes(bytes)
            .map_err(|e| eyre::eyre!("failed to read ExtendedPageHeader: {:?}", e))
    }

    zerocopy_getters! {
        checksum1: u64,
        checksum2: u64,
        checksum3: u64,
        page_number: u64,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageFlags(pub u32);

impl PageFlags {
    #[inline]
    fn has(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn is_root(self) -> bool {
        self.has(page_flags::ROOT)
    }

    pub fn is_leaf(self) -> bool {
        self.has(page_flags::LEAF)
    }

    pub fn is_parent(self) -> bool {
        self.has(page_flags::PARENT)
    }

    pub fn is_empty(self) -> bool {
        self.has(page_flags::EMPTY)
    }

    pub fn is_space_tree(self) -> bool {
        self.has(page_flags::SPACE_TREE)
    }

    pub fn is_index(self) -> bool {
        self.has(page_flags::INDEX)
    }

    pub fn is_long_value(self) -> bool {
        self.has(page_flags::LONG_VALUE)
    }

    pub fn is_new_record_format(self) -> bool {
        self.has(page_flags::NEW_RECORD_FORMAT)
    }

    pub fn is_scrubbed(self) -> bool {
        self.has(page_flags::SCRUBBED)
    }
}

/// Decoded page tag. `offset` is relative to the data area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTag {
    pub offset: u16,
    pub size: u16,
    pub flags: u8,
}

impl PageTag {
    pub fn is_defunct(&self) -> bool {
        self.flags & tag_flags::DEFUNCT != 0
    }

    pub fn has_common_key(&self) -> bool {
        self.flags & tag_flags::HAS_COMMON_KEY != 0
    }
}

/// One tagged value borrowed from a page.
#[derive(Debug, Clone, Copy)]
pub struct PageValue<'a> {
    pub data: &'a [u8],
    pub flags: u8,
    /// Offset of `data` from the start of the page.
    pub page_offset: usize,
    flags_in_first_word: bool,
}

impl<'a> PageValue<'a> {
    /// Reads a u16 from the value, stripping the tag flags from the first
    /// word on extended pages.
    pub fn read_u16(&self, offset: usize, what: &'static str) -> Result<u16> {
        let value = read_u16(self.data, offset, what)?;
        if offset == 0 && self.flags_in_first_word {
            Ok(value & LEGACY_TAG_VALUE_MASK)
        } else {
            Ok(value)
        }
    }

    pub fn is_defunct(&self) -> bool {
        self.flags & tag_flags::DEFUNCT != 0
    }

    pub fn has_common_key(&self) -> bool {
        self.flags & tag_flags::HAS_COMMON_KEY != 0
    }
}

/// A page borrowed from a page source.
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    number: u32,
    data: &'a [u8],
    header: &'a PageHeader,
    extended: bool,
}

impl<'a> Page<'a> {
    pub fn new(number: u32, data: &'a [u8], format: &FormatOptions) -> Result<Self> {
        let extended = format.extended_page_header;
        let header_size = if extended {
            EXTENDED_PAGE_HEADER_SIZE
        } else {
            PAGE_HEADER_SIZE
        };
        if data.len() < header_size + PAGE_TAG_SIZE {
            return Err(EseError::MalformedPage {
                page_number: number,
                reason: format!("{} bytes cannot hold a page header", data.len()),
            }
            .into());
        }
        Ok(Self {
            number,
            data,
            header: PageHeader::from_bytes(data)?,
            extended,
        })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn header(&self) -> &'a PageHeader {
        self.header
    }

    pub fn flags(&self) -> PageFlags {
        self.header.flags()
    }

    pub fn previous_page(&self) -> u32 {
        self.header.previous_page()
    }

    pub fn next_page(&self) -> u32 {
        self.header.next_page()
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    pub fn header_size(&self) -> usize {
        if self.extended {
            EXTENDED_PAGE_HEADER_SIZE
        } else {
            PAGE_HEADER_SIZE
        }
    }

    pub fn tag_count(&self) -> usize {
        self.header.available_page_tag() as usize
    }

    fn data_area(&self) -> &'a [u8] {
        &self.data[self.header_size()..]
    }

    fn malformed(&self, reason: String) -> eyre::Report {
        EseError::MalformedPage {
            page_number: self.number,
            reason,
        }
        .into()
    }

    /// Reads tag `index`. On extended pages `flags` is left at zero; the
    /// flags are only known once the value itself is read.
    pub fn tag(&self, index: usize) -> Result<PageTag> {
        if index >= self.tag_count() {
            return Err(self.malformed(format!(
                "tag {} requested but page has {} tags",
                index,
                self.tag_count()
            )));
        }
        let tag_position = index
            .checked_add(1)
            .and_then(|n| n.checked_mul(PAGE_TAG_SIZE))
            .and_then(|n| self.data.len().checked_sub(n))
            .filter(|&pos| pos >= self.header_size())
            .ok_or_else(|| {
                self.malformed(format!("tag {} overlaps the page header", index))
            })?;

        let size = read_u16(self.data, tag_position, "page tag size")?;
        let offset = read_u16(self.data, tag_position + 2, "page tag offset")?;

        let tag = if self.extended {
            PageTag {
                offset: offset & EXTENDED_TAG_VALUE_MASK,
                size: size & EXTENDED_TAG_VALUE_MASK,
                flags: 0,
            }
        } else {
            PageTag {
                offset: offset & LEGACY_TAG_VALUE_MASK,
                size: size & LEGACY_TAG_VALUE_MASK,
                flags: (offset >> TAG_FLAGS_SHIFT) as u8,
            }
        };
        Ok(tag)
    }

    /// Returns the value located by tag `index`, bounds-checked against the
    /// data area.
    pub fn value(&self, index: usize) -> Result<PageValue<'a>> {
        let tag = self.tag(index)?;
        let area = self.data_area();
        let data = slice(area, tag.offset as usize, tag.size as usize, "page value")
            .map_err(|_| {
                self.malformed(format!(
                    "tag {} value of {} bytes at offset {} exceeds data area of {}",
                    index,
                    tag.size,
                    tag.offset,
                    area.len()
                ))
            })?;

        let flags = if self.extended && data.len() >= 2 {
            (u16::from_le_bytes([data[0], data[1]]) >> TAG_FLAGS_SHIFT) as u8
        } else {
            tag.flags
        };

        Ok(PageValue {
            data,
            flags,
            page_offset: self.header_size() + tag.offset as usize,
            flags_in_first_word: self.extended,
        })
    }

    /// Tag 0 of a non-root page: the common key shared by its entries. On
    /// extended pages the tag flags are cleared from the second byte.
    pub fn common_key(&self) -> Result<Option<Key>> {
        if self.tag_count() == 0 || self.flags().is_root() {
            return Ok(None);
        }
        let value = self.value(0)?;
        let mut key = Key::new(value.data);
        if self.extended {
            key.mask_byte(1, EXTENDED_FIRST_WORD_HIGH_MASK);
        }
        Ok(Some(key))
    }

    /// Verifies the XOR checksum. Pages with a zero checksum were never
    /// written and are accepted; extended-header pages use ECC checksums
    /// that are not verified.
    pub fn verify_checksum(&self, format: &FormatOptions) -> Result<()> {
        let stored = self.header.xor_checksum();
        if stored == 0 || self.extended {
            return Ok(());
        }
        let calculated = if format.uses_page_number_checksum() {
            xor32_checksum(&self.data[8..], self.number)
        } else {
            xor32_checksum(&self.data[4..], XOR_CHECKSUM_SEED)
        };
        if stored != calculated {
            tracing::warn!(page = self.number, stored, calculated, "page checksum mismatch");
            return Err(EseError::ChecksumMismatch {
                page_number: self.number,
                stored,
                calculated,
            }
            .into());
        }
        Ok(())
    }
}

/// XOR of every little-endian u32 in `data`, starting from `seed`. A trailing
/// partial word is ignored.
pub fn xor32_checksum(data: &[u8], seed: u32) -> u32 {
    data.chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .fold(seed, |acc, word| acc ^ word)
}


#[cfg(test)]
mod tests {
    use super::test_support::PageWriter;
    use super::*;
    use crate::error::{ese_error, kind_of, ErrorKind};

    fn legacy() -> FormatOptions {
        FormatOptions::from_versions(0x620, 0x0b, 4096)
    }

    fn extended() -> FormatOptions {
        FormatOptions::from_versions(0x620, 0x11, 16384)
    }

    #[test]
    fn page_header_size_is_40() {
        assert_eq!(std::mem::size_of::<PageHeader>(), 40);
        assert_eq!(std::mem::size_of::<ExtendedPageHeader>(), 40);
    }

    #[test]
    fn header_fields_and_flags() {
        let data = PageWriter::new(4096, page_flags::LEAF | page_flags::ROOT)
            .links(7, 9)
            .value(b"ext", 0)
            .build();
        let page = Page::new(5, &data, &legacy()).unwrap();

        assert_eq!(page.previous_page(), 7);
        assert_eq!(page.next_page(), 9);
        assert_eq!(page.tag_count(), 1);
        assert!(page.flags().is_leaf());
        assert!(page.flags().is_root());
        assert!(!page.flags().is_parent());
        assert!(!page.flags().is_long_value());
    }

    #[test]
    fn legacy_tags_carry_flags_in_offset_high_bits() {
        let data = PageWriter::new(4096, page_flags::LEAF)
            .value(b"common", 0)
            .value(b"entry", tag_flags::HAS_COMMON_KEY | tag_flags::DEFUNCT)
            .build();
        let page = Page::new(1, &data, &legacy()).unwrap();

        let tag = page.tag(1).unwrap();
        assert_eq!(tag.offset, 6);
        assert_eq!(tag.size, 5);
        assert!(tag.has_common_key());
        assert!(tag.is_defunct());

        let value = page.value(1).unwrap();
        assert_eq!(value.data, b"entry");
        assert_eq!(value.page_offset, PAGE_HEADER_SIZE + 6);
        assert_eq!(page.common_key().unwrap(), Some(Key::new(b"common")));
    }

    #[test]
    fn extended_tags_carry_flags_in_value_first_word() {
        let data = PageWriter::new(16384, page_flags::LEAF)
            .extended()
            .value(&[], 0)
            .value(&[0x03, 0x00, 0xaa, 0xbb, 0xcc], tag_flags::HAS_COMMON_KEY)
            .build();
        let page = Page::new(2, &data, &extended()).unwrap();

        let value = page.value(1).unwrap();
        assert!(value.has_common_key());
        assert_eq!(value.read_u16(0, "key size").unwrap(), 3);
        assert_eq!(value.read_u16(2, "tail").unwrap(), 0xbbaa);
        assert_eq!(value.page_offset, EXTENDED_PAGE_HEADER_SIZE);
    }

    #[test]
    fn extended_common_key_drops_flag_bits() {
        let data = PageWriter::new(16384, page_flags::LEAF)
            .extended()
            .value(&[0x10, 0xe2, 0x33], 0)
            .build();
        let page = Page::new(2, &data, &extended()).unwrap();

        assert_eq!(page.common_key().unwrap(), Some(Key::new(&[0x10, 0x02, 0x33])));
    }

    #[test]
    fn root_page_has_no_common_key() {
        let data = PageWriter::new(4096, page_flags::ROOT | page_flags::LEAF)
            .value(b"external header", 0)
            .build();
        let page = Page::new(1, &data, &legacy()).unwrap();

        assert_eq!(page.common_key().unwrap(), None);
    }

    #[test]
    fn tag_index_past_count_is_malformed() {
        let data = PageWriter::new(4096, page_flags::LEAF).value(b"x", 0).build();
        let page = Page::new(3, &data, &legacy()).unwrap();

        let err = page.tag(1).unwrap_err();
        assert!(matches!(
            ese_error(&err),
            Some(EseError::MalformedPage { page_number: 3, .. })
        ));
    }

    #[test]
    fn value_past_data_area_is_malformed() {
        let mut data = PageWriter::new(4096, page_flags::LEAF).value(b"x", 0).build();
        let tag_pos = 4096 - 4;
        data[tag_pos..tag_pos + 2].copy_from_slice(&0x1fffu16.to_le_bytes());
        data[tag_pos + 2..tag_pos + 4].copy_from_slice(&0x1000u16.to_le_bytes());
        let page = Page::new(3, &data, &legacy()).unwrap();

        let err = page.value(0).unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::OutOfBounds));
    }

    #[test]
    fn huge_tag_count_does_not_underflow() {
        let mut data = PageWriter::new(2048, page_flags::LEAF).build();
        data[34..36].copy_from_slice(&0xffffu16.to_le_bytes());
        let page = Page::new(3, &data, &legacy()).unwrap();

        assert!(page.tag(0).is_ok());
        assert!(page.tag(0xfffe).is_err());
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(Page::new(0, &[0u8; 20], &legacy()).is_err());
    }

    #[test]
    fn xor32_folds_words_from_seed() {
        let data = [0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0xff];

        assert_eq!(xor32_checksum(&data, 0), 3);
        assert_eq!(xor32_checksum(&data, 3), 0);
    }

    #[test]
    fn checksum_seeded_with_page_number() {
        let mut data = PageWriter::new(4096, page_flags::LEAF).value(b"row", 0).build();
        let checksum = xor32_checksum(&data[8..], 12);
        data[0..4].copy_from_slice(&checksum.to_le_bytes());
        let format = FormatOptions::from_versions(0x620, 0x0c, 4096);

        Page::new(12, &data, &format).unwrap().verify_checksum(&format).unwrap();

        let err = Page::new(13, &data, &format)
            .unwrap()
            .verify_checksum(&format)
            .unwrap_err();
        assert!(matches!(
            ese_error(&err),
            Some(EseError::ChecksumMismatch { page_number: 13, .. })
        ));
    }

    #[test]
    fn old_revision_checksum_uses_signature_seed() {
        let mut data = PageWriter::new(4096, page_flags::LEAF).value(b"row", 0).build();
        let checksum = xor32_checksum(&data[4..], XOR_CHECKSUM_SEED);
        data[0..4].copy_from_slice(&checksum.to_le_bytes());

        let page = Page::new(1, &data, &legacy()).unwrap();
        page.verify_checksum(&legacy()).unwrap();
    }

    #[test]
    fn zero_checksum_is_not_verified() {
        let data = PageWriter::new(4096, page_flags::LEAF).value(b"row", 0).build();

        Page::new(1, &data, &legacy()).unwrap().verify_checksum(&legacy()).unwrap();
    }
}
