//! # File Header
//!
//! The first page-sized block of every ESE file holds the file header (a
//! shadow copy follows in the second block). Only the leading 348 bytes are
//! decoded; the remainder holds repair and backup bookkeeping the decoder
//! never consults.
//!
//! ## Header Layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     checksum
//! 4       4     signature (0x89abcdef)
//! 8       4     format version
//! 12      4     file type (0 = database, 1 = streaming file)
//! 16      8     database time
//! 24      28    database signature
//! 52      4     database state
//! ...
//! 212     4     last object identifier
//! 232     4     format revision
//! 236     4     page size
//! ...
//! 340     4     creation format version
//! 344     4     creation format revision
//! ```
//!
//! ## Zerocopy Safety
//!
//! `FileHeader` is `Unaligned` and built from little-endian wrapper types, so
//! it can be borrowed directly from an mmap at any address.

use eyre::Result;
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{
    FormatOptions, DEFAULT_PAGE_SIZE, FILE_HEADER_CHECKSUM_SIZE, FILE_HEADER_SIZE,
    FILE_SIGNATURE, FILE_TYPE_DATABASE, SUPPORTED_PAGE_SIZES, XOR_CHECKSUM_SEED,
};
use crate::encoding::bytes::slice;
use crate::error::EseError;
use crate::storage::page::xor32_checksum;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseState {
    JustCreated,
    DirtyShutdown,
    CleanShutdown,
    BeingConverted,
    ForceDetach,
    Unknown(u32),
}

impl DatabaseState {
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => DatabaseState::JustCreated,
            2 => DatabaseState::DirtyShutdown,
            3 => DatabaseState::CleanShutdown,
            4 => DatabaseState::BeingConverted,
            5 => DatabaseState::ForceDetach,
            other => DatabaseState::Unknown(other),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FileHeader {
    checksum: U32,
    signature: U32,
    format_version: U32,
    file_type: U32,
    database_time: [u8; 8],
    database_signature: [u8; 28],
    database_state: U32,
    consistent_position: [u8; 8],
    consistent_time: [u8; 8],
    attach_time: [u8; 8],
    attach_position: [u8; 8],
    detach_time: [u8; 8],
    detach_position: [u8; 8],
    unknown1: [u8; 4],
    log_signature: [u8; 28],
    previous_full_backup: [u8; 24],
    previous_incremental_backup: [u8; 24],
    current_full_backup: [u8; 24],
    shadowing_disabled: U32,
    last_object_identifier: U32,
    index_update_major_version: U32,
    index_update_minor_version: U32,
    index_update_build_number: U32,
    index_update_service_pack_number: U32,
    format_revision: U32,
    page_size: U32,
    repair_count: U32,
    repair_time: [u8; 8],
    unknown2: [u8; 28],
    scrub_database_time: [u8; 8],
    scrub_time: [u8; 8],
    required_log: [u8; 8],
    upgrade_exchange5_format: U32,
    upgrade_free_pages: U32,
    upgrade_space_map_pages: U32,
    current_shadow_volume_backup: [u8; 24],
    creation_format_version: U32,
    creation_format_revision: U32,
}

const _: () = assert!(std::mem::size_of::<FileHeader>() == FILE_HEADER_SIZE);

impl FileHeader {
    /// Borrows the header from the start of `bytes` and checks the signature.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        if bytes.len() < FILE_HEADER_SIZE {
            return Err(
                EseError::out_of_bounds("file header", 0, FILE_HEADER_SIZE, bytes.len()).into(),
            );
        }

        let header = Self::ref_from_bytes(&bytes[..FILE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse FileHeader: {:?}", e))?;

        if header.signature() != FILE_SIGNATURE {
            return Err(EseError::UnsupportedFormat(format!(
                "file signature {:#010x} is not {:#010x}",
                header.signature(),
                FILE_SIGNATURE
            ))
            .into());
        }

        Ok(header)
    }

    /// Checks the fields the decoder depends on.
    pub fn validate(&self) -> Result<()> {
        if self.file_type() != FILE_TYPE_DATABASE {
            return Err(EseError::UnsupportedFormat(format!(
                "file type {} is not a database",
                self.file_type()
            ))
            .into());
        }
        let page_size = self.effective_page_size();
        if !SUPPORTED_PAGE_SIZES.contains(&page_size) {
            return Err(EseError::UnsupportedFormat(format!("page size {}", page_size)).into());
        }
        Ok(())
    }

    /// Checks the XOR checksum over the first 668 bytes of the header block.
    /// A dirty-shutdown database may legitimately carry a stale checksum.
    pub fn verify_checksum(&self, block: &[u8]) -> Result<()> {
        if self.database_state() == DatabaseState::DirtyShutdown {
            return Ok(());
        }
        let covered = slice(block, 4, FILE_HEADER_CHECKSUM_SIZE - 4, "file header block")?;
        let calculated = xor32_checksum(covered, XOR_CHECKSUM_SEED);
        if calculated != self.checksum() {
            return Err(EseError::ChecksumMismatch {
                page_number: 0,
                stored: self.checksum(),
                calculated,
            }
            .into());
        }
        Ok(())
    }

    zerocopy_getters! {
        checksum: u32,
        signature: u32,
        format_version: u32,
        file_type: u32,
        last_object_identifier: u32,
        format_revision: u32,
        page_size: u32,
        repair_count: u32,
        creation_format_version: u32,
        creation_format_revision: u32,
    }

    raw_getters! {
        database_time: 8,
        database_signature: 28,
        log_signature: 28,
    }

    pub fn database_state(&self) -> DatabaseState {
        DatabaseState::from_u32(self.database_state.get())
    }

    /// Files written before the page size field existed store zero.
    pub fn effective_page_size(&self) -> u32 {
        match self.page_size() {
            0 => DEFAULT_PAGE_SIZE,
            size => size,
        }
    }

    pub fn format_options(&self) -> FormatOptions {
        FormatOptions::from_versions(
            self.format_version(),
            self.format_revision(),
            self.effective_page_size(),
        )
    }
}

impl FormatOptions {
    pub fn from_header(header: &FileHeader) -> Self {
        header.format_options()
    }
}

/// Builds a signed header block of `FILE_HEADER_CHECKSUM_SIZE` bytes.
#[cfg(test)]
pub(crate) fn build_file_header(format_version: u32, format_revision: u32, page_size: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; FILE_HEADER_CHECKSUM_SIZE];
    bytes[4..8].copy_from_slice(&FILE_SIGNATURE.to_le_bytes());
    bytes[8..12].copy_from_slice(&format_version.to_le_bytes());
    bytes[52..56].copy_from_slice(&3u32.to_le_bytes());
    bytes[232..236].copy_from_slice(&format_revision.to_le_bytes());
    bytes[236..240].copy_from_slice(&page_size.to_le_bytes());
    bytes[340..344].copy_from_slice(&format_version.to_le_bytes());
    bytes[344..348].copy_from_slice(&format_revision.to_le_bytes());
    let checksum = xor32_checksum(&bytes[4..], XOR_CHECKSUM_SEED);
    bytes[0..4].copy_from_slice(&checksum.to_le_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{kind_of, ErrorKind};

    #[test]
    fn file_header_size_is_348() {
        assert_eq!(std::mem::size_of::<FileHeader>(), 348);
    }

    #[test]
    fn fields_are_read_from_documented_offsets() {
        let bytes = build_file_header(0x620, 0x14, 8192);
        let header = FileHeader::from_bytes(&bytes).unwrap();

        assert_eq!(header.signature(), FILE_SIGNATURE);
        assert_eq!(header.format_version(), 0x620);
        assert_eq!(header.format_revision(), 0x14);
        assert_eq!(header.page_size(), 8192);
        assert_eq!(header.database_state(), DatabaseState::CleanShutdown);
        assert_eq!(header.creation_format_revision(), 0x14);
        header.validate().unwrap();
    }

    #[test]
    fn bad_signature_is_unsupported_format() {
        let mut bytes = build_file_header(0x620, 0x14, 8192);
        bytes[4] = 0;

        let err = FileHeader::from_bytes(&bytes).unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::UnsupportedFormat));
    }

    #[test]
    fn short_buffer_is_out_of_bounds() {
        let err = FileHeader::from_bytes(&[0u8; 100]).unwrap_err();

        assert_eq!(kind_of(&err), Some(ErrorKind::OutOfBounds));
    }

    #[test]
    fn zero_page_size_falls_back_to_4096() {
        let bytes = build_file_header(0x620, 0x09, 0);
        let header = FileHeader::from_bytes(&bytes).unwrap();

        assert_eq!(header.effective_page_size(), 4096);
        header.validate().unwrap();
    }

    #[test]
    fn odd_page_size_fails_validation() {
        let bytes = build_file_header(0x620, 0x14, 5000);
        let header = FileHeader::from_bytes(&bytes).unwrap();

        assert!(header.validate().is_err());
    }

    #[test]
    fn checksum_covers_header_block() {
        let mut bytes = build_file_header(0x620, 0x14, 8192);
        FileHeader::from_bytes(&bytes).unwrap().verify_checksum(&bytes).unwrap();

        bytes[600] ^= 0x01;
        let header = FileHeader::from_bytes(&bytes).unwrap();
        assert!(header.verify_checksum(&bytes).is_err());
    }

    #[test]
    fn dirty_shutdown_skips_checksum() {
        let mut bytes = build_file_header(0x620, 0x14, 8192);
        bytes[52..56].copy_from_slice(&2u32.to_le_bytes());
        bytes[600] ^= 0x01;

        let header = FileHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.database_state(), DatabaseState::DirtyShutdown);
        header.verify_checksum(&bytes).unwrap();
    }

    #[test]
    fn format_options_follow_versions() {
        let bytes = build_file_header(0x620, 0x11, 32768);
        let options = FormatOptions::from_header(FileHeader::from_bytes(&bytes).unwrap());

        assert!(options.extended_page_header);
        assert!(!options.legacy_tagged_layout);
        assert_eq!(options.page_size, 32768);
    }
}
