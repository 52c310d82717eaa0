//! # ESE Format Constants
//!
//! This module centralizes the numeric constants of the ESE on-disk format,
//! grouping interdependent values together. Constants that depend on each
//! other are co-located and checked at compile time.
//!
//! ## Dependency Graph
//!
//! ```text
//! page_size (from the file header)
//!       │
//!       └─> page n lives at file offset (n + 1) * page_size
//!           (the first page-sized block holds the file header)
//!
//! PAGE_HEADER_SIZE (40 bytes)
//!       │
//!       └─> EXTENDED_PAGE_HEADER_SIZE (80 bytes)
//!             used when format_revision >= FORMAT_REVISION_EXTENDED_PAGE_HEADER
//!             and page_size >= EXTENDED_PAGE_SIZE_THRESHOLD
//!
//! PAGE_TAG_SIZE (4 bytes)
//!       │
//!       ├─> LEGACY_TAG_VALUE_MASK (13 bits), flags in the top 3 bits of the offset
//!       └─> EXTENDED_TAG_VALUE_MASK (15 bits), flags in the value's first u16
//!
//! ROW_HEADER_SIZE (4 bytes)
//!       │
//!       ├─> MAX_FIXED_COLUMN_ID (127)
//!       ├─> FIRST_VARIABLE_COLUMN_ID (128) .. MAX_VARIABLE_COLUMN_ID (255)
//!       └─> FIRST_TAGGED_COLUMN_ID (256)
//! ```
//!
//! ## Critical Invariants
//!
//! 1. `EXTENDED_PAGE_HEADER_SIZE == 2 * PAGE_HEADER_SIZE`
//! 2. Fixed, variable and tagged identifier ranges are contiguous
//! 3. `MAX_TREE_DEPTH` fits the navigator's inline stack

// ============================================================================
// FILE HEADER
// ============================================================================

/// File signature stored at offset 4 of the file header.
pub const FILE_SIGNATURE: u32 = 0x89ab_cdef;

/// Number of bytes of the file header that are decoded.
pub const FILE_HEADER_SIZE: usize = 348;

/// Number of bytes covered by the file header checksum.
pub const FILE_HEADER_CHECKSUM_SIZE: usize = 668;

/// Page sizes a valid file may declare.
pub const SUPPORTED_PAGE_SIZES: [u32; 5] = [2048, 4096, 8192, 16384, 32768];

/// Page size assumed by files that predate the page size field.
pub const DEFAULT_PAGE_SIZE: u32 = 4096;

/// File type value for a database (the other value, 1, is a streaming file).
pub const FILE_TYPE_DATABASE: u32 = 0;

// ============================================================================
// FORMAT VERSIONS
// ============================================================================

/// Format version of all files written by ESE98 and later.
pub const FORMAT_VERSION_ESE98: u32 = 0x620;

/// Last revision of 0x620 that stores tagged columns linearly.
pub const FORMAT_REVISION_LAST_LINEAR_TAGGED: u32 = 0x02;

/// First revision that seeds the page checksum with the page number.
pub const FORMAT_REVISION_NEW_CHECKSUM: u32 = 0x0c;

/// First revision that may use the extended page header.
pub const FORMAT_REVISION_EXTENDED_PAGE_HEADER: u32 = 0x11;

/// Page size at and above which the extended page header is used.
pub const EXTENDED_PAGE_SIZE_THRESHOLD: u32 = 16384;

// ============================================================================
// PAGE LAYOUT
// ============================================================================

pub const PAGE_HEADER_SIZE: usize = 40;

pub const EXTENDED_PAGE_HEADER_SIZE: usize = 80;

pub const PAGE_TAG_SIZE: usize = 4;

pub const LEGACY_TAG_VALUE_MASK: u16 = 0x1fff;

pub const EXTENDED_TAG_VALUE_MASK: u16 = 0x7fff;

/// Shift that moves the tag flags into the low 3 bits.
pub const TAG_FLAGS_SHIFT: u16 = 13;

pub const XOR_CHECKSUM_SEED: u32 = 0x89ab_cdef;

const _: () = assert!(
    FILE_HEADER_CHECKSUM_SIZE % 4 == 0 && FILE_HEADER_CHECKSUM_SIZE <= 2048,
    "file header checksum covers whole words inside the smallest page"
);

const _: () = assert!(
    EXTENDED_PAGE_HEADER_SIZE == 2 * PAGE_HEADER_SIZE,
    "extended page header appends a second 40-byte block"
);

const _: () = assert!(
    (LEGACY_TAG_VALUE_MASK as u32 + 1) << 3 == 1 << 16,
    "legacy tag values leave exactly 3 bits for flags"
);

// ============================================================================
// PAGE FLAGS
// ============================================================================

pub mod page_flags {
    pub const ROOT: u32 = 0x0000_0001;
    pub const LEAF: u32 = 0x0000_0002;
    pub const PARENT: u32 = 0x0000_0004;
    pub const EMPTY: u32 = 0x0000_0008;
    pub const SPACE_TREE: u32 = 0x0000_0020;
    pub const INDEX: u32 = 0x0000_0040;
    pub const LONG_VALUE: u32 = 0x0000_0080;
    pub const NEW_RECORD_FORMAT: u32 = 0x0000_2000;
    pub const SCRUBBED: u32 = 0x0000_4000;
}

// ============================================================================
// PAGE TAG FLAGS
// ============================================================================

pub mod tag_flags {
    pub const VERSION: u8 = 0x01;
    pub const DEFUNCT: u8 = 0x02;
    pub const HAS_COMMON_KEY: u8 = 0x04;
}

// ============================================================================
// TREE LIMITS
// ============================================================================

/// Hard ceiling on descent depth. Real trees are rarely deeper than 5 levels;
/// anything beyond this is treated as a corrupted or cyclic tree.
pub const MAX_TREE_DEPTH: usize = 64;

/// Root page of the catalog table (`MSysObjects`).
pub const CATALOG_ROOT_PAGE: u32 = 4;

/// Root page of the catalog's shadow copy (`MSysObjectsShadow`).
pub const SHADOW_CATALOG_ROOT_PAGE: u32 = 24;

const _: () = assert!(MAX_TREE_DEPTH <= 64, "navigator stack is sized for 64 frames");

// ============================================================================
// RECORD LAYOUT
// ============================================================================

pub const ROW_HEADER_SIZE: usize = 4;

pub const MAX_FIXED_COLUMN_ID: u32 = 127;

pub const FIRST_VARIABLE_COLUMN_ID: u32 = 128;

pub const MAX_VARIABLE_COLUMN_ID: u32 = 255;

pub const FIRST_TAGGED_COLUMN_ID: u32 = 256;

/// Set on a variable end offset when the column holds no value.
pub const VARIABLE_ABSENT_BIT: u16 = 0x8000;

pub const VARIABLE_OFFSET_MASK: u16 = 0x7fff;

/// Mask for tagged offsets on pages without the extended header.
pub const TAGGED_OFFSET_MASK: u16 = 0x3fff;

/// Mask for tagged offsets on pages with the extended header.
pub const EXTENDED_TAGGED_OFFSET_MASK: u16 = 0x7fff;

/// Set on a tagged offset when the entry starts with a flags byte.
pub const TAGGED_HAS_FLAGS_BIT: u16 = 0x4000;

pub const TAGGED_ENTRY_SIZE: usize = 4;

/// Set on a linear tagged size when the entry starts with a flags byte.
pub const LINEAR_TAGGED_HAS_FLAGS_BIT: u16 = 0x8000;

pub const LINEAR_TAGGED_SIZE_MASK: u16 = 0x5fff;

const _: () = assert!(
    MAX_FIXED_COLUMN_ID + 1 == FIRST_VARIABLE_COLUMN_ID
        && MAX_VARIABLE_COLUMN_ID + 1 == FIRST_TAGGED_COLUMN_ID,
    "column identifier ranges must be contiguous"
);

// ============================================================================
// VALUE FLAGS (leading byte of a tagged value)
// ============================================================================

pub mod value_flags {
    pub const VARIABLE_SIZE: u8 = 0x01;
    pub const COMPRESSED: u8 = 0x02;
    pub const LONG_VALUE: u8 = 0x04;
    pub const MULTI_VALUE: u8 = 0x08;
    pub const MULTI_VALUE_OFFSET: u8 = 0x10;
}

// ============================================================================
// COLUMN FLAGS
// ============================================================================

pub mod column_flags {
    pub const FIXED: u32 = 0x0000_0001;
    pub const TAGGED: u32 = 0x0000_0002;
    pub const NOT_NULL: u32 = 0x0000_0004;
    pub const VERSION: u32 = 0x0000_0008;
    pub const AUTO_INCREMENT: u32 = 0x0000_0010;
    pub const MULTI_VALUED: u32 = 0x0000_0400;
    pub const ESCROW_UPDATE: u32 = 0x0000_0800;
    pub const TEMPLATE_COLUMN: u32 = 0x0001_0000;
    pub const COMPRESSED: u32 = 0x0008_0000;
}

// ============================================================================
// CATALOG LAYOUT
// ============================================================================

pub const CATALOG_MIN_LAST_FIXED: u8 = 5;

pub const CATALOG_MAX_LAST_FIXED: u8 = 12;

/// Variable column holding the entry name.
pub const CATALOG_NAME_COLUMN: u32 = 128;

/// Variable column holding the template table name.
pub const CATALOG_TEMPLATE_COLUMN: u32 = 130;

/// Variable column holding the default value.
pub const CATALOG_DEFAULT_VALUE_COLUMN: u32 = 131;

// ============================================================================
// LONG VALUES
// ============================================================================

pub const LONG_VALUE_KEY_SIZE: usize = 4;

pub const LONG_VALUE_ANCHOR_SIZE: usize = 8;

pub const LONG_VALUE_SEGMENT_SUFFIX_SIZE: usize = 4;

// ============================================================================
// CODEPAGES
// ============================================================================

pub const CODEPAGE_UNICODE: u32 = 1200;

pub const CODEPAGE_WINDOWS_1252: u32 = 1252;

pub const CODEPAGE_ASCII: u32 = 20127;

pub const CODEPAGE_ISO_8859_1: u32 = 28591;

pub const CODEPAGE_UTF8: u32 = 65001;

pub const DEFAULT_CODEPAGE: u32 = CODEPAGE_WINDOWS_1252;

// ============================================================================
// COMPRESSION
// ============================================================================

pub const XPRESS_MARKER: u8 = 0x18;

/// Set in the leading byte of 7-bit data whose content is narrow text.
pub const SEVEN_BIT_NARROW_FLAG: u8 = 0x10;

pub const XPRESS_MAX_MATCH: usize = 32771;
