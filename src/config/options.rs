//! # Decode Options
//!
//! Two historical layout switches decide how pages and rows are read:
//!
//! - `extended_page_header`: 80-byte page headers, 15-bit page tags, 15-bit
//!   tagged offsets and an unconditional flags byte on tagged values.
//! - `legacy_tagged_layout`: tagged columns stored as a linear stream of
//!   (id, size, payload) triples instead of an offset table.
//!
//! Both are derived from the file header by [`FormatOptions::from_versions`]
//! but are plain booleans, so a caller that knows better may override either.
//!
//! [`DecodeContext`] bundles the format with the default codepage and the
//! tracing span that decoders enter. The default span is `Span::none()`,
//! which makes every event a no-op unless the caller installs a subscriber
//! and passes a real span.

use tracing::Span;

use super::constants::{
    DEFAULT_CODEPAGE, EXTENDED_PAGE_SIZE_THRESHOLD, FORMAT_REVISION_EXTENDED_PAGE_HEADER,
    FORMAT_REVISION_LAST_LINEAR_TAGGED, FORMAT_REVISION_NEW_CHECKSUM, FORMAT_VERSION_ESE98,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub extended_page_header: bool,
    pub legacy_tagged_layout: bool,
    pub page_size: u32,
    pub format_revision: u32,
}

impl FormatOptions {
    pub fn from_versions(format_version: u32, format_revision: u32, page_size: u32) -> Self {
        Self {
            extended_page_header: format_revision >= FORMAT_REVISION_EXTENDED_PAGE_HEADER
                && page_size >= EXTENDED_PAGE_SIZE_THRESHOLD,
            legacy_tagged_layout: format_version == FORMAT_VERSION_ESE98
                && format_revision <= FORMAT_REVISION_LAST_LINEAR_TAGGED,
            page_size,
            format_revision,
        }
    }

    pub fn with_extended_page_header(mut self, enabled: bool) -> Self {
        self.extended_page_header = enabled;
        self
    }

    pub fn with_legacy_tagged_layout(mut self, enabled: bool) -> Self {
        self.legacy_tagged_layout = enabled;
        self
    }

    /// Whether page checksums are seeded with the page number.
    pub fn uses_page_number_checksum(&self) -> bool {
        self.format_revision >= FORMAT_REVISION_NEW_CHECKSUM
    }
}

impl Default for FormatOptions {
    /// Modern 8 KiB layout: index tagged layout, legacy page header.
    fn default() -> Self {
        Self::from_versions(FORMAT_VERSION_ESE98, 0x14, 8192)
    }
}

#[derive(Debug, Clone)]
pub struct DecodeContext {
    pub format: FormatOptions,
    pub default_codepage: u32,
    span: Span,
}

impl DecodeContext {
    pub fn new(format: FormatOptions) -> Self {
        Self {
            format,
            default_codepage: DEFAULT_CODEPAGE,
            span: Span::none(),
        }
    }

    pub fn with_default_codepage(mut self, codepage: u32) -> Self {
        self.default_codepage = codepage;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Default for DecodeContext {
    fn default() -> Self {
        Self::new(FormatOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn early_ese98_revisions_use_linear_tagged_layout() {
        let options = FormatOptions::from_versions(0x620, 0x02, 4096);

        assert!(options.legacy_tagged_layout);
        assert!(!options.extended_page_header);
    }

    #[test]
    fn extended_header_needs_both_revision_and_page_size() {
        assert!(FormatOptions::from_versions(0x620, 0x11, 32768).extended_page_header);
        assert!(!FormatOptions::from_versions(0x620, 0x11, 8192).extended_page_header);
        assert!(!FormatOptions::from_versions(0x620, 0x0c, 32768).extended_page_header);
    }

    #[test]
    fn switches_can_be_overridden_independently() {
        let options = FormatOptions::from_versions(0x620, 0x14, 8192)
            .with_legacy_tagged_layout(true)
            .with_extended_page_header(true);

        assert!(options.legacy_tagged_layout);
        assert!(options.extended_page_header);
        assert_eq!(options.page_size, 8192);
    }

    #[test]
    fn default_context_is_silent_and_uses_windows_1252() {
        let ctx = DecodeContext::default();

        assert_eq!(ctx.default_codepage, 1252);
        assert!(ctx.span().is_none());
    }
}
