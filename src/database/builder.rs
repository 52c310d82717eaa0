//! # Database Builder
//!
//! `DatabaseBuilder` configures how a database is opened. Settings are
//! chained before calling `open()`:
//!
//! ```ignore
//! let db = Database::builder()
//!     .path("Windows.edb")
//!     .verify_checksums(true)
//!     .default_codepage(1252)
//!     .open()?;
//! ```
//!
//! ## Configuration Options
//!
//! | Option           | Default                 | Description                                  |
//! |------------------|-------------------------|----------------------------------------------|
//! | path             | none                    | file to memory-map                           |
//! | page_source      | none                    | caller-supplied pages instead of a file      |
//! | format_options   | derived from the header | override the layout switches                 |
//! | default_codepage | 1252                    | codepage for text columns that declare none  |
//! | verify_checksums | false                   | check header and page XOR checksums on read  |
//! | span             | `Span::none()`          | tracing span entered by every decoder        |
//!
//! Exactly one of `path` and `page_source` must be given. A page source has
//! no file header, so unless `format_options` is set the builder assumes the
//! current ESE98 revision with the source's page size.

use std::path::{Path, PathBuf};

use eyre::Result;
use tracing::Span;

use super::database::{Database, DatabaseInfo};
use crate::config::{DecodeContext, FormatOptions, DEFAULT_CODEPAGE, FORMAT_VERSION_ESE98};
use crate::error::EseError;
use crate::storage::{ChecksumVerifier, MmapPageSource, PageSource};

/// Revision assumed for page sources that carry no file header.
const HEADERLESS_FORMAT_REVISION: u32 = 0x14;

pub(crate) type DynPageSource = dyn PageSource + Send + Sync;

pub struct DatabaseBuilder {
    path: Option<PathBuf>,
    page_source: Option<Box<DynPageSource>>,
    format_options: Option<FormatOptions>,
    default_codepage: u32,
    verify_checksums: bool,
    span: Span,
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self {
            path: None,
            page_source: None,
            format_options: None,
            default_codepage: DEFAULT_CODEPAGE,
            verify_checksums: false,
            span: Span::none(),
        }
    }

    /// Reads the database from a file, mapped read-only.
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Reads pages from `source` instead of a file.
    pub fn page_source(mut self, source: Box<DynPageSource>) -> Self {
        self.page_source = Some(source);
        self
    }

    /// Overrides the layout switches derived from the file header.
    pub fn format_options(mut self, format: FormatOptions) -> Self {
        self.format_options = Some(format);
        self
    }

    pub fn default_codepage(mut self, codepage: u32) -> Self {
        self.default_codepage = codepage;
        self
    }

    pub fn verify_checksums(mut self, enabled: bool) -> Self {
        self.verify_checksums = enabled;
        self
    }

    pub fn span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Opens the source and loads the catalog.
    ///
    /// # Errors
    ///
    /// - neither or both of `path` and `page_source` were given
    /// - the file cannot be mapped or its header is invalid
    /// - checksum verification is on and the header checksum is wrong
    /// - the catalog root page cannot be read
    pub fn open(self) -> Result<Database> {
        let (source, info, detected): (Box<DynPageSource>, Option<DatabaseInfo>, FormatOptions) =
            match (self.path, self.page_source) {
                (Some(path), None) => {
                    let mmap = MmapPageSource::open(&path)?;
                    let header = mmap.header()?;
                    if self.verify_checksums {
                        header.verify_checksum(mmap.header_block())?;
                    }
                    let info = DatabaseInfo::from_header(header);
                    let format = header.format_options();
                    tracing::debug!(
                        path = %path.display(),
                        format_version = info.format_version,
                        format_revision = info.format_revision,
                        page_size = info.page_size,
                        state = ?info.state,
                        "opened database file"
                    );
                    (Box::new(mmap), Some(info), format)
                }
                (None, Some(source)) => {
                    let format = FormatOptions::from_versions(
                        FORMAT_VERSION_ESE98,
                        HEADERLESS_FORMAT_REVISION,
                        source.page_size() as u32,
                    );
                    (source, None, format)
                }
                (Some(_), Some(_)) => {
                    return Err(EseError::InvalidArgument(
                        "both a path and a page source were given".into(),
                    )
                    .into())
                }
                (None, None) => {
                    return Err(EseError::InvalidArgument(
                        "no path or page source was given".into(),
                    )
                    .into())
                }
            };

        let format = self.format_options.unwrap_or(detected);
        let source: Box<DynPageSource> = if self.verify_checksums {
            Box::new(ChecksumVerifier::new(source, format))
        } else {
            source
        };

        let ctx = DecodeContext::new(format)
            .with_default_codepage(self.default_codepage)
            .with_span(self.span);

        Database::load(source, info, ctx)
    }
}
