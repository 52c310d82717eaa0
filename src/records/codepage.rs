//! # Codepages
//!
//! Text columns carry a Windows codepage number. 1200 marks Unicode text
//! (UTF-16LE, though some writers store UTF-8 under the same number); every
//! other supported codepage is a narrow single-byte or UTF-8 encoding.
//!
//! [`CodepageTable`] decides the default for columns that declare codepage 0
//! and which codepages are Unicode. [`WindowsCodepages`] is the stock table.

use eyre::Result;

use crate::config::{
    CODEPAGE_ASCII, CODEPAGE_ISO_8859_1, CODEPAGE_UNICODE, CODEPAGE_UTF8, CODEPAGE_WINDOWS_1252,
    DEFAULT_CODEPAGE,
};
use crate::error::EseError;

pub trait CodepageTable {
    fn default_codepage(&self) -> u32;

    fn is_unicode(&self, codepage: u32) -> bool;

    /// Codepage a column with declared codepage `declared` is decoded with.
    fn resolve(&self, declared: u32) -> u32 {
        if declared == 0 {
            self.default_codepage()
        } else {
            declared
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowsCodepages {
    default_codepage: u32,
}

impl WindowsCodepages {
    pub fn new(default_codepage: u32) -> Self {
        Self { default_codepage }
    }
}

impl Default for WindowsCodepages {
    fn default() -> Self {
        Self::new(DEFAULT_CODEPAGE)
    }
}

impl CodepageTable for WindowsCodepages {
    fn default_codepage(&self) -> u32 {
        self.default_codepage
    }

    fn is_unicode(&self, codepage: u32) -> bool {
        codepage == CODEPAGE_UNICODE
    }
}

/// Windows-1252 assignments for 0x80..=0x9f; undefined slots map to U+FFFD.
const WINDOWS_1252_HIGH: [char; 32] = [
    '\u{20ac}', '\u{fffd}', '\u{201a}', '\u{0192}', '\u{201e}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02c6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{fffd}', '\u{017d}', '\u{fffd}',
    '\u{fffd}', '\u{2018}', '\u{2019}', '\u{201c}', '\u{201d}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02dc}', '\u{2122}', '\u{0161}', '\u{203a}', '\u{0153}', '\u{fffd}', '\u{017e}', '\u{0178}',
];

/// Decodes narrow text in one of the supported non-Unicode codepages.
pub fn decode_narrow(bytes: &[u8], codepage: u32) -> Result<String> {
    let text = match codepage {
        CODEPAGE_WINDOWS_1252 => bytes
            .iter()
            .map(|&b| match b {
                0x80..=0x9f => WINDOWS_1252_HIGH[(b - 0x80) as usize],
                _ => b as char,
            })
            .collect(),
        CODEPAGE_ISO_8859_1 => bytes.iter().map(|&b| b as char).collect(),
        CODEPAGE_ASCII => bytes
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { '\u{fffd}' })
            .collect(),
        CODEPAGE_UTF8 => String::from_utf8_lossy(bytes).into_owned(),
        other => {
            return Err(EseError::UnsupportedFormat(format!("codepage {}", other)).into());
        }
    };
    Ok(text)
}

pub fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{kind_of, ErrorKind};

    #[test]
    fn zero_codepage_resolves_to_default() {
        let table = WindowsCodepages::default();

        assert_eq!(table.resolve(0), 1252);
        assert_eq!(table.resolve(1200), 1200);
        assert_eq!(WindowsCodepages::new(28591).resolve(0), 28591);
    }

    #[test]
    fn only_1200_is_unicode() {
        let table = WindowsCodepages::default();

        assert!(table.is_unicode(1200));
        assert!(!table.is_unicode(1252));
        assert!(!table.is_unicode(65001));
    }

    #[test]
    fn windows_1252_maps_the_c1_range() {
        assert_eq!(decode_narrow(&[0x80, b'5'], 1252).unwrap(), "\u{20ac}5");
        assert_eq!(decode_narrow(&[0xe9], 1252).unwrap(), "\u{e9}");
    }

    #[test]
    fn latin1_passes_c1_controls_through() {
        assert_eq!(decode_narrow(&[0x80], 28591).unwrap(), "\u{80}");
    }

    #[test]
    fn ascii_replaces_high_bytes() {
        assert_eq!(decode_narrow(&[b'a', 0xff], 20127).unwrap(), "a\u{fffd}");
    }

    #[test]
    fn unknown_codepage_is_unsupported() {
        let err = decode_narrow(b"x", 932).unwrap_err();

        assert_eq!(kind_of(&err), Some(ErrorKind::UnsupportedFormat));
    }

    #[test]
    fn utf16_ignores_odd_trailing_byte() {
        assert_eq!(decode_utf16le(&[b'h', 0, b'i', 0, 0x41]), "hi");
    }
}
