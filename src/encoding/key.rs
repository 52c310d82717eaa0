//! # B-Tree Key Codec
//!
//! ESE keys are opaque byte strings compared with an unsigned byte-wise
//! `memcmp`. Keys are stored prefix-compressed inside a page: an entry may
//! borrow its first `common_key_size` bytes from the page's common key and
//! store only the remaining local suffix.
//!
//! ```text
//! page common key:   [ 7f 80 00 00 12 ]
//! entry:             common_key_size = 3, local key = [ 7f 80 02 ]
//! composed key:      [ 7f 80 00 ] ++ [ 7f 80 02 ]
//! ```
//!
//! ## Comparison
//!
//! - Forward: byte-wise, a key that is a strict prefix of another sorts first.
//! - Reversed: both operands are read from their last byte towards their
//!   first. Trees whose logical order is descending store their keys so that
//!   reversed comparison yields the on-disk order.
//!
//! ## Branch Keys
//!
//! A branch entry's key is the upper bound of the child it points to. An
//! empty branch key has no upper bound and always matches, which is how the
//! rightmost child of every parent page is encoded.

use std::cmp::Ordering;
use std::fmt;

use eyre::Result;
use smallvec::SmallVec;

use crate::error::EseError;

/// Keys up to this size stay inline; ESE keys are at most 255 bytes on
/// small pages and usually far shorter.
pub const INLINE_KEY_SIZE: usize = 32;

#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Key {
    bytes: SmallVec<[u8; INLINE_KEY_SIZE]>,
}

impl Key {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: SmallVec::from_slice(bytes),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Concatenates a common prefix and a local suffix.
    pub fn compose(common_prefix: &[u8], local_suffix: &[u8]) -> Self {
        let mut bytes = SmallVec::with_capacity(common_prefix.len() + local_suffix.len());
        bytes.extend_from_slice(common_prefix);
        bytes.extend_from_slice(local_suffix);
        Self { bytes }
    }

    /// Composes a key whose first `common_size` bytes come from the page's
    /// common key. Fails when a prefix is required but none was supplied or
    /// the supplied one is too short.
    pub fn compose_with_common(
        common_key: Option<&[u8]>,
        common_size: usize,
        local_suffix: &[u8],
    ) -> Result<Self> {
        if common_size == 0 {
            return Ok(Self::new(local_suffix));
        }
        let common = common_key.ok_or_else(|| {
            EseError::MalformedKey(format!(
                "entry requires {} common key bytes but the page has no common key",
                common_size
            ))
        })?;
        if common_size > common.len() {
            return Err(EseError::MalformedKey(format!(
                "common key size {} exceeds page common key of {} bytes",
                common_size,
                common.len()
            ))
            .into());
        }
        Ok(Self::compose(&common[..common_size], local_suffix))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.bytes.starts_with(prefix)
    }

    /// ANDs byte `index` with `mask`; out-of-range indices are ignored.
    pub fn mask_byte(&mut self, index: usize, mask: u8) {
        if let Some(b) = self.bytes.get_mut(index) {
            *b &= mask;
        }
    }

    pub fn push_be_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(")?;
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

/// Unsigned byte-wise comparison, optionally reading both keys back to front.
pub fn compare(a: &[u8], b: &[u8], reversed: bool) -> Ordering {
    if reversed {
        a.iter().rev().cmp(b.iter().rev())
    } else {
        a.cmp(b)
    }
}

/// Whether a lookup for `target` must descend into the child bounded by
/// `branch_key`.
pub fn branch_covers(target: &[u8], branch_key: &[u8], reversed: bool) -> bool {
    branch_key.is_empty() || compare(target, branch_key, reversed) != Ordering::Greater
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ese_error, kind_of, ErrorKind};

    #[test]
    fn compose_concatenates_prefix_and_suffix() {
        let key = Key::compose(&[0x7f, 0x80, 0x00], &[0x7f, 0x80, 0x02]);

        assert_eq!(key.as_bytes(), &[0x7f, 0x80, 0x00, 0x7f, 0x80, 0x02]);
    }

    #[test]
    fn compose_with_common_takes_only_requested_prefix() {
        let common = [0x7f, 0x80, 0x00, 0x00, 0x12];
        let key = Key::compose_with_common(Some(&common), 3, &[0x7f, 0x80, 0x02]).unwrap();

        assert_eq!(key.as_bytes(), &[0x7f, 0x80, 0x00, 0x7f, 0x80, 0x02]);
    }

    #[test]
    fn compose_with_common_without_prefix_is_malformed() {
        let err = Key::compose_with_common(None, 2, &[0x01]).unwrap_err();

        assert!(matches!(ese_error(&err), Some(EseError::MalformedKey(_))));
        assert_eq!(kind_of(&err), Some(ErrorKind::OutOfBounds));
    }

    #[test]
    fn compose_with_common_rejects_oversized_prefix() {
        let err = Key::compose_with_common(Some(&[0x01]), 4, &[]).unwrap_err();

        assert!(err.to_string().contains("exceeds page common key"));
    }

    #[test]
    fn compose_with_zero_common_size_ignores_missing_prefix() {
        let key = Key::compose_with_common(None, 0, b"abc").unwrap();

        assert_eq!(key.as_bytes(), b"abc");
    }

    #[test]
    fn forward_compare_is_unsigned_bytewise() {
        assert_eq!(compare(&[0x01, 0xff], &[0x02], false), Ordering::Less);
        assert_eq!(compare(&[0x80], &[0x7f], false), Ordering::Greater);
        assert_eq!(compare(b"abc", b"abc", false), Ordering::Equal);
    }

    #[test]
    fn shorter_prefix_sorts_first() {
        assert_eq!(compare(b"ab", b"abc", false), Ordering::Less);
        assert_eq!(compare(b"abc", b"ab", false), Ordering::Greater);
    }

    #[test]
    fn reversed_compare_reads_last_byte_first() {
        let a = [0x02, 0x01];
        let b = [0x01, 0x02];

        assert_eq!(compare(&a, &b, false), Ordering::Greater);
        assert_eq!(compare(&a, &b, true), Ordering::Less);
    }

    #[test]
    fn empty_branch_key_covers_everything() {
        assert!(branch_covers(&[0xff, 0xff, 0xff], &[], false));
        assert!(branch_covers(&[], &[], true));
    }

    #[test]
    fn branch_covers_targets_up_to_its_key() {
        assert!(branch_covers(b"apple", b"banana", false));
        assert!(branch_covers(b"banana", b"banana", false));
        assert!(!branch_covers(b"cherry", b"banana", false));
    }

    #[test]
    fn push_be_u32_appends_segment_suffix() {
        let mut key = Key::new(&[0x00, 0x00, 0x00, 0x2a]);
        key.push_be_u32(0x0102);

        assert_eq!(key.as_bytes(), &[0x00, 0x00, 0x00, 0x2a, 0x00, 0x00, 0x01, 0x02]);
        assert!(key.starts_with(&[0x00, 0x00, 0x00, 0x2a]));
    }

    #[test]
    fn debug_prints_hex_bytes() {
        assert_eq!(format!("{:?}", Key::new(&[0x0a, 0xff])), "Key(0a ff)");
    }
}
