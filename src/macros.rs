//! # Internal Macros
//!
//! This module provides internal macros for reducing boilerplate in esedb.
//!
//! ## zerocopy_getters!
//!
//! Generates getter methods for zerocopy struct fields that use little-endian
//! wrapper types (U16, U32, U64). The on-disk structures are only ever read,
//! so no setters are generated.
//!
//! ### Usage
//!
//! ```ignore
//! use zerocopy::little_endian::{U16, U32};
//!
//! #[repr(C)]
//! struct Header {
//!     page_flags: U32,
//!     available_page_tag: U16,
//! }
//!
//! impl Header {
//!     zerocopy_getters! {
//!         page_flags: u32,
//!         available_page_tag: u16,
//!     }
//! }
//!
//! // Generates:
//! // pub fn page_flags(&self) -> u32 { self.page_flags.get() }
//! // pub fn available_page_tag(&self) -> u16 { self.available_page_tag.get() }
//! ```
//!
//! ## raw_getters!
//!
//! Same idea for fixed byte arrays that are exposed as-is (timestamps,
//! signatures), returning a reference into the header.
//!
//! ## column_getters!
//!
//! Generates a typed record getter and its `_opt` twin from a conversion
//! function. The plain getter fails on an absent column; the `_opt` variant
//! returns `None`.
//!
//! ```ignore
//! impl<'a> RecordView<'a> {
//!     column_getters! {
//!         int32: i32 => value::to_i32,
//!     }
//! }
//!
//! // Generates:
//! // pub fn get_int32(&self, index: usize) -> Result<i32>
//! // pub fn get_int32_opt(&self, index: usize) -> Result<Option<i32>>
//! ```

/// Generates getter methods for zerocopy little-endian fields.
#[macro_export]
macro_rules! zerocopy_getters {
    (@impl $field:ident, u16) => {
        #[inline]
        pub fn $field(&self) -> u16 {
            self.$field.get()
        }
    };
    (@impl $field:ident, u32) => {
        #[inline]
        pub fn $field(&self) -> u32 {
            self.$field.get()
        }
    };
    (@impl $field:ident, u64) => {
        #[inline]
        pub fn $field(&self) -> u64 {
            self.$field.get()
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            $crate::zerocopy_getters!(@impl $field, $ty);
        )*
    };
}

/// Generates `<field>_bytes()` getters for raw byte array fields.
#[macro_export]
macro_rules! raw_getters {
    ($($field:ident : $len:literal),* $(,)?) => {
        $(
            ::paste::paste! {
                #[inline]
                pub fn [<$field _bytes>](&self) -> &[u8; $len] {
                    &self.$field
                }
            }
        )*
    };
}

/// Generates `get_<name>` and `get_<name>_opt` record getters.
#[macro_export]
macro_rules! column_getters {
    ($($name:ident : $ty:ty => $convert:path),* $(,)?) => {
        $(
            ::paste::paste! {
                pub fn [<get_ $name _opt>](&self, index: usize) -> eyre::Result<Option<$ty>> {
                    match self.inline_value(index)? {
                        Some(data) => $convert(data)
                            .map(Some)
                            .map_err(|e| e.wrap_err(format!(
                                "column {} as {}",
                                index,
                                stringify!($name)
                            ))),
                        None => Ok(None),
                    }
                }

                pub fn [<get_ $name>](&self, index: usize) -> eyre::Result<$ty> {
                    self.[<get_ $name _opt>](index)?
                        .ok_or_else(|| self.absent(index))
                }
            }
        )*
    };
}
