//! # Configuration Module
//!
//! Format constants live in [`constants`], grouped by the on-disk structure
//! they describe and checked by compile-time assertions where they depend on
//! each other. Runtime decode settings live in [`options`].
//!
//! ## Module Organization
//!
//! - [`constants`]: numeric layout values, flag bits, identifier ranges
//! - [`options`]: `FormatOptions` (layout switches derived from the file
//!   header) and `DecodeContext` (format, default codepage, tracing span)

pub mod constants;
pub mod options;

pub use constants::*;
pub use options::{DecodeContext, FormatOptions};
