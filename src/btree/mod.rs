//! # B-Tree Access
//!
//! Every table, index and long-value store in an ESE file is a B+tree whose
//! nodes are pages. This module turns pages into ordered key/value entries
//! and walks trees built from them.
//!
//! ## Architecture Overview
//!
//! ```text
//! TreeNavigator ──page(n)──> PageSource
//!      │
//!      └─ Node::decode(page) ──> [TreeValue { kind, key, data, location }]
//! ```
//!
//! - **Node** (`node`): one page decoded into tree values with fully
//!   expanded keys. Leaf pages hold records, long-value segments or index
//!   entries; parent pages hold branch pointers whose key bounds the child.
//! - **Navigator** (`navigator`): point lookup by key, full leaf scans and
//!   ordered scans from a key.
//!
//! ## Zero-Copy Access
//!
//! Payloads are `&[u8]` slices into the page source. Only keys are copied,
//! because expanding a prefix-compressed key needs a buffer of its own; keys
//! up to 32 bytes stay inline in a `SmallVec`.
//!
//! ## Depth Bound
//!
//! No on-disk tree is trusted to be acyclic. Descent is iterative and capped
//! at `MAX_TREE_DEPTH` levels; leaf chains are capped at the page count.

mod navigator;
mod node;

pub use navigator::{LeafValues, TreeNavigator};
pub use node::{Node, TreeValue, TreeValueKind, ValueLocation};
