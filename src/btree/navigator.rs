//! # Tree Navigator
//!
//! Point lookups and ordered scans over one B-tree, fetching pages from a
//! [`PageSource`] as it goes.
//!
//! ## Point Lookup
//!
//! ```text
//! for each value of the current node, in order:
//!     leaf:   key == target  -> found
//!             key >  target  -> not found (tree is ordered)
//!     branch: key >= target or key empty -> descend into child
//! node exhausted -> return to the parent and continue after the branch
//! ```
//!
//! A branch whose key equals the target may hand the search on to its right
//! sibling, because a separator can equal the first key of the next child.
//! A branch whose key is strictly greater (or empty) is the last candidate
//! of its parent: once its subtree is exhausted the parent is exhausted too.
//!
//! ## Explicit Stack
//!
//! Descent is iterative. The path is a `SmallVec<[(page, next index); 64]>`;
//! a path longer than `MAX_TREE_DEPTH` means a cyclic or corrupted tree and
//! fails with `MalformedTree` instead of exhausting the call stack.
//!
//! ## Ordered Scans
//!
//! [`TreeNavigator::leaf_values`] walks to the leftmost leaf and then follows
//! the leaves' next-page links. [`TreeNavigator::seek`] does the same from the
//! leaf covering a key, skipping values that sort before it. Both stop with
//! `MalformedTree` after visiting more leaves than the source has pages.

use std::cmp::Ordering;

use eyre::Result;
use smallvec::SmallVec;
use tracing::Span;

use super::node::{Node, TreeValue};
use crate::config::{DecodeContext, FormatOptions, MAX_TREE_DEPTH};
use crate::encoding::{branch_covers, compare, Key};
use crate::error::EseError;
use crate::storage::PageSource;

type PathStack = SmallVec<[(u32, usize); MAX_TREE_DEPTH]>;

pub struct TreeNavigator<'s, S: PageSource + ?Sized> {
    source: &'s S,
    format: FormatOptions,
    span: Span,
}

impl<'s, S: PageSource + ?Sized> TreeNavigator<'s, S> {
    pub fn new(source: &'s S, ctx: &DecodeContext) -> Self {
        Self {
            source,
            format: ctx.format,
            span: ctx.span().clone(),
        }
    }

    pub fn node(&self, page_number: u32) -> Result<Node<'s>> {
        let data = self.source.page(page_number)?;
        Node::decode(page_number, data, &self.format)
    }

    /// Finds the leaf value whose key equals `key`. A miss is `Ok(None)`.
    pub fn find_leaf(&self, root_page: u32, key: &[u8], reversed: bool) -> Result<Option<TreeValue<'s>>> {
        let _entered = self.span.enter();
        let mut path: PathStack = SmallVec::new();
        path.push((root_page, 0));

        while let Some((page_number, start)) = path.pop() {
            let node = self.node(page_number)?;

            if node.is_leaf() {
                for value in node.values().iter().skip(start) {
                    match compare(value.key().as_bytes(), key, reversed) {
                        Ordering::Equal => return Ok(Some(value.clone())),
                        Ordering::Greater => {
                            tracing::trace!(page = page_number, "passed target key in leaf");
                            return Ok(None);
                        }
                        Ordering::Less => {}
                    }
                }
                continue;
            }

            for (index, value) in node.values().iter().enumerate().skip(start) {
                let branch_key = value.key().as_bytes();
                if !branch_covers(key, branch_key, reversed) {
                    continue;
                }
                let child = value.child_page().ok_or_else(|| EseError::MalformedTree {
                    page_number,
                    reason: format!("branch value {} has no child page", index),
                })?;

                let resume = if branch_key.is_empty()
                    || compare(key, branch_key, reversed) == Ordering::Less
                {
                    node.value_count()
                } else {
                    index + 1
                };

                if path.len() + 2 > MAX_TREE_DEPTH {
                    return Err(EseError::MalformedTree {
                        page_number,
                        reason: format!("tree deeper than {} levels", MAX_TREE_DEPTH),
                    }
                    .into());
                }
                path.push((page_number, resume));
                path.push((child, 0));
                tracing::trace!(page = page_number, child, depth = path.len(), "descending");
                break;
            }
        }

        Ok(None)
    }

    /// All leaf values of the tree in key order.
    pub fn leaf_values(&self, root_page: u32) -> Result<LeafValues<'s, S>> {
        let _entered = self.span.enter();
        let mut page_number = root_page;

        for _ in 0..MAX_TREE_DEPTH {
            let node = self.node(page_number)?;
            if node.is_leaf() {
                return Ok(LeafValues::new(self, node, 0, None));
            }
            page_number = match node.values().first() {
                Some(first) => first.child_page().ok_or_else(|| EseError::MalformedTree {
                    page_number,
                    reason: "branch value has no child page".into(),
                })?,
                None => return Ok(LeafValues::exhausted(self)),
            };
        }

        Err(too_deep(root_page))
    }

    /// Leaf values in key order, starting at the first value `>= key`.
    pub fn seek(&self, root_page: u32, key: &[u8]) -> Result<LeafValues<'s, S>> {
        let _entered = self.span.enter();
        let mut page_number = root_page;

        for _ in 0..MAX_TREE_DEPTH {
            let node = self.node(page_number)?;
            if node.is_leaf() {
                let start = node
                    .values()
                    .iter()
                    .position(|v| compare(v.key().as_bytes(), key, false) != Ordering::Less)
                    .unwrap_or(node.value_count());
                return Ok(LeafValues::new(self, node, start, Some(Key::new(key))));
            }
            let covering = node
                .values()
                .iter()
                .find(|v| branch_covers(key, v.key().as_bytes(), false));
            page_number = match covering {
                Some(value) => value.child_page().ok_or_else(|| EseError::MalformedTree {
                    page_number,
                    reason: "branch value has no child page".into(),
                })?,
                None => return Ok(LeafValues::exhausted(self)),
            };
        }

        Err(too_deep(root_page))
    }
}

fn too_deep(root_page: u32) -> eyre::Report {
    EseError::MalformedTree {
        page_number: root_page,
        reason: format!("tree deeper than {} levels", MAX_TREE_DEPTH),
    }
    .into()
}

/// Iterator over leaf values, following next-page links.
pub struct LeafValues<'s, S: PageSource + ?Sized> {
    source: &'s S,
    format: FormatOptions,
    node: Option<Node<'s>>,
    index: usize,
    lower_bound: Option<Key>,
    leaves_left: u32,
}

impl<'s, S: PageSource + ?Sized> LeafValues<'s, S> {
    fn new(nav: &TreeNavigator<'s, S>, node: Node<'s>, index: usize, lower_bound: Option<Key>) -> Self {
        Self {
            source: nav.source,
            format: nav.format,
            node: Some(node),
            index,
            lower_bound,
            leaves_left: nav.source.page_count(),
        }
    }

    fn exhausted(nav: &TreeNavigator<'s, S>) -> Self {
        Self {
            source: nav.source,
            format: nav.format,
            node: None,
            index: 0,
            lower_bound: None,
            leaves_left: 0,
        }
    }

    fn advance_page(&mut self, current: &Node<'s>) -> Result<Option<Node<'s>>> {
        let next = current.next_page();
        if next == 0 {
            return Ok(None);
        }
        if self.leaves_left == 0 {
            return Err(EseError::MalformedTree {
                page_number: current.page_number(),
                reason: "leaf chain is longer than the file".into(),
            }
            .into());
        }
        self.leaves_left -= 1;

        let data = self.source.page(next)?;
        let node = Node::decode(next, data, &self.format)?;
        if !node.is_leaf() {
            return Err(EseError::MalformedTree {
                page_number: next,
                reason: format!("next page of leaf {} is not a leaf", current.page_number()),
            }
            .into());
        }
        Ok(Some(node))
    }
}

impl<'s, S: PageSource + ?Sized> Iterator for LeafValues<'s, S> {
    type Item = Result<TreeValue<'s>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.node.take()?;

            if let Some(value) = node.values().get(self.index) {
                let value = value.clone();
                self.index += 1;
                self.node = Some(node);

                if let Some(bound) = &self.lower_bound {
                    if compare(value.key().as_bytes(), bound.as_bytes(), false) == Ordering::Less {
                        continue;
                    }
                }
                return Some(Ok(value));
            }

            match self.advance_page(&node) {
                Ok(Some(next)) => {
                    self.node = Some(next);
                    self.index = 0;
                }
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
