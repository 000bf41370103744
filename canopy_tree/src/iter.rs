// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Traversal iterators over the hierarchy.

use alloc::vec::Vec;

use crate::tree::Tree;
use crate::types::NodeId;

/// Pre-order iterator over a subtree (or the whole forest).
///
/// Yields a node before its children, children in sibling order. Created by
/// [`Tree::descendants`] and [`Tree::all`]; each call constructs a fresh
/// iterator, so traversal is restartable and has no side effects.
#[derive(Debug)]
pub struct Descendants<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl<'a> Descendants<'a> {
    pub(crate) fn new(tree: &'a Tree, start: &[NodeId]) -> Self {
        // Reversed so that `pop` yields the starting nodes in order.
        Self {
            tree,
            stack: start.iter().rev().copied().collect(),
        }
    }
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        for &child in self.tree.children_of(id).iter().rev() {
            self.stack.push(child);
        }
        Some(id)
    }
}

/// Iterator from a node's immediate parent up to its root.
///
/// Created by [`Tree::ancestors`]; with `include_self` it starts at the node
/// itself.
#[derive(Debug)]
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl<'a> Ancestors<'a> {
    pub(crate) fn new(tree: &'a Tree, start: Option<NodeId>) -> Self {
        Self { tree, next: start }
    }
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.parent_of(id);
        Some(id)
    }
}
