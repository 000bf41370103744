// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the tree hierarchy: node identifiers, flags, and node data records.

use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::tree::Tree;

/// Identifier for a node in the tree (generational).
///
/// A `NodeId` stays valid until its node is removed; after that the id is
/// *stale* and every accessor answers `None` or empty for it, even if the
/// underlying slot has been reused for a newer node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

bitflags::bitflags! {
    /// Per-node boolean state.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node can be targeted by selection operations. Unselectable nodes
        /// are skipped by [`Tree::select`](crate::Tree::select).
        const SELECTABLE = 0b0000_0001;
        /// Node is currently selected.
        const SELECTED   = 0b0000_0010;
        /// Node is expanded in the presentation layer. Affects display only,
        /// never the child sequence.
        const OPENED     = 0b0000_0100;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::SELECTABLE
    }
}

/// Tri-state checkbox value of a node.
///
/// `Indeterminate` is an aggregate over children: it appears on a node whose
/// descendants are a mix of checked and unchecked, and is recomputed by the
/// tree whenever a descendant's state changes. Leaf nodes are never
/// indeterminate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CheckState {
    /// No descendant (and not the node itself) is checked.
    Unchecked,
    /// The node and all of its descendants are checked.
    Checked,
    /// Some, but not all, descendants are checked.
    Indeterminate,
}

impl CheckState {
    /// Returns `true` for [`CheckState::Checked`].
    pub const fn is_checked(self) -> bool {
        matches!(self, Self::Checked)
    }
}

/// Whether a mutation should notify subscribed observers.
///
/// `Silent` still mutates state; it only suppresses the change notification.
/// Hosts use it to avoid redundant UI churn during bulk operations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Notify {
    /// Emit a [`TreeEvent`](crate::TreeEvent) to subscribed observers.
    Events,
    /// Mutate without notifying observers.
    Silent,
}

/// Tree-wide configuration, fixed at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TreeConfig {
    /// Default selectability for nodes whose [`NodeData::selectable`] is `None`.
    pub selectable: bool,
    /// When `false` (the default), selecting a node clears the selection on
    /// every other node in the tree.
    pub multi_select: bool,
    /// Enables the checkbox variant: [`Tree::set_checked`](crate::Tree::set_checked)
    /// and tri-state aggregation. When `false`, check state is inert.
    pub checkboxes: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            selectable: true,
            multi_select: false,
            checkboxes: false,
        }
    }
}

/// Input record describing one node, optionally with a nested subtree.
///
/// `NodeData` is what callers hand to [`Tree::insert`](crate::Tree::insert)
/// and what [`Tree::remove`](crate::Tree::remove) /
/// [`Tree::to_data`](crate::Tree::to_data) hand back; a removed subtree
/// round-trips through `insert` unchanged.
///
/// Construct via [`NodeData::new`] plus struct update syntax:
///
/// ```rust
/// use canopy_tree::NodeData;
///
/// let data = NodeData {
///     opened: true,
///     children: vec![NodeData::new("a/1", "First")],
///     ..NodeData::new("a", "Folder A")
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeData {
    /// Unique key within the tree. Must be non-empty; duplicates are rejected
    /// at insert time.
    pub key: String,
    /// Display text.
    pub label: String,
    /// Per-node selectability override; `None` falls back to
    /// [`TreeConfig::selectable`].
    pub selectable: Option<bool>,
    /// Initial expand/collapse state.
    pub opened: bool,
    /// Initial checked state. Ignored unless the tree has
    /// [`TreeConfig::checkboxes`] enabled.
    pub checked: bool,
    /// Presentation-only icon name; opaque to the tree.
    pub icon: Option<String>,
    /// Presentation-only icon color; opaque to the tree.
    pub icon_color: Option<String>,
    /// Opaque per-node variant tag the rendering layer can switch on.
    pub tag: Option<String>,
    /// Nested children, inserted recursively in the same call.
    pub children: Vec<NodeData>,
}

impl NodeData {
    /// Create a record with the given key and label and defaults elsewhere.
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            ..Self::default()
        }
    }
}

/// Sibling ordering for an insertion.
#[derive(Clone, Copy)]
pub enum InsertOrder<'a> {
    /// Append after the existing siblings (insertion order).
    Append,
    /// Keep siblings sorted by the comparator. Insertion is stable: a new
    /// node that compares equal to an existing sibling is placed after it.
    /// The comparator applies at every level of a nested batch.
    Sorted(&'a dyn Fn(&Tree, NodeId, NodeId) -> Ordering),
}

impl core::fmt::Debug for InsertOrder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Append => f.write_str("Append"),
            Self::Sorted(_) => f.write_str("Sorted(..)"),
        }
    }
}
