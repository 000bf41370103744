// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Tree: a retained tree hierarchy for UI tree views.
//!
//! Canopy Tree is the data-structure core behind a tree-view widget: a forest of
//! labeled, keyed nodes with selection semantics, expand/collapse state, and an
//! optional tri-state checkbox mode.
//!
//! - Nodes are addressed by [`NodeId`] (generational handle) or by their unique
//!   string key (O(1) via a maintained flat index).
//! - Insertion supports nested batches (a record plus its `children` land
//!   atomically or not at all), append or comparator-sorted sibling order.
//! - Selection is single- or multi-select; in single-select mode the tree
//!   clears the previous selection for you.
//! - In checkbox mode, checking a node cascades down its subtree and every
//!   ancestor re-aggregates to checked, unchecked, or indeterminate before the
//!   call returns.
//!
//! ## Not a widget
//!
//! This crate renders nothing and owns no event loop. A host UI layer binds to
//! the accessors ([`Tree::label`], [`Tree::is_opened`], [`Tree::check_state`],
//! …) and calls the mutating operations on user interaction. Change
//! notification is a plain observer list ([`TreeObserver`]) rather than any
//! framework's reactivity system; operations that accept [`Notify::Silent`]
//! mutate without notifying, which hosts use during bulk updates.
//!
//! All operations are synchronous, single-threaded mutations. Multi-step
//! invariant restoration (selection clearing, checkbox aggregation) completes
//! before any call returns or any observer runs, so readers only ever see
//! fully-consistent states.
//!
//! ## API overview
//!
//! - [`Tree`]: the forest — construction, mutation, queries.
//! - [`NodeData`]: input/output record, optionally nested; round-trips through
//!   insert/remove.
//! - [`NodeId`], [`NodeFlags`], [`CheckState`]: per-node handle and state.
//! - [`TreeConfig`], [`InsertOrder`], [`Notify`]: behavior knobs.
//! - [`TreeEvent`] / [`TreeObserver`]: change notification.
//! - [`Descendants`] / [`Ancestors`]: pre-order and parent-chain traversal.
//! - [`TreeError`]: failures of structural mutation; plain lookups return
//!   `Option` instead.
//!
//! ## Example
//!
//! ```rust
//! use canopy_tree::{CheckState, NodeData, Tree, TreeConfig};
//!
//! let mut tree = Tree::with_nodes(
//!     TreeConfig {
//!         checkboxes: true,
//!         ..TreeConfig::default()
//!     },
//!     vec![NodeData {
//!         children: vec![NodeData::new("a/1", "First"), NodeData::new("a/2", "Second")],
//!         ..NodeData::new("a", "Folder A")
//!     }],
//! )?;
//!
//! tree.set_checked("a/1", true);
//! let a = tree.get("a").unwrap();
//! assert_eq!(tree.check_state(a), Some(CheckState::Indeterminate));
//!
//! tree.set_checked("a/2", true);
//! assert_eq!(tree.check_state(a), Some(CheckState::Checked));
//! # Ok::<(), canopy_tree::TreeError>(())
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod error;
mod events;
mod iter;
mod tree;
mod types;

pub use error::TreeError;
pub use events::{TreeEvent, TreeObserver};
pub use iter::{Ancestors, Descendants};
pub use tree::Tree;
pub use types::{CheckState, InsertOrder, NodeData, NodeFlags, NodeId, Notify, TreeConfig};
