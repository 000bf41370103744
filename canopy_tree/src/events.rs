// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change notification: events and the observer seam.
//!
//! The tree does not depend on any UI framework's reactivity. Instead, hosts
//! subscribe a [`TreeObserver`] and receive a [`TreeEvent`] after each
//! observable mutation. Events fire only once the tree is back in a fully
//! consistent state (selection clearing and checkbox aggregation included),
//! so an observer never sees a half-applied mutation.
//!
//! Operations that take a [`Notify`](crate::Notify) argument skip emission
//! when passed [`Notify::Silent`](crate::Notify::Silent); the state change
//! still happens.

use alloc::string::String;

use crate::types::NodeId;

/// A change that observers can react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeEvent {
    /// A node (with any nested batch) was inserted; carries the subtree root.
    Inserted(NodeId),
    /// A subtree was removed. The id is stale by the time this fires, so the
    /// event carries the removed root's key instead.
    Removed {
        /// Key of the removed subtree root.
        key: String,
    },
    /// A node's selected flag flipped (either direction).
    SelectionChanged(NodeId),
    /// A node's check state changed; carries the node `set_checked` targeted.
    /// Ancestor and descendant states may have changed with it.
    CheckChanged(NodeId),
    /// A node was expanded or collapsed.
    OpenedChanged(NodeId),
    /// A node was relabeled.
    LabelChanged(NodeId),
    /// A node moved to a different parent (or to the root sequence).
    Reparented(NodeId),
}

/// Host-side hook for change notification.
///
/// Implementations are owned by the tree (boxed) and invoked synchronously
/// during the mutating call, after invariants are restored. They receive the
/// event only; to inspect the tree, record what you need and query after the
/// mutating call returns.
pub trait TreeObserver {
    /// Called once per observable change.
    fn on_event(&mut self, event: &TreeEvent);
}
