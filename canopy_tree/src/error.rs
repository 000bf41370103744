// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type for structural mutations.

use alloc::string::String;

/// Failure of a structural mutation.
///
/// Lookups by unknown key never produce these; they return `None` or no-op.
/// Errors are raised only where the caller named something that must exist
/// (a parent, a move target) or supplied invalid node data. Batch inserts
/// are validated before any mutation, so an `Err` leaves the tree unchanged.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// The referenced key does not exist in the tree.
    #[error("node not found: {0:?}")]
    NodeNotFound(String),
    /// A node record carried an empty key.
    #[error("node key must be non-empty")]
    EmptyKey,
    /// A node record carried a key that already exists in the tree, or that
    /// appears twice within the same inserted batch.
    #[error("duplicate node key: {0:?}")]
    DuplicateKey(String),
    /// A reparent would place a node underneath its own descendant.
    #[error("cannot move {moved:?} under its own descendant {into:?}")]
    WouldCycle {
        /// Key of the node being moved.
        moved: String,
        /// Key of the requested new parent.
        into: String,
    },
}
