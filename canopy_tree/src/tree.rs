// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: structure, mutation, selection, check propagation.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::error::TreeError;
use crate::events::{TreeEvent, TreeObserver};
use crate::iter::{Ancestors, Descendants};
use crate::types::{CheckState, InsertOrder, NodeData, NodeFlags, NodeId, Notify, TreeConfig};

/// A forest of keyed, selectable, optionally checkable nodes.
///
/// Nodes live in a generational slot arena and are addressed two ways: by
/// [`NodeId`] (cheap, copyable, goes stale on removal) and by their unique
/// string key (O(1) via a flat index, the form UI code uses on every
/// interaction). Structural mutations go through keys and return
/// [`TreeError`] when a named node is missing; plain lookups return `None`
/// instead.
///
/// Invariants the tree maintains for you:
///
/// - In single-select mode ([`TreeConfig::multi_select`] off), at most one
///   node is selected at any time.
/// - In checkbox mode ([`TreeConfig::checkboxes`]), every branch node's
///   [`CheckState`] is the aggregate of its children (checked / unchecked /
///   indeterminate) by the time any mutating call returns.
/// - Key uniqueness: inserts carrying an empty or duplicate key fail before
///   any mutation, so the key index and the node graph never disagree.
///
/// ## Example
///
/// ```rust
/// use canopy_tree::{NodeData, Tree, TreeConfig};
///
/// let mut tree = Tree::new(TreeConfig::default());
/// tree.insert(
///     None,
///     NodeData {
///         children: vec![NodeData::new("a/1", "First")],
///         ..NodeData::new("a", "Folder A")
///     },
/// )?;
///
/// let id = tree.get("a/1").unwrap();
/// assert_eq!(tree.label(id), Some("First"));
/// # Ok::<(), canopy_tree::TreeError>(())
/// ```
pub struct Tree {
    /// slots
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    /// top-level nodes, in display order
    roots: Vec<NodeId>,
    /// flat key index; always in sync with the arena
    keys: HashMap<String, NodeId>,
    config: TreeConfig,
    observers: Vec<Box<dyn TreeObserver>>,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tree")
            .field("nodes_alive", &self.keys.len())
            .field("nodes_total", &self.nodes.len())
            .field("roots", &self.roots.len())
            .field("config", &self.config)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    generation: u32,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
    key: String,
    label: String,
    flags: NodeFlags,
    check: CheckState,
    icon: Option<String>,
    icon_color: Option<String>,
    tag: Option<String>,
}

impl Tree {
    /// Create an empty tree with the given configuration.
    pub fn new(config: TreeConfig) -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            roots: Vec::new(),
            keys: HashMap::new(),
            config,
            observers: Vec::new(),
        }
    }

    /// Build a tree from an initial ordered sequence of node-data records.
    ///
    /// Records become top-level nodes in the given order; nested `children`
    /// are inserted recursively. Fails on the first invalid record.
    pub fn with_nodes(config: TreeConfig, nodes: Vec<NodeData>) -> Result<Self, TreeError> {
        let mut tree = Self::new(config);
        for data in nodes {
            tree.insert(None, data)?;
        }
        Ok(tree)
    }

    /// The configuration this tree was built with.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Register an observer for change notification.
    ///
    /// Observers are invoked synchronously, after the tree is back in a
    /// consistent state. See [`TreeObserver`].
    pub fn subscribe(&mut self, observer: Box<dyn TreeObserver>) {
        self.observers.push(observer);
    }

    // --- insertion ---

    /// Insert a node (with any nested `children`) under `parent`, appended
    /// after its new siblings. `parent: None` appends a new top-level node.
    ///
    /// The entire batch is validated first — every key non-empty, no key
    /// already in the tree or repeated within the batch — so on `Err` the
    /// tree is unchanged. A missing parent fails with
    /// [`TreeError::NodeNotFound`].
    pub fn insert(&mut self, parent: Option<&str>, data: NodeData) -> Result<NodeId, TreeError> {
        self.insert_ordered(parent, data, InsertOrder::Append)
    }

    /// Like [`Tree::insert`], but with explicit sibling ordering.
    ///
    /// With [`InsertOrder::Sorted`], each inserted node lands at the position
    /// that keeps its siblings sorted by the comparator; a node comparing
    /// equal to an existing sibling is placed after it. The comparator is
    /// applied at every level of a nested batch.
    pub fn insert_ordered(
        &mut self,
        parent: Option<&str>,
        data: NodeData,
        order: InsertOrder<'_>,
    ) -> Result<NodeId, TreeError> {
        let parent_id = match parent {
            Some(pk) => Some(
                self.get(pk)
                    .ok_or_else(|| TreeError::NodeNotFound(pk.into()))?,
            ),
            None => None,
        };
        {
            // Validate before any mutation so a failed batch leaves no
            // partial state behind.
            let mut seen = HashSet::new();
            validate_batch(&data, &self.keys, &mut seen)?;
        }
        let id = self.insert_batch(parent_id, data, order);
        if self.config.checkboxes {
            self.recompute_branch_states(id);
            self.refresh_ancestors(parent_id);
        }
        self.emit(TreeEvent::Inserted(id));
        Ok(id)
    }

    fn insert_batch(
        &mut self,
        parent: Option<NodeId>,
        data: NodeData,
        order: InsertOrder<'_>,
    ) -> NodeId {
        let NodeData {
            key,
            label,
            selectable,
            opened,
            checked,
            icon,
            icon_color,
            tag,
            children,
        } = data;

        let mut flags = NodeFlags::empty();
        if selectable.unwrap_or(self.config.selectable) {
            flags |= NodeFlags::SELECTABLE;
        }
        if opened {
            flags |= NodeFlags::OPENED;
        }
        let check = if self.config.checkboxes && checked {
            CheckState::Checked
        } else {
            CheckState::Unchecked
        };

        let id = self.alloc(Node {
            generation: 0, // assigned by alloc
            parent: None,
            children: SmallVec::new(),
            key: key.clone(),
            label,
            flags,
            check,
            icon,
            icon_color,
            tag,
        });
        self.keys.insert(key, id);

        let pos = {
            let siblings: &[NodeId] = match parent {
                Some(p) => &self.node(p).children,
                None => &self.roots,
            };
            match order {
                InsertOrder::Append => siblings.len(),
                // First sibling strictly greater; equals stay in front of us.
                InsertOrder::Sorted(cmp) => {
                    let mut pos = siblings.len();
                    for (i, &sibling) in siblings.iter().enumerate() {
                        if cmp(&*self, id, sibling) == Ordering::Less {
                            pos = i;
                            break;
                        }
                    }
                    pos
                }
            }
        };
        match parent {
            Some(p) => {
                self.node_mut(p).children.insert(pos, id);
                self.node_mut(id).parent = Some(p);
            }
            None => self.roots.insert(pos, id),
        }

        for child in children {
            self.insert_batch(Some(id), child, order);
        }
        id
    }

    fn alloc(&mut self, mut node: Node) -> NodeId {
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            node.generation = generation;
            self.nodes[idx] = Some(node);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            NodeId::new(idx as u32, generation)
        } else {
            node.generation = 1;
            self.nodes.push(Some(node));
            self.generations.push(1);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            NodeId::new((self.nodes.len() - 1) as u32, 1)
        }
    }

    // --- removal ---

    /// Remove the node with the given key and its entire subtree.
    ///
    /// Returns the detached subtree materialized as [`NodeData`] (it
    /// round-trips through [`Tree::insert`]), or `None` if no such node
    /// exists — so a second call for the same key returns `None`. In
    /// checkbox mode the former ancestors are re-aggregated.
    pub fn remove(&mut self, key: &str) -> Option<NodeData> {
        let id = self.get(key)?;
        let data = self.to_data(id)?;
        let parent = self.node(id).parent;
        match parent {
            Some(p) => self.unlink_parent(id, p),
            None => self.roots.retain(|r| *r != id),
        }
        self.free_subtree(id);
        if self.config.checkboxes {
            self.refresh_ancestors(parent);
        }
        self.emit(TreeEvent::Removed {
            key: data.key.clone(),
        });
        Some(data)
    }

    fn free_subtree(&mut self, id: NodeId) {
        let children = core::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.free_subtree(child);
        }
        if let Some(node) = self.nodes[id.idx()].take() {
            self.keys.remove(node.key.as_str());
            self.free_list.push(id.idx());
        }
    }

    /// Move the node with the given key (and its subtree) under a new parent,
    /// appended to that parent's children; `new_parent: None` makes it a
    /// top-level node.
    ///
    /// Fails with [`TreeError::NodeNotFound`] for unknown keys and
    /// [`TreeError::WouldCycle`] when the destination lies inside the moved
    /// subtree. Checkbox aggregates of both the old and new ancestor chains
    /// are recomputed.
    pub fn reparent(&mut self, key: &str, new_parent: Option<&str>) -> Result<(), TreeError> {
        let id = self
            .get(key)
            .ok_or_else(|| TreeError::NodeNotFound(key.into()))?;
        let new_parent_id = match new_parent {
            Some(pk) => {
                let pid = self
                    .get(pk)
                    .ok_or_else(|| TreeError::NodeNotFound(pk.into()))?;
                if pid == id || self.ancestors(pid, false).any(|a| a == id) {
                    return Err(TreeError::WouldCycle {
                        moved: key.into(),
                        into: pk.into(),
                    });
                }
                Some(pid)
            }
            None => None,
        };

        let old_parent = self.node(id).parent;
        match old_parent {
            Some(p) => self.unlink_parent(id, p),
            None => self.roots.retain(|r| *r != id),
        }
        match new_parent_id {
            Some(p) => {
                self.node_mut(p).children.push(id);
                self.node_mut(id).parent = Some(p);
            }
            None => self.roots.push(id),
        }
        if self.config.checkboxes {
            self.refresh_ancestors(old_parent);
            self.refresh_ancestors(new_parent_id);
        }
        self.emit(TreeEvent::Reparented(id));
        Ok(())
    }

    // --- selection ---

    /// Select the node with the given key.
    ///
    /// No-op when the key is unknown or the node is not selectable. In
    /// single-select mode every other selected node is cleared first, so the
    /// whole-tree invariant (at most one selected node) holds when this
    /// returns. `Notify::Silent` mutates without notifying observers.
    pub fn select(&mut self, key: &str, notify: Notify) {
        let Some(id) = self.get(key) else {
            return;
        };
        if !self.node(id).flags.contains(NodeFlags::SELECTABLE) {
            return;
        }
        let mut changed: Vec<NodeId> = Vec::new();
        if !self.config.multi_select {
            for prev in self.selected() {
                if prev != id {
                    self.node_mut(prev).flags.remove(NodeFlags::SELECTED);
                    changed.push(prev);
                }
            }
        }
        let node = self.node_mut(id);
        if !node.flags.contains(NodeFlags::SELECTED) {
            node.flags.insert(NodeFlags::SELECTED);
            changed.push(id);
        }
        if matches!(notify, Notify::Events) {
            for n in changed {
                self.emit(TreeEvent::SelectionChanged(n));
            }
        }
    }

    /// Clear the selected flag on the node with the given key.
    ///
    /// No-op when the key is unknown or the node is not selected.
    pub fn deselect(&mut self, key: &str, notify: Notify) {
        let Some(id) = self.get(key) else {
            return;
        };
        let node = self.node_mut(id);
        if !node.flags.contains(NodeFlags::SELECTED) {
            return;
        }
        node.flags.remove(NodeFlags::SELECTED);
        if matches!(notify, Notify::Events) {
            self.emit(TreeEvent::SelectionChanged(id));
        }
    }

    // --- checkboxes ---

    /// Set the checked state of the node with the given key, cascading.
    ///
    /// Checkbox trees only; a no-op when [`TreeConfig::checkboxes`] is off or
    /// the key is unknown. The whole subtree takes the new state first
    /// (a check/uncheck cascades), then each strict ancestor is recomputed
    /// as checked, unchecked, or indeterminate over its children — upward
    /// recomputation starts only after the downward pass completes, since
    /// ancestor state depends on final descendant state.
    pub fn set_checked(&mut self, key: &str, checked: bool) {
        if !self.config.checkboxes {
            return;
        }
        let Some(id) = self.get(key) else {
            return;
        };
        let state = if checked {
            CheckState::Checked
        } else {
            CheckState::Unchecked
        };
        // Aggregates are maintained, so a node already uniformly in the
        // requested state means the whole subtree is.
        if self.node(id).check == state {
            return;
        }
        let subtree: Vec<NodeId> = self.descendants(id, true).collect();
        for n in subtree {
            self.node_mut(n).check = state;
        }
        self.refresh_ancestors(self.node(id).parent);
        self.emit(TreeEvent::CheckChanged(id));
    }

    /// Recompute branch states bottom-up within a subtree. Leaves keep their
    /// own state; branches take the aggregate of their children.
    fn recompute_branch_states(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.node(id).children.iter().copied().collect();
        for &child in &children {
            self.recompute_branch_states(child);
        }
        if !children.is_empty() {
            let agg = self.aggregate(&children);
            self.node_mut(id).check = agg;
        }
    }

    /// Re-aggregate each node from `from` up to its root. Nodes without
    /// children keep their own state (they are never indeterminate).
    fn refresh_ancestors(&mut self, from: Option<NodeId>) {
        let mut cur = from;
        while let Some(id) = cur {
            if !self.node(id).children.is_empty() {
                let agg = self.aggregate(&self.node(id).children);
                self.node_mut(id).check = agg;
            }
            cur = self.node(id).parent;
        }
    }

    fn aggregate(&self, children: &[NodeId]) -> CheckState {
        let mut any_checked = false;
        let mut all_checked = true;
        for &child in children {
            match self.node(child).check {
                CheckState::Checked => any_checked = true,
                CheckState::Unchecked => all_checked = false,
                CheckState::Indeterminate => {
                    any_checked = true;
                    all_checked = false;
                }
            }
        }
        if all_checked {
            CheckState::Checked
        } else if any_checked {
            CheckState::Indeterminate
        } else {
            CheckState::Unchecked
        }
    }

    // --- presentation mutators ---

    /// Expand or collapse the node with the given key.
    ///
    /// Presentation only: the child sequence is untouched. No-op for unknown
    /// keys or when the state already matches.
    pub fn set_opened(&mut self, key: &str, opened: bool, notify: Notify) {
        let Some(id) = self.get(key) else {
            return;
        };
        let node = self.node_mut(id);
        if node.flags.contains(NodeFlags::OPENED) == opened {
            return;
        }
        node.flags.set(NodeFlags::OPENED, opened);
        if matches!(notify, Notify::Events) {
            self.emit(TreeEvent::OpenedChanged(id));
        }
    }

    /// Replace the display label of the node with the given key.
    ///
    /// No-op for unknown keys or when the label already matches.
    pub fn set_label(&mut self, key: &str, label: impl Into<String>, notify: Notify) {
        let Some(id) = self.get(key) else {
            return;
        };
        let label = label.into();
        let node = self.node_mut(id);
        if node.label == label {
            return;
        }
        node.label = label;
        if matches!(notify, Notify::Events) {
            self.emit(TreeEvent::LabelChanged(id));
        }
    }

    // --- queries ---

    /// Look up a node by its unique key. O(1); `None` for unknown keys.
    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.keys.get(key).copied()
    }

    /// Returns `true` if a node with the given key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// Number of live nodes across the whole forest.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Top-level nodes, in display order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Pre-order iterator over every node in the forest.
    pub fn all(&self) -> Descendants<'_> {
        Descendants::new(self, &self.roots)
    }

    /// Pre-order iterator over a subtree. Empty for stale ids.
    pub fn descendants(&self, id: NodeId, include_self: bool) -> Descendants<'_> {
        if !self.is_alive(id) {
            return Descendants::new(self, &[]);
        }
        if include_self {
            Descendants::new(self, &[id])
        } else {
            Descendants::new(self, self.children_of(id))
        }
    }

    /// Iterator from a node's parent up to its root, or from the node itself
    /// with `include_self`. Empty for stale ids.
    pub fn ancestors(&self, id: NodeId, include_self: bool) -> Ancestors<'_> {
        let start = if include_self {
            self.node_opt(id).map(|_| id)
        } else {
            self.parent_of(id)
        };
        Ancestors::new(self, start)
    }

    /// Every selected node, in pre-order.
    pub fn selected(&self) -> Vec<NodeId> {
        self.all().filter(|&id| self.is_selected(id)).collect()
    }

    /// Materialize a subtree back into node-data records.
    ///
    /// Round-trips through [`Tree::insert`]. `None` for stale ids.
    pub fn to_data(&self, id: NodeId) -> Option<NodeData> {
        let node = self.node_opt(id)?;
        Some(NodeData {
            key: node.key.clone(),
            label: node.label.clone(),
            selectable: Some(node.flags.contains(NodeFlags::SELECTABLE)),
            opened: node.flags.contains(NodeFlags::OPENED),
            checked: node.check == CheckState::Checked,
            icon: node.icon.clone(),
            icon_color: node.icon_color.clone(),
            tag: node.tag.clone(),
            children: node
                .children
                .iter()
                .filter_map(|&c| self.to_data(c))
                .collect(),
        })
    }

    // --- per-node accessors ---

    /// Returns `true` if `id` refers to a live node.
    ///
    /// A `NodeId` is live if its slot is occupied and its generation matches
    /// the slot's current generation.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node_opt(id).is_some()
    }

    /// The unique key of a live node.
    pub fn key(&self, id: NodeId) -> Option<&str> {
        self.node_opt(id).map(|n| n.key.as_str())
    }

    /// The display label of a live node.
    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.node_opt(id).map(|n| n.label.as_str())
    }

    /// The parent of a live node, or `None` for roots and stale ids.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id).and_then(|n| n.parent)
    }

    /// The children of a node, or an empty slice for stale ids.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.node_opt(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Whether a live node is selected; `false` for stale ids.
    pub fn is_selected(&self, id: NodeId) -> bool {
        self.node_opt(id)
            .is_some_and(|n| n.flags.contains(NodeFlags::SELECTED))
    }

    /// Whether a live node can be selected; `false` for stale ids.
    pub fn is_selectable(&self, id: NodeId) -> bool {
        self.node_opt(id)
            .is_some_and(|n| n.flags.contains(NodeFlags::SELECTABLE))
    }

    /// Whether a live node is expanded; `false` for stale ids.
    pub fn is_opened(&self, id: NodeId) -> bool {
        self.node_opt(id)
            .is_some_and(|n| n.flags.contains(NodeFlags::OPENED))
    }

    /// The tri-state check value of a live node.
    pub fn check_state(&self, id: NodeId) -> Option<CheckState> {
        self.node_opt(id).map(|n| n.check)
    }

    /// The presentation icon of a live node, if any.
    pub fn icon(&self, id: NodeId) -> Option<&str> {
        self.node_opt(id).and_then(|n| n.icon.as_deref())
    }

    /// The presentation icon color of a live node, if any.
    pub fn icon_color(&self, id: NodeId) -> Option<&str> {
        self.node_opt(id).and_then(|n| n.icon_color.as_deref())
    }

    /// The opaque variant tag of a live node, if any.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.node_opt(id).and_then(|n| n.tag.as_deref())
    }

    // --- internals ---

    /// Access a node; panics if `id` is stale. Internal callers only reach
    /// this with ids obtained from the live key index.
    fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.idx()].as_ref().expect("dangling NodeId")
    }

    /// Access a node mutably; panics if `id` is stale.
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.idx()].as_mut().expect("dangling NodeId")
    }

    fn node_opt(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.generation()).then_some(n)
    }

    fn unlink_parent(&mut self, id: NodeId, parent: NodeId) {
        self.node_mut(parent).children.retain(|c| *c != id);
        self.node_mut(id).parent = None;
    }

    fn emit(&mut self, event: TreeEvent) {
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }
}

fn validate_batch<'a>(
    data: &'a NodeData,
    existing: &HashMap<String, NodeId>,
    seen: &mut HashSet<&'a str>,
) -> Result<(), TreeError> {
    if data.key.is_empty() {
        return Err(TreeError::EmptyKey);
    }
    if existing.contains_key(data.key.as_str()) || !seen.insert(data.key.as_str()) {
        return Err(TreeError::DuplicateKey(data.key.clone()));
    }
    for child in &data.children {
        validate_batch(child, existing, seen)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::string::ToString;
    use alloc::{vec, vec::Vec};
    use core::cell::RefCell;

    fn leaf(key: &str) -> NodeData {
        NodeData::new(key, key.to_uppercase())
    }

    /// Tree `a -> [b -> [d, e], c]`, checkboxes enabled.
    fn checkbox_tree() -> Tree {
        Tree::with_nodes(
            TreeConfig {
                checkboxes: true,
                ..TreeConfig::default()
            },
            vec![NodeData {
                children: vec![
                    NodeData {
                        children: vec![leaf("d"), leaf("e")],
                        ..leaf("b")
                    },
                    leaf("c"),
                ],
                ..leaf("a")
            }],
        )
        .unwrap()
    }

    fn check_of(tree: &Tree, key: &str) -> CheckState {
        tree.check_state(tree.get(key).unwrap()).unwrap()
    }

    #[derive(Clone)]
    struct Recorder(Rc<RefCell<Vec<TreeEvent>>>);

    impl Recorder {
        fn install(tree: &mut Tree) -> Rc<RefCell<Vec<TreeEvent>>> {
            let log = Rc::new(RefCell::new(Vec::new()));
            tree.subscribe(Box::new(Self(log.clone())));
            log
        }
    }

    impl TreeObserver for Recorder {
        fn on_event(&mut self, event: &TreeEvent) {
            self.0.borrow_mut().push(event.clone());
        }
    }

    #[test]
    fn insert_appends_in_sibling_order() {
        let mut tree = Tree::default();
        let a = tree.insert(None, leaf("a")).unwrap();
        let b = tree.insert(None, leaf("b")).unwrap();
        let a1 = tree.insert(Some("a"), leaf("a1")).unwrap();
        let a2 = tree.insert(Some("a"), leaf("a2")).unwrap();

        assert_eq!(tree.roots(), &[a, b]);
        assert_eq!(tree.children_of(a), &[a1, a2]);
        assert_eq!(tree.parent_of(a1), Some(a));
        assert_eq!(tree.parent_of(a), None);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn get_missing_returns_none() {
        let tree = Tree::default();
        assert_eq!(tree.get("missing"), None);
        assert!(!tree.contains("missing"));
    }

    #[test]
    fn insert_rejects_empty_key() {
        let mut tree = Tree::default();
        assert_eq!(
            tree.insert(None, NodeData::default()),
            Err(TreeError::EmptyKey)
        );
        assert!(tree.is_empty());
    }

    #[test]
    fn insert_rejects_duplicate_key() {
        let mut tree = Tree::default();
        tree.insert(None, leaf("a")).unwrap();
        assert_eq!(
            tree.insert(None, leaf("a")),
            Err(TreeError::DuplicateKey("a".to_string()))
        );
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn failed_nested_batch_leaves_tree_unchanged() {
        let mut tree = Tree::default();
        tree.insert(None, leaf("a")).unwrap();

        // Duplicate buried two levels down in the batch.
        let batch = NodeData {
            children: vec![NodeData {
                children: vec![leaf("a")],
                ..leaf("c")
            }],
            ..leaf("b")
        };
        assert_eq!(
            tree.insert(None, batch),
            Err(TreeError::DuplicateKey("a".to_string()))
        );
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get("b"), None);
        assert_eq!(tree.get("c"), None);
        assert_eq!(tree.roots().len(), 1);

        // Same for a duplicate within the batch itself.
        let batch = NodeData {
            children: vec![leaf("x"), leaf("x")],
            ..leaf("w")
        };
        assert_eq!(
            tree.insert(None, batch),
            Err(TreeError::DuplicateKey("x".to_string()))
        );
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get("w"), None);
    }

    #[test]
    fn insert_into_missing_parent_fails() {
        let mut tree = Tree::default();
        assert_eq!(
            tree.insert(Some("nope"), leaf("a")),
            Err(TreeError::NodeNotFound("nope".to_string()))
        );
        assert!(tree.is_empty());
    }

    #[test]
    fn sorted_insert_is_stable() {
        let by_label =
            |tree: &Tree, a: NodeId, b: NodeId| tree.label(a).cmp(&tree.label(b));
        let mut tree = Tree::default();
        let m = tree
            .insert_ordered(None, NodeData::new("m", "mango"), InsertOrder::Sorted(&by_label))
            .unwrap();
        let a = tree
            .insert_ordered(None, NodeData::new("a", "apple"), InsertOrder::Sorted(&by_label))
            .unwrap();
        let z = tree
            .insert_ordered(None, NodeData::new("z", "zebra"), InsertOrder::Sorted(&by_label))
            .unwrap();
        assert_eq!(tree.roots(), &[a, m, z]);

        // Equal sort key: the newcomer lands after the existing node.
        let m2 = tree
            .insert_ordered(None, NodeData::new("m2", "mango"), InsertOrder::Sorted(&by_label))
            .unwrap();
        assert_eq!(tree.roots(), &[a, m, m2, z]);
    }

    #[test]
    fn sorted_order_applies_to_nested_children() {
        let by_label =
            |tree: &Tree, a: NodeId, b: NodeId| tree.label(a).cmp(&tree.label(b));
        let mut tree = Tree::default();
        let batch = NodeData {
            children: vec![
                NodeData::new("p/c", "charlie"),
                NodeData::new("p/a", "alpha"),
                NodeData::new("p/b", "bravo"),
            ],
            ..NodeData::new("p", "parent")
        };
        let p = tree
            .insert_ordered(None, batch, InsertOrder::Sorted(&by_label))
            .unwrap();
        let labels: Vec<&str> = tree
            .children_of(p)
            .iter()
            .filter_map(|&c| tree.label(c))
            .collect();
        assert_eq!(labels, ["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn descendants_preorder_and_count() {
        let tree = checkbox_tree();
        let a = tree.get("a").unwrap();

        let keys: Vec<&str> = tree
            .descendants(a, true)
            .filter_map(|id| tree.key(id))
            .collect();
        assert_eq!(keys, ["a", "b", "d", "e", "c"], "pre-order, siblings left to right");
        assert_eq!(tree.descendants(a, true).count(), tree.len());
        assert_eq!(tree.descendants(a, false).count(), tree.len() - 1);

        // Restartable: a second traversal sees the same sequence.
        let again: Vec<&str> = tree
            .descendants(a, true)
            .filter_map(|id| tree.key(id))
            .collect();
        assert_eq!(again, keys);
    }

    #[test]
    fn every_descendant_reaches_root_through_ancestors() {
        let tree = checkbox_tree();
        let a = tree.get("a").unwrap();
        for id in tree.descendants(a, true) {
            assert!(
                tree.ancestors(id, true).any(|anc| anc == a),
                "ancestor chain must include the subtree root"
            );
        }
        let d = tree.get("d").unwrap();
        let chain: Vec<&str> = tree.ancestors(d, false).filter_map(|id| tree.key(id)).collect();
        assert_eq!(chain, ["b", "a"], "immediate parent first, root last");
    }

    #[test]
    fn remove_returns_subtree_and_round_trips() {
        let mut tree = Tree::default();
        tree.insert(None, leaf("root")).unwrap();
        let before_len = tree.len();

        tree.insert(
            Some("root"),
            NodeData {
                children: vec![leaf("s1"), leaf("s2")],
                ..leaf("sub")
            },
        )
        .unwrap();
        assert_eq!(tree.len(), before_len + 3);

        let removed = tree.remove("sub").expect("subtree should be removable");
        assert_eq!(removed.key, "sub");
        assert_eq!(removed.children.len(), 2);
        assert_eq!(tree.len(), before_len);
        assert_eq!(tree.get("sub"), None);
        assert_eq!(tree.get("s1"), None);

        // The returned data reinserts cleanly.
        tree.insert(Some("root"), removed).unwrap();
        assert_eq!(tree.len(), before_len + 3);
        assert!(tree.contains("s2"));
    }

    #[test]
    fn remove_detaches_from_parent() {
        let mut tree = checkbox_tree();
        let b = tree.get("b").unwrap();
        let child_count = tree.children_of(b).len();

        tree.remove("d").unwrap();
        assert_eq!(tree.children_of(b).len(), child_count - 1);
        assert_eq!(tree.remove("d"), None, "second remove finds nothing");
    }

    #[test]
    fn single_select_keeps_exactly_one_node_selected() {
        let mut tree = checkbox_tree();
        tree.select("d", Notify::Events);
        assert_eq!(tree.selected().len(), 1);

        tree.select("c", Notify::Events);
        let selected = tree.selected();
        assert_eq!(selected.len(), 1, "previous selection must be cleared");
        assert_eq!(tree.key(selected[0]), Some("c"));
    }

    #[test]
    fn multi_select_keeps_previous_selection() {
        let mut tree = Tree::with_nodes(
            TreeConfig {
                multi_select: true,
                ..TreeConfig::default()
            },
            vec![leaf("a"), leaf("b")],
        )
        .unwrap();
        tree.select("a", Notify::Events);
        tree.select("b", Notify::Events);
        assert_eq!(tree.selected().len(), 2);
    }

    #[test]
    fn unselectable_nodes_are_skipped() {
        let mut tree = Tree::default();
        tree.insert(
            None,
            NodeData {
                selectable: Some(false),
                ..leaf("a")
            },
        )
        .unwrap();
        tree.select("a", Notify::Events);
        assert!(tree.selected().is_empty());

        // Config default applies when the record leaves selectable unset.
        let mut locked = Tree::new(TreeConfig {
            selectable: false,
            ..TreeConfig::default()
        });
        locked.insert(None, leaf("a")).unwrap();
        locked.select("a", Notify::Events);
        assert!(locked.selected().is_empty());
    }

    #[test]
    fn deselect_clears_flag() {
        let mut tree = checkbox_tree();
        tree.select("d", Notify::Events);
        tree.deselect("d", Notify::Events);
        assert!(tree.selected().is_empty());
        // Deselecting again is a no-op, not an error.
        tree.deselect("d", Notify::Events);
    }

    #[test]
    fn silent_mutation_suppresses_events_but_not_state() {
        let mut tree = checkbox_tree();
        let log = Recorder::install(&mut tree);

        tree.select("d", Notify::Silent);
        assert_eq!(tree.selected().len(), 1);
        assert!(log.borrow().is_empty(), "silent select must not notify");

        tree.select("c", Notify::Events);
        let events = log.borrow();
        let d = tree.get("d").unwrap();
        let c = tree.get("c").unwrap();
        assert_eq!(
            &*events,
            &[
                TreeEvent::SelectionChanged(d),
                TreeEvent::SelectionChanged(c)
            ],
            "clearing the old selection notifies before the new one"
        );
    }

    #[test]
    fn checking_all_children_checks_the_parent() {
        let mut tree = Tree::with_nodes(
            TreeConfig {
                checkboxes: true,
                ..TreeConfig::default()
            },
            vec![NodeData {
                children: vec![leaf("c1"), leaf("c2"), leaf("c3")],
                ..leaf("p")
            }],
        )
        .unwrap();

        tree.set_checked("c1", true);
        tree.set_checked("c2", true);
        tree.set_checked("c3", true);
        assert_eq!(check_of(&tree, "p"), CheckState::Checked);

        tree.set_checked("c2", false);
        assert_eq!(check_of(&tree, "p"), CheckState::Indeterminate);

        tree.set_checked("c1", false);
        tree.set_checked("c3", false);
        assert_eq!(check_of(&tree, "p"), CheckState::Unchecked);
    }

    #[test]
    fn check_propagates_to_grandparents() {
        let mut tree = checkbox_tree();

        tree.set_checked("d", true);
        tree.set_checked("e", true);
        assert_eq!(check_of(&tree, "b"), CheckState::Checked);
        assert_eq!(
            check_of(&tree, "a"),
            CheckState::Indeterminate,
            "c is still unchecked"
        );

        tree.set_checked("c", true);
        assert_eq!(check_of(&tree, "a"), CheckState::Checked);
    }

    #[test]
    fn check_cascades_down_the_subtree() {
        let mut tree = checkbox_tree();
        tree.set_checked("b", true);
        assert_eq!(check_of(&tree, "d"), CheckState::Checked);
        assert_eq!(check_of(&tree, "e"), CheckState::Checked);
        assert_eq!(check_of(&tree, "a"), CheckState::Indeterminate);

        tree.set_checked("a", false);
        for id in tree.all() {
            assert_eq!(tree.check_state(id), Some(CheckState::Unchecked));
        }
    }

    #[test]
    fn set_checked_is_inert_without_checkboxes() {
        let mut tree = Tree::default();
        tree.insert(None, leaf("a")).unwrap();
        tree.set_checked("a", true);
        assert_eq!(check_of(&tree, "a"), CheckState::Unchecked);
    }

    #[test]
    fn checked_batch_insert_aggregates_on_arrival() {
        let mut tree = checkbox_tree();
        tree.set_checked("a", true);

        // An unchecked arrival under a fully-checked parent dirties the
        // whole ancestor chain.
        tree.insert(Some("b"), leaf("f")).unwrap();
        assert_eq!(check_of(&tree, "b"), CheckState::Indeterminate);
        assert_eq!(check_of(&tree, "a"), CheckState::Indeterminate);

        // A nested batch computes its own internal aggregates too.
        let batch = NodeData {
            children: vec![
                NodeData {
                    checked: true,
                    ..leaf("g1")
                },
                leaf("g2"),
            ],
            ..leaf("g")
        };
        tree.insert(Some("c"), batch).unwrap();
        assert_eq!(check_of(&tree, "g"), CheckState::Indeterminate);
        assert_eq!(check_of(&tree, "c"), CheckState::Indeterminate);
    }

    #[test]
    fn reparent_moves_subtree() {
        let mut tree = checkbox_tree();
        tree.reparent("d", Some("c")).unwrap();

        let c = tree.get("c").unwrap();
        let b = tree.get("b").unwrap();
        let d = tree.get("d").unwrap();
        assert_eq!(tree.children_of(c), &[d]);
        assert_eq!(tree.children_of(b).len(), 1);
        assert_eq!(tree.parent_of(d), Some(c));

        // To the top level.
        tree.reparent("d", None).unwrap();
        assert_eq!(tree.parent_of(d), None);
        assert_eq!(tree.roots().len(), 2);
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut tree = checkbox_tree();
        assert_eq!(
            tree.reparent("a", Some("d")),
            Err(TreeError::WouldCycle {
                moved: "a".to_string(),
                into: "d".to_string(),
            })
        );
        assert_eq!(
            tree.reparent("b", Some("b")),
            Err(TreeError::WouldCycle {
                moved: "b".to_string(),
                into: "b".to_string(),
            })
        );
        assert_eq!(
            tree.reparent("missing", Some("a")),
            Err(TreeError::NodeNotFound("missing".to_string()))
        );
    }

    #[test]
    fn reparent_refreshes_check_aggregates() {
        let mut tree = checkbox_tree();
        tree.set_checked("b", true);
        assert_eq!(check_of(&tree, "a"), CheckState::Indeterminate);

        // Moving checked d under unchecked c flips both chains.
        tree.reparent("d", Some("c")).unwrap();
        assert_eq!(check_of(&tree, "b"), CheckState::Checked, "only e remains");
        assert_eq!(check_of(&tree, "c"), CheckState::Checked, "d is its sole child");
        assert_eq!(check_of(&tree, "a"), CheckState::Checked);
    }

    #[test]
    fn opened_is_presentation_only() {
        let mut tree = checkbox_tree();
        let b = tree.get("b").unwrap();
        let children_before: Vec<NodeId> = tree.children_of(b).to_vec();

        tree.set_opened("b", true, Notify::Events);
        assert!(tree.is_opened(b));
        assert_eq!(tree.children_of(b), children_before.as_slice());

        tree.set_opened("b", false, Notify::Events);
        assert!(!tree.is_opened(b));
    }

    #[test]
    fn set_label_updates_and_notifies_once() {
        let mut tree = checkbox_tree();
        let log = Recorder::install(&mut tree);
        let b = tree.get("b").unwrap();

        tree.set_label("b", "Branch", Notify::Events);
        assert_eq!(tree.label(b), Some("Branch"));
        tree.set_label("b", "Branch", Notify::Events);
        assert_eq!(
            &*log.borrow(),
            &[TreeEvent::LabelChanged(b)],
            "unchanged label must not notify again"
        );
    }

    #[test]
    fn stale_ids_answer_none_everywhere() {
        let mut tree = checkbox_tree();
        let d = tree.get("d").unwrap();
        tree.remove("d").unwrap();

        assert!(!tree.is_alive(d));
        assert_eq!(tree.key(d), None);
        assert_eq!(tree.label(d), None);
        assert_eq!(tree.parent_of(d), None);
        assert_eq!(tree.check_state(d), None);
        assert!(tree.children_of(d).is_empty());
        assert!(!tree.is_selected(d));
        assert_eq!(tree.descendants(d, true).count(), 0);
        assert_eq!(tree.ancestors(d, true).count(), 0);
        assert_eq!(tree.to_data(d), None);

        // Slot reuse bumps the generation, so the old id stays stale.
        let f = tree.insert(Some("b"), leaf("f")).unwrap();
        if f.idx() == d.idx() {
            assert!(f.generation() > d.generation(), "generation must increase on reuse");
        }
        assert!(!tree.is_alive(d));
        assert!(tree.is_alive(f));
    }

    #[test]
    fn with_nodes_builds_forest_in_order() {
        let tree = Tree::with_nodes(
            TreeConfig::default(),
            vec![leaf("x"), leaf("y"), leaf("z")],
        )
        .unwrap();
        let keys: Vec<&str> = tree.all().filter_map(|id| tree.key(id)).collect();
        assert_eq!(keys, ["x", "y", "z"]);
    }

    #[test]
    fn to_data_round_trips() {
        let tree = checkbox_tree();
        let a = tree.get("a").unwrap();
        let data = tree.to_data(a).unwrap();

        let rebuilt = Tree::with_nodes(*tree.config(), vec![data]).unwrap();
        assert_eq!(rebuilt.len(), tree.len());
        let keys: Vec<&str> = rebuilt.all().filter_map(|id| rebuilt.key(id)).collect();
        let original: Vec<&str> = tree.all().filter_map(|id| tree.key(id)).collect();
        assert_eq!(keys, original);
    }

    #[test]
    fn observer_sees_structural_events() {
        let mut tree = checkbox_tree();
        let log = Recorder::install(&mut tree);

        let f = tree.insert(Some("b"), leaf("f")).unwrap();
        tree.set_checked("f", true);
        tree.remove("f").unwrap();

        assert_eq!(
            &*log.borrow(),
            &[
                TreeEvent::Inserted(f),
                TreeEvent::CheckChanged(f),
                TreeEvent::Removed {
                    key: "f".to_string()
                },
            ]
        );
    }

    #[test]
    fn presentation_attributes_are_opaque() {
        let mut tree = Tree::default();
        let id = tree
            .insert(
                None,
                NodeData {
                    icon: Some("folder".to_string()),
                    icon_color: Some("amber".to_string()),
                    tag: Some("directory".to_string()),
                    ..leaf("a")
                },
            )
            .unwrap();
        assert_eq!(tree.icon(id), Some("folder"));
        assert_eq!(tree.icon_color(id), Some("amber"));
        assert_eq!(tree.tag(id), Some("directory"));
    }
}
