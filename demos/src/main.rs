// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Builds a small checkbox tree, walks through a few interactions the way a
//! tree-view widget would drive them, and prints the forest after each step.

use canopy_tree::{
    CheckState, NodeData, NodeId, Notify, Tree, TreeConfig, TreeEvent, TreeObserver,
};

struct EventLogger;

impl TreeObserver for EventLogger {
    fn on_event(&mut self, event: &TreeEvent) {
        println!("    event: {event:?}");
    }
}

fn main() -> Result<(), canopy_tree::TreeError> {
    let mut tree = Tree::with_nodes(
        TreeConfig {
            checkboxes: true,
            ..TreeConfig::default()
        },
        vec![
            NodeData {
                opened: true,
                icon: Some("folder".into()),
                children: vec![
                    NodeData {
                        children: vec![
                            NodeData::new("docs/guides/install", "install.md"),
                            NodeData::new("docs/guides/usage", "usage.md"),
                        ],
                        ..NodeData::new("docs/guides", "guides")
                    },
                    NodeData::new("docs/readme", "README.md"),
                ],
                ..NodeData::new("docs", "docs")
            },
            NodeData::new("license", "LICENSE"),
        ],
    )?;
    tree.subscribe(Box::new(EventLogger));

    println!("initial:");
    print_forest(&tree);

    println!("\ncheck docs/guides (cascades down, aggregates up):");
    tree.set_checked("docs/guides", true);
    print_forest(&tree);

    println!("\nuncheck docs/guides/usage (guides and docs go indeterminate):");
    tree.set_checked("docs/guides/usage", false);
    print_forest(&tree);

    println!("\nselect README, then LICENSE (single-select clears the first):");
    tree.select("docs/readme", Notify::Events);
    tree.select("license", Notify::Events);
    print_forest(&tree);

    println!("\nremove docs/guides and reinsert it sorted by label:");
    let guides = tree.remove("docs/guides").expect("guides subtree exists");
    let by_label = |tree: &Tree, a: NodeId, b: NodeId| tree.label(a).cmp(&tree.label(b));
    tree.insert_ordered(
        Some("docs"),
        guides,
        canopy_tree::InsertOrder::Sorted(&by_label),
    )?;
    print_forest(&tree);

    Ok(())
}

fn print_forest(tree: &Tree) {
    for id in tree.all() {
        let depth = tree.ancestors(id, false).count();
        let mark = match tree.check_state(id) {
            Some(CheckState::Checked) => "[x]",
            Some(CheckState::Indeterminate) => "[-]",
            _ => "[ ]",
        };
        let sel = if tree.is_selected(id) { " *" } else { "" };
        println!(
            "  {}{} {}{}",
            "  ".repeat(depth),
            mark,
            tree.label(id).unwrap_or("?"),
            sel
        );
    }
}
