//! Plain-text rendering of the materialized part of a tree

use std::fmt::Write;
use std::sync::Arc;

use crate::tree::{Node, NodeKind, Readiness, TraversalOrder, TreeTraversal};

/// Render the materialized subtree below `node`, one line per node
///
/// Containers end with `/` and carry a marker for what is not in memory:
/// `[?]` never discovered, `[..]` discovery in flight, `[+N]` N known
/// children not materialized.
pub fn format_tree(node: &Arc<Node>) -> String {
    let base = node.depth();
    let mut out = String::new();

    for current in node.walk(TraversalOrder::PreOrder) {
        let indent = "  ".repeat(current.depth() - base);
        match current.kind() {
            NodeKind::Leaf => {
                let _ = writeln!(out, "{}{}", indent, current.name());
            }
            NodeKind::Container => {
                let marker = match current.readiness() {
                    Readiness::Unstarted => " [?]".to_string(),
                    Readiness::Discovering => " [..]".to_string(),
                    Readiness::Ready => match current.unmaterialized().len() {
                        0 => String::new(),
                        hidden => format!(" [+{hidden}]"),
                    },
                };
                let _ = writeln!(out, "{}{}/{}", indent, current.name(), marker);
            }
        }
    }

    out
}
