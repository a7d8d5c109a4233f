//! Core tree traits for walking the materialized part of a tree

use std::collections::VecDeque;
use std::sync::Arc;

use crate::tree::{Node, NodeKind};

/// A handle to one vertex of a hierarchical structure
///
/// Handles are cheap to clone. Implementations only expose what is already
/// in memory: `child_nodes` never triggers remote work.
pub trait TreeNode: Clone {
    /// The owning vertex, `None` at the top
    fn parent_node(&self) -> Option<Self>;

    /// Current children, in a stable order
    fn child_nodes(&self) -> Vec<Self>;

    /// Display name of the vertex
    fn label(&self) -> String;

    /// Whether this is a container or leaf vertex
    fn node_kind(&self) -> NodeKind;

    /// Identity comparison
    fn same_node(&self, other: &Self) -> bool;
}

impl TreeNode for Arc<Node> {
    fn parent_node(&self) -> Option<Self> {
        self.parent()
    }

    fn child_nodes(&self) -> Vec<Self> {
        self.children()
    }

    fn label(&self) -> String {
        self.name().to_string()
    }

    fn node_kind(&self) -> NodeKind {
        self.kind()
    }

    fn same_node(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

/// Traversal order for walking the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalOrder {
    /// Visit parent before children (top-down)
    PreOrder,
    /// Visit children before parent (bottom-up)
    PostOrder,
    /// Visit level by level (breadth-first)
    BreadthFirst,
}

/// Extension trait providing traversal and search utilities
///
/// This trait is automatically implemented for all types that implement
/// `TreeNode`.
pub trait TreeTraversal: TreeNode {
    /// Walk the subtree rooted at this vertex in the specified order
    fn walk(&self, order: TraversalOrder) -> TreeWalker<Self> {
        TreeWalker::new(self.clone(), order)
    }

    /// Names from the topmost ancestor down to this vertex, joined by `/`
    fn path(&self) -> String {
        let mut components = vec![self.label()];
        components.extend(self.ancestors().iter().map(TreeNode::label));
        components.reverse();
        components.join("/")
    }

    /// Number of ancestors (top = 0)
    fn depth(&self) -> usize {
        self.ancestors().len()
    }

    /// All ancestors, from parent to top
    fn ancestors(&self) -> Vec<Self> {
        let mut ancestors = Vec::new();
        let mut current = self.parent_node();
        while let Some(parent) = current {
            current = parent.parent_node();
            ancestors.push(parent);
        }
        ancestors
    }

    /// Check if this vertex is an ancestor of another
    fn is_ancestor_of(&self, descendant: &Self) -> bool {
        descendant.ancestors().iter().any(|a| a.same_node(self))
    }

    /// All leaf vertices of the subtree
    fn leaves(&self) -> Vec<Self> {
        self.walk(TraversalOrder::PreOrder)
            .filter(|n| n.node_kind().is_leaf())
            .collect()
    }

    /// All container vertices of the subtree, including this one
    fn containers(&self) -> Vec<Self> {
        self.walk(TraversalOrder::PreOrder)
            .filter(|n| n.node_kind().is_container())
            .collect()
    }

    /// Find all vertices with a given name
    fn find_all_by_name(&self, name: &str) -> Vec<Self> {
        self.walk(TraversalOrder::PreOrder)
            .filter(|n| n.label() == name)
            .collect()
    }

    /// Count vertices in the subtree, including this one
    fn subtree_size(&self) -> usize {
        self.walk(TraversalOrder::PreOrder).count()
    }
}

// Blanket implementation for all TreeNode types
impl<T: TreeNode> TreeTraversal for T {}

/// Iterator for traversing a tree in different orders
///
/// Children are read when their parent is visited, so vertices added to an
/// already visited part of the tree are not reported.
pub struct TreeWalker<T: TreeNode> {
    order: TraversalOrder,
    /// Pending vertices; the flag marks post-order vertices whose children
    /// were already pushed
    stack: Vec<(T, bool)>,
    queue: VecDeque<T>,
}

impl<T: TreeNode> TreeWalker<T> {
    /// Create a new tree walker starting from the given vertex
    pub fn new(start: T, order: TraversalOrder) -> Self {
        let mut walker = Self {
            order,
            stack: Vec::new(),
            queue: VecDeque::new(),
        };
        match order {
            TraversalOrder::BreadthFirst => walker.queue.push_back(start),
            _ => walker.stack.push((start, false)),
        }
        walker
    }

    fn next_preorder(&mut self) -> Option<T> {
        let (current, _) = self.stack.pop()?;

        // Add children in reverse order so they're popped in correct order
        for child in current.child_nodes().into_iter().rev() {
            self.stack.push((child, false));
        }

        Some(current)
    }

    fn next_postorder(&mut self) -> Option<T> {
        while let Some((current, expanded)) = self.stack.pop() {
            if expanded {
                return Some(current);
            }

            let children = current.child_nodes();
            self.stack.push((current, true));
            for child in children.into_iter().rev() {
                self.stack.push((child, false));
            }
        }
        None
    }

    fn next_breadthfirst(&mut self) -> Option<T> {
        let current = self.queue.pop_front()?;
        self.queue.extend(current.child_nodes());
        Some(current)
    }
}

impl<T: TreeNode> Iterator for TreeWalker<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        match self.order {
            TraversalOrder::PreOrder => self.next_preorder(),
            TraversalOrder::PostOrder => self.next_postorder(),
            TraversalOrder::BreadthFirst => self.next_breadthfirst(),
        }
    }
}
