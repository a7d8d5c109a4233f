//! The cached tree
//!
//! Nodes mirror remote resources and are only created on request. A
//! [`Forest`] groups the independently rooted trees a navigator can reach.

pub mod display;
mod forest;
mod node;
mod traits;

pub use display::format_tree;
pub use forest::Forest;
pub use node::{Content, Node, NodeKind, Readiness, ResourceId};
pub use traits::{TraversalOrder, TreeNode, TreeTraversal, TreeWalker};

/// Re-export common types for convenience
pub mod prelude {
    pub use super::{
        format_tree, Forest, Node, NodeKind, Readiness, ResourceId, TraversalOrder, TreeNode,
        TreeTraversal,
    };
}
