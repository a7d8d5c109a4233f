//! Multi-root management

use log::info;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

use crate::client::Metadata;
use crate::error::{Result, TreeError};
use crate::session::Session;
use crate::tree::{Node, NodeKind, ResourceId, TraversalOrder, TreeTraversal};

#[derive(Default)]
struct Roots {
    nodes: Vec<Arc<Node>>,
    ids: HashSet<ResourceId>,
}

/// The independently rooted trees reachable through one session
///
/// Roots are kept in admission order. The id set is what upward path walks
/// consult to know where to stop; it changes exactly when a root is admitted.
pub struct Forest {
    session: Arc<Session>,
    roots: RwLock<Roots>,
}

impl Forest {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            roots: RwLock::new(Roots::default()),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Root nodes in admission order
    pub fn roots(&self) -> Vec<Arc<Node>> {
        self.roots.read().nodes.clone()
    }

    pub fn root_ids(&self) -> HashSet<ResourceId> {
        self.roots.read().ids.clone()
    }

    pub fn is_root(&self, id: &ResourceId) -> bool {
        self.roots.read().ids.contains(id)
    }

    pub fn root(&self, id: &ResourceId) -> Option<Arc<Node>> {
        self.roots
            .read()
            .nodes
            .iter()
            .find(|r| r.id() == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.roots.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a root-shaped container as a root, or return the existing one
    pub fn admit(&self, meta: Metadata) -> Result<Arc<Node>> {
        if !meta.is_root_shaped() {
            return Err(TreeError::invalid(format!(
                "{} has a parent and cannot be a root",
                meta.id
            )));
        }

        let mut roots = self.roots.write();
        if let Some(existing) = roots.nodes.iter().find(|r| r.id() == &meta.id) {
            return Ok(Arc::clone(existing));
        }

        let root = Node::new_root(meta, Arc::clone(&self.session))?;
        info!("admitted root {} ({})", root.name(), root.id());
        roots.ids.insert(root.id().clone());
        roots.nodes.push(Arc::clone(&root));
        Ok(root)
    }

    /// Search every root in order, by id across all roots before any name
    pub fn lookup(&self, query: &str, required: Option<NodeKind>) -> Result<Arc<Node>> {
        let roots = self.roots();
        roots
            .iter()
            .find_map(|root| root.descendant_by_id(query, required))
            .or_else(|| {
                roots
                    .iter()
                    .find_map(|root| root.descendant_by_name(query, required))
            })
            .ok_or_else(|| TreeError::not_found(format!("{query} in any root")))
    }

    /// An already materialized node with this id, without materializing
    pub fn find_materialized(&self, id: &ResourceId) -> Option<Arc<Node>> {
        self.roots().iter().find_map(|root| {
            root.walk(TraversalOrder::PreOrder)
                .find(|node| node.id() == id)
        })
    }

    /// Number of materialized nodes across all roots
    pub fn materialized_count(&self) -> usize {
        self.roots().iter().map(|r| r.subtree_size()).sum()
    }
}

impl std::fmt::Debug for Forest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forest")
            .field("roots", &self.roots.read().nodes)
            .finish()
    }
}
