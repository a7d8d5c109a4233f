//! The remote side of the cache
//!
//! `ResourceClient` is the only way the tree talks to the store it mirrors.
//! Two implementations ship with the crate: an in-process [`MemoryClient`]
//! used by tests and demos, and a [`FilesystemClient`] that exposes local
//! directories as remote roots.

pub mod filesystem;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tree::{NodeKind, ResourceId};

pub use filesystem::FilesystemClient;
pub use memory::{CallCounts, MemoryClient};

/// The resource type of a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeafType {
    /// Free-form document without structured content
    Document,
    /// Tabular values, readable and writable as a [`Body`]
    Table,
    /// Opaque binary payload
    Binary,
}

impl LeafType {
    /// Returns true if leaves of this type carry structured content
    pub const fn has_structured_content(self) -> bool {
        matches!(self, LeafType::Table)
    }
}

/// Lightweight descriptor of a remote resource
///
/// This is what discovery and search return, and what a node keeps for
/// children it has not materialized yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub kind: NodeKind,
    pub id: ResourceId,
    pub name: String,
    /// Owning container, `None` for a root-shaped resource
    pub parent: Option<ResourceId>,
    /// Set for leaves only
    pub leaf_type: Option<LeafType>,
}

impl Metadata {
    pub fn container(
        id: impl Into<ResourceId>,
        name: impl Into<String>,
        parent: Option<ResourceId>,
    ) -> Self {
        Self {
            kind: NodeKind::Container,
            id: id.into(),
            name: name.into(),
            parent,
            leaf_type: None,
        }
    }

    pub fn leaf(
        id: impl Into<ResourceId>,
        name: impl Into<String>,
        parent: Option<ResourceId>,
        leaf_type: LeafType,
    ) -> Self {
        Self {
            kind: NodeKind::Leaf,
            id: id.into(),
            name: name.into(),
            parent,
            leaf_type: Some(leaf_type),
        }
    }

    /// Returns true if the record has no parent
    pub fn is_root_shaped(&self) -> bool {
        self.parent.is_none()
    }

    /// Returns true if `query` names this record by id or exact name
    pub fn matches(&self, query: &str) -> bool {
        self.id.as_str() == query || self.name == query
    }

    pub fn has_structured_content(&self) -> bool {
        self.leaf_type
            .map(LeafType::has_structured_content)
            .unwrap_or(false)
    }
}

/// Structured content of a table leaf
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    pub rows: Vec<Vec<String>>,
}

impl Body {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// Set a cell, growing the table with empty cells as needed
    pub fn set_cell(&mut self, row: usize, column: usize, value: impl Into<String>) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= column {
            cells.resize(column + 1, String::new());
        }
        cells[column] = value.into();
    }
}

/// Capability to read and mutate the remote tree
///
/// Implementations report a missing resource as `TreeError::NotFound` and any
/// transport, auth or quota problem as `TreeError::RemoteUnavailable`. All
/// calls are suspension points; none should block the calling thread.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Every root-shaped container the caller can reach
    async fn list_roots(&self) -> Result<Vec<Metadata>>;

    async fn get_metadata(&self, id: &ResourceId) -> Result<Metadata>;

    /// One bounded page of the container's children
    async fn list_children(&self, container: &ResourceId, page_size: usize)
        -> Result<Vec<Metadata>>;

    /// Resources whose id or exact name equals `pattern`
    async fn search(&self, pattern: &str, limit: usize) -> Result<Vec<Metadata>>;

    async fn create_container(&self, parent: &ResourceId, name: &str) -> Result<Metadata>;

    async fn create_leaf(
        &self,
        parent: &ResourceId,
        name: &str,
        leaf_type: LeafType,
    ) -> Result<Metadata>;

    async fn read_leaf_content(&self, id: &ResourceId) -> Result<Body>;

    async fn write_leaf_content(&self, id: &ResourceId, body: &Body) -> Result<()>;
}
