//! Core node types for the cached tree

use derive_more::{Display, From};
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};

use crate::client::{Body, LeafType, Metadata};
use crate::error::{Result, TreeError};
use crate::session::Session;
use crate::tree::{TraversalOrder, TreeTraversal};

/// Opaque remote identifier of a resource
///
/// Unique across every tree a navigator can reach.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        ResourceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        ResourceId(id.to_string())
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The type/kind of a node in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A container node - can have children (e.g., folder)
    Container,
    /// A leaf node - cannot have children (e.g., file)
    Leaf,
}

impl NodeKind {
    /// Returns true if this is a container node
    pub const fn is_container(self) -> bool {
        matches!(self, NodeKind::Container)
    }

    /// Returns true if this is a leaf node
    pub const fn is_leaf(self) -> bool {
        matches!(self, NodeKind::Leaf)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Container => write!(f, "Container"),
            NodeKind::Leaf => write!(f, "Leaf"),
        }
    }
}

/// Whether a node's child metadata can be trusted yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Readiness {
    /// No listing has completed; discovery may be started
    #[display(fmt = "Unstarted")]
    Unstarted,
    /// One listing call is in flight
    #[display(fmt = "Discovering")]
    Discovering,
    /// Child metadata is populated
    #[display(fmt = "Ready")]
    Ready,
}

/// Cached body of a structured leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Unloaded,
    Loaded(Body),
}

type DiscoveryFuture = Shared<BoxFuture<'static, Result<()>>>;

/// Discovery state; every waiter clones the same pending future
enum Discovery {
    Unstarted,
    Pending(DiscoveryFuture),
    Ready,
}

/// Child bookkeeping guarded by the node's lock
struct Children {
    discovery: Discovery,
    containers: Vec<Metadata>,
    leaves: Vec<Metadata>,
    /// Owned children, in materialization order
    materialized: Vec<Arc<Node>>,
}

impl Children {
    fn new() -> Self {
        Self {
            discovery: Discovery::Unstarted,
            containers: Vec::new(),
            leaves: Vec::new(),
            materialized: Vec::new(),
        }
    }

    fn readiness(&self) -> Readiness {
        match self.discovery {
            Discovery::Unstarted => Readiness::Unstarted,
            Discovery::Pending(_) => Readiness::Discovering,
            Discovery::Ready => Readiness::Ready,
        }
    }

    fn metadata(&self) -> impl Iterator<Item = &Metadata> {
        self.containers.iter().chain(self.leaves.iter())
    }

    fn knows(&self, id: &ResourceId) -> bool {
        self.metadata().any(|m| &m.id == id)
    }

    fn child(&self, id: &ResourceId) -> Option<&Arc<Node>> {
        self.materialized.iter().find(|c| c.id() == id)
    }

    /// Id match first, then the first exact name match
    fn find_metadata(&self, query: &str) -> Option<&Metadata> {
        self.metadata()
            .find(|m| m.id.as_str() == query)
            .or_else(|| self.metadata().find(|m| m.name == query))
    }

    fn remember(&mut self, meta: Metadata) {
        if self.knows(&meta.id) {
            return;
        }
        match meta.kind {
            NodeKind::Container => self.containers.push(meta),
            NodeKind::Leaf => self.leaves.push(meta),
        }
    }

    fn apply_listing(&mut self, listing: Vec<Metadata>) {
        let (containers, leaves): (Vec<Metadata>, Vec<Metadata>) =
            listing.into_iter().partition(|m| m.kind.is_container());
        self.containers = containers;
        self.leaves = leaves;

        // Children added by targeted adoption stay known past the page bound
        let adopted: Vec<Metadata> = self
            .materialized
            .iter()
            .map(|c| c.metadata().clone())
            .collect();
        for meta in adopted {
            self.remember(meta);
        }
    }

    /// Return the existing child for `meta` or create and own a new one
    fn materialize(&mut self, parent: &Arc<Node>, meta: Metadata) -> Arc<Node> {
        if let Some(existing) = self.child(&meta.id) {
            return Arc::clone(existing);
        }
        trace!("materializing {} under {}", meta.id, parent.id());
        let child = Node::build(meta, Arc::downgrade(parent), Arc::clone(&parent.session), false);
        self.materialized.push(Arc::clone(&child));
        child
    }
}

/// Outcome of matching a query against ids only
enum IdMatch {
    Found(Arc<Node>),
    /// The id exists but the node has the wrong kind
    WrongKind,
    Missing,
}

impl IdMatch {
    fn check(node: Arc<Node>, kind_ok: bool) -> Self {
        if kind_ok {
            IdMatch::Found(node)
        } else {
            IdMatch::WrongKind
        }
    }
}

/// A single cached vertex of the remote tree
///
/// Nodes are always handled through `Arc`. A node owns its materialized
/// children; the parent link is weak and only used to walk upward.
pub struct Node {
    meta: Metadata,
    parent: Weak<Node>,
    root: bool,
    session: Arc<Session>,
    children: Mutex<Children>,
    content: tokio::sync::Mutex<Content>,
}

impl Node {
    /// Create a forest root from a root-shaped container record
    pub fn new_root(meta: Metadata, session: Arc<Session>) -> Result<Arc<Node>> {
        if meta.kind != NodeKind::Container {
            return Err(TreeError::invalid(format!(
                "root {} must be a container",
                meta.id
            )));
        }
        Ok(Self::build(meta, Weak::new(), session, true))
    }

    fn build(meta: Metadata, parent: Weak<Node>, session: Arc<Session>, root: bool) -> Arc<Node> {
        Arc::new(Node {
            meta,
            parent,
            root,
            session,
            children: Mutex::new(Children::new()),
            content: tokio::sync::Mutex::new(Content::Unloaded),
        })
    }

    pub fn kind(&self) -> NodeKind {
        self.meta.kind
    }

    pub fn id(&self) -> &ResourceId {
        &self.meta.id
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// The record this node was materialized from
    pub fn metadata(&self) -> &Metadata {
        &self.meta
    }

    pub fn leaf_type(&self) -> Option<LeafType> {
        self.meta.leaf_type
    }

    pub fn has_structured_content(&self) -> bool {
        self.meta.has_structured_content()
    }

    pub fn is_container(&self) -> bool {
        self.kind().is_container()
    }

    pub fn is_leaf(&self) -> bool {
        self.kind().is_leaf()
    }

    /// Returns true for forest roots
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// The owning node, `None` for roots
    pub fn parent(&self) -> Option<Arc<Node>> {
        self.parent.upgrade()
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn readiness(&self) -> Readiness {
        self.children.lock().readiness()
    }

    /// Materialized children, in materialization order
    pub fn children(&self) -> Vec<Arc<Node>> {
        self.children.lock().materialized.clone()
    }

    /// Materialized child with the given id
    pub fn child(&self, id: &ResourceId) -> Option<Arc<Node>> {
        self.children.lock().child(id).cloned()
    }

    /// Known child records of one kind, materialized or not
    pub fn child_metadata(&self, kind: NodeKind) -> Vec<Metadata> {
        let children = self.children.lock();
        match kind {
            NodeKind::Container => children.containers.clone(),
            NodeKind::Leaf => children.leaves.clone(),
        }
    }

    /// Known child records that have not been materialized yet
    pub fn unmaterialized(&self) -> Vec<Metadata> {
        let children = self.children.lock();
        children
            .metadata()
            .filter(|m| children.child(&m.id).is_none())
            .cloned()
            .collect()
    }

    /// Populate this node's child metadata with one remote listing
    ///
    /// The first call on an unstarted container spawns the listing on the
    /// tokio runtime; every caller arriving while it is in flight awaits the
    /// same shared outcome. The listing runs to completion even if every
    /// caller stops waiting, and its result is still cached.
    ///
    /// On failure the node returns to `Unstarted` so a later call retries.
    /// Calls on a ready node or on a leaf return immediately.
    pub async fn discover_children(self: &Arc<Self>) -> Result<()> {
        if self.is_leaf() {
            return Ok(());
        }

        let pending = {
            let mut children = self.children.lock();
            match &children.discovery {
                Discovery::Ready => return Ok(()),
                Discovery::Pending(pending) => {
                    trace!("joining in-flight discovery of {}", self.id());
                    pending.clone()
                }
                Discovery::Unstarted => {
                    let pending = self.start_discovery();
                    children.discovery = Discovery::Pending(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    fn start_discovery(self: &Arc<Self>) -> DiscoveryFuture {
        debug!("discovering children of {} ({})", self.name(), self.id());

        let client = Arc::clone(self.session.client());
        let page_size = self.session.config().page_size;
        let id = self.id().clone();
        let node = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            let listing = client.list_children(&id, page_size).await;
            match node.upgrade() {
                Some(node) => node.finish_discovery(listing),
                None => listing.map(|_| ()),
            }
        });

        let node = Arc::downgrade(self);
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    if let Some(node) = node.upgrade() {
                        node.children.lock().discovery = Discovery::Unstarted;
                    }
                    Err(TreeError::remote(format!("discovery task failed: {err}")))
                }
            }
        }
        .boxed()
        .shared()
    }

    fn finish_discovery(&self, listing: Result<Vec<Metadata>>) -> Result<()> {
        let mut children = self.children.lock();
        match listing {
            Ok(listing) => {
                debug!("discovered {} children of {}", listing.len(), self.id());
                children.apply_listing(listing);
                children.discovery = Discovery::Ready;
                Ok(())
            }
            Err(err) => {
                warn!("discovery of {} failed: {}", self.id(), err);
                children.discovery = Discovery::Unstarted;
                Err(err)
            }
        }
    }

    fn require_ready(&self, children: &Children) -> Result<()> {
        match children.readiness() {
            Readiness::Ready => Ok(()),
            state => Err(TreeError::invalid(format!(
                "children of {} are not discovered ({})",
                self.id(),
                state
            ))),
        }
    }

    /// Materialize every known child; returns only the newly created nodes
    pub fn materialize_all(self: &Arc<Self>) -> Result<Vec<Arc<Node>>> {
        self.materialize_where(|_| true)
    }

    /// Materialize every known child of one kind
    pub fn materialize_kind(self: &Arc<Self>, kind: NodeKind) -> Result<Vec<Arc<Node>>> {
        self.materialize_where(|m| m.kind == kind)
    }

    fn materialize_where(
        self: &Arc<Self>,
        keep: impl Fn(&Metadata) -> bool,
    ) -> Result<Vec<Arc<Node>>> {
        if self.is_leaf() {
            return Ok(Vec::new());
        }
        let mut children = self.children.lock();
        self.require_ready(&children)?;

        let pending: Vec<Metadata> = children
            .metadata()
            .filter(|m| keep(m) && children.child(&m.id).is_none())
            .cloned()
            .collect();

        Ok(pending
            .into_iter()
            .map(|meta| children.materialize(self, meta))
            .collect())
    }

    /// Materialize a single known child by id or exact name
    pub fn materialize_one(self: &Arc<Self>, query: &str) -> Result<Arc<Node>> {
        if self.is_leaf() {
            return Err(TreeError::not_found(format!(
                "leaf {} has no child {query}",
                self.id()
            )));
        }
        let mut children = self.children.lock();
        self.require_ready(&children)?;

        let meta = children
            .find_metadata(query)
            .cloned()
            .ok_or_else(|| TreeError::not_found(format!("{query} under {}", self.id())))?;
        Ok(children.materialize(self, meta))
    }

    /// Materialize a single known child by id, never by name
    pub fn materialize_by_id(self: &Arc<Self>, id: &ResourceId) -> Result<Arc<Node>> {
        if self.is_leaf() {
            return Err(TreeError::not_found(format!(
                "leaf {} has no child {id}",
                self.id()
            )));
        }
        let mut children = self.children.lock();
        self.require_ready(&children)?;

        let meta = children
            .metadata()
            .find(|m| &m.id == id)
            .cloned()
            .ok_or_else(|| TreeError::not_found(format!("{id} under {}", self.id())))?;
        Ok(children.materialize(self, meta))
    }

    /// Record `meta` as a child and materialize it without a full listing
    ///
    /// `meta` must name this node as its parent.
    pub(crate) fn adopt(self: &Arc<Self>, meta: Metadata) -> Result<Arc<Node>> {
        if self.is_leaf() {
            return Err(TreeError::invalid(format!(
                "leaf {} cannot have children",
                self.id()
            )));
        }
        if meta.parent.as_ref() != Some(self.id()) {
            return Err(TreeError::conflict(format!(
                "{} is no longer a child of {}",
                meta.id,
                self.id()
            )));
        }
        let mut children = self.children.lock();
        children.remember(meta.clone());
        Ok(children.materialize(self, meta))
    }

    /// Match this node, its materialized children, then its known records
    ///
    /// Ids are tried across all three scopes before names. A record match is
    /// materialized on the spot. Never issues a remote call.
    pub fn lookup_local(
        self: &Arc<Self>,
        query: &str,
        required: Option<NodeKind>,
    ) -> Result<Arc<Node>> {
        let not_found = || TreeError::not_found(format!("{query} near {}", self.id()));
        match self.match_id(query, required) {
            IdMatch::Found(node) => Ok(node),
            IdMatch::WrongKind => Err(not_found()),
            IdMatch::Missing => self.match_name(query, required).ok_or_else(not_found),
        }
    }

    fn match_id(self: &Arc<Self>, query: &str, required: Option<NodeKind>) -> IdMatch {
        let kind_ok = |kind: NodeKind| required.map_or(true, |r| r == kind);

        if self.id().as_str() == query {
            return IdMatch::check(Arc::clone(self), kind_ok(self.kind()));
        }

        let mut children = self.children.lock();
        if let Some(child) = children.materialized.iter().find(|c| c.id().as_str() == query) {
            return IdMatch::check(Arc::clone(child), kind_ok(child.kind()));
        }
        let by_id = children.metadata().find(|m| m.id.as_str() == query).cloned();
        match by_id {
            Some(meta) if kind_ok(meta.kind) => IdMatch::Found(children.materialize(self, meta)),
            Some(_) => IdMatch::WrongKind,
            None => IdMatch::Missing,
        }
    }

    fn match_name(
        self: &Arc<Self>,
        query: &str,
        required: Option<NodeKind>,
    ) -> Option<Arc<Node>> {
        let kind_ok = |kind: NodeKind| required.map_or(true, |r| r == kind);

        if self.name() == query && kind_ok(self.kind()) {
            return Some(Arc::clone(self));
        }
        let mut children = self.children.lock();
        if let Some(child) = children
            .materialized
            .iter()
            .find(|c| c.name() == query && kind_ok(c.kind()))
        {
            return Some(Arc::clone(child));
        }
        let meta = children
            .metadata()
            .find(|m| m.name == query && kind_ok(m.kind))
            .cloned()?;
        Some(children.materialize(self, meta))
    }

    /// Pre-order search of the materialized subtree for an id match only
    pub(crate) fn descendant_by_id(
        self: &Arc<Self>,
        query: &str,
        required: Option<NodeKind>,
    ) -> Option<Arc<Node>> {
        self.walk(TraversalOrder::PreOrder)
            .find_map(|node| match node.match_id(query, required) {
                IdMatch::Found(found) => Some(found),
                _ => None,
            })
    }

    /// Pre-order search of the materialized subtree for a name match only
    pub(crate) fn descendant_by_name(
        self: &Arc<Self>,
        query: &str,
        required: Option<NodeKind>,
    ) -> Option<Arc<Node>> {
        self.walk(TraversalOrder::PreOrder)
            .find_map(|node| node.match_name(query, required))
    }

    /// Depth-first lookup over the materialized subtree
    ///
    /// The whole subtree is searched by id before any name is compared, so
    /// a deeper id match beats a shallower name match. Containers that were
    /// never discovered are not discovered here.
    pub fn lookup_descendant(
        self: &Arc<Self>,
        query: &str,
        required: Option<NodeKind>,
    ) -> Result<Arc<Node>> {
        self.descendant_by_id(query, required)
            .or_else(|| self.descendant_by_name(query, required))
            .ok_or_else(|| TreeError::not_found(format!("{query} below {}", self.id())))
    }

    fn require_structured(&self) -> Result<()> {
        if self.has_structured_content() {
            Ok(())
        } else {
            Err(TreeError::invalid(format!(
                "{} has no structured content",
                self.id()
            )))
        }
    }

    /// Fetch the body once; later calls return the cached value
    pub async fn load_content(&self) -> Result<Body> {
        self.require_structured()?;
        let mut content = self.content.lock().await;
        if let Content::Loaded(body) = &*content {
            return Ok(body.clone());
        }
        let body = self.session.client().read_leaf_content(self.id()).await?;
        debug!("loaded content of {} ({} rows)", self.id(), body.row_count());
        *content = Content::Loaded(body.clone());
        Ok(body)
    }

    /// Write a new body back to the store
    ///
    /// Fails with `Conflict` until the body has been loaded once.
    pub async fn save(&self, body: Body) -> Result<()> {
        self.require_structured()?;
        let mut content = self.content.lock().await;
        if *content == Content::Unloaded {
            return Err(TreeError::conflict(format!(
                "{} saved before its content was loaded",
                self.id()
            )));
        }
        self.session
            .client()
            .write_leaf_content(self.id(), &body)
            .await?;
        *content = Content::Loaded(body);
        Ok(())
    }

    /// Returns true once the body has been loaded
    ///
    /// Reports false while a load is in flight.
    pub fn is_content_loaded(&self) -> bool {
        self.content
            .try_lock()
            .map(|c| matches!(*c, Content::Loaded(_)))
            .unwrap_or(false)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", self.id())
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("readiness", &self.readiness())
            .finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MemoryClient, ResourceClient};
    use crate::config::NavigatorConfig;
    use pretty_assertions::assert_eq;

    fn sample() -> (Arc<MemoryClient>, Arc<Node>) {
        let client = Arc::new(
            MemoryClient::new()
                .with_root("root", "Root")
                .with_container("root", "a", "A")
                .with_container("root", "b", "B")
                .with_leaf("root", "x", "notes", LeafType::Table)
                .with_leaf("root", "y", "A", LeafType::Document),
        );
        let session = Session::new(client.clone(), NavigatorConfig::default());
        let root = Node::new_root(Metadata::container("root", "Root", None), session).unwrap();
        (client, root)
    }

    #[test]
    fn test_resource_id() {
        let id = ResourceId::from("abc");
        assert_eq!(id.as_str(), "abc");
        assert_eq!(id.to_string(), "abc");
        assert_eq!(ResourceId::from(String::from("abc")), id);
    }

    #[test]
    fn test_node_kind() {
        assert!(NodeKind::Container.is_container());
        assert!(!NodeKind::Container.is_leaf());
        assert!(NodeKind::Leaf.is_leaf());
        assert!(!NodeKind::Leaf.is_container());
        assert_eq!(Readiness::Discovering.to_string(), "Discovering");
    }

    #[test]
    fn test_root_must_be_container() {
        let client: Arc<dyn ResourceClient> = Arc::new(MemoryClient::new());
        let session = Session::new(client, NavigatorConfig::default());
        let leaf = Metadata::leaf("l", "l", None, LeafType::Document);
        assert!(Node::new_root(leaf, session).is_err());
    }

    #[tokio::test]
    async fn test_discovery_splits_kinds() {
        let (_client, root) = sample();
        assert_eq!(root.readiness(), Readiness::Unstarted);
        root.discover_children().await.unwrap();
        assert_eq!(root.readiness(), Readiness::Ready);
        assert_eq!(root.child_metadata(NodeKind::Container).len(), 2);
        assert_eq!(root.child_metadata(NodeKind::Leaf).len(), 2);
        assert!(root.children().is_empty());
    }

    #[tokio::test]
    async fn test_materialize_requires_ready() {
        let (_client, root) = sample();
        let err = root.materialize_all().unwrap_err();
        assert!(matches!(err, TreeError::InvalidOperation(_)));
        assert!(matches!(
            root.materialize_one("a").unwrap_err(),
            TreeError::InvalidOperation(_)
        ));
    }

    #[tokio::test]
    async fn test_materialize_kind_then_all() {
        let (_client, root) = sample();
        root.discover_children().await.unwrap();

        let containers = root.materialize_kind(NodeKind::Container).unwrap();
        assert_eq!(containers.len(), 2);
        assert!(containers.iter().all(|c| c.is_container()));

        let rest = root.materialize_all().unwrap();
        assert_eq!(rest.len(), 2);
        assert!(root.materialize_all().unwrap().is_empty());
        assert_eq!(root.children().len(), 4);
        assert!(root.unmaterialized().is_empty());
    }

    #[tokio::test]
    async fn test_materialize_one_prefers_id_then_name() {
        let (_client, root) = sample();
        root.discover_children().await.unwrap();

        let by_name = root.materialize_one("A").unwrap();
        assert_eq!(by_name.id().as_str(), "a");
        let again = root.materialize_one("a").unwrap();
        assert!(Arc::ptr_eq(&by_name, &again));

        assert!(root.materialize_one("zzz").unwrap_err().is_not_found());
        assert_eq!(by_name.parent().unwrap().id().as_str(), "root");
        assert!(!by_name.is_root());
    }

    #[tokio::test]
    async fn test_lookup_local_kind_filter() {
        let (client, root) = sample();
        root.discover_children().await.unwrap();
        let before = client.calls();

        // "x" is a leaf: asking for a container must fail even though the id matches
        assert!(root
            .lookup_local("x", Some(NodeKind::Container))
            .unwrap_err()
            .is_not_found());
        assert!(root.child(&"x".into()).is_none());

        // Two children are named "A"; the kind decides which one matches
        let leaf = root.lookup_local("A", Some(NodeKind::Leaf)).unwrap();
        assert_eq!(leaf.id().as_str(), "y");
        let folder = root.lookup_local("A", Some(NodeKind::Container)).unwrap();
        assert_eq!(folder.id().as_str(), "a");

        assert!(Arc::ptr_eq(&root.lookup_local("Root", None).unwrap(), &root));
        assert_eq!(client.calls(), before);
    }

    #[tokio::test]
    async fn test_lookup_descendant_prefers_deeper_id() {
        let client = Arc::new(
            MemoryClient::new()
                .with_root("root", "Root")
                .with_container("root", "a", "A")
                .with_leaf("root", "n", "x", LeafType::Document)
                .with_leaf("a", "x", "deep", LeafType::Document),
        );
        let session = Session::new(client.clone(), NavigatorConfig::default());
        let root = Node::new_root(Metadata::container("root", "Root", None), session).unwrap();
        root.discover_children().await.unwrap();
        let a = root.materialize_one("a").unwrap();
        a.discover_children().await.unwrap();

        let hit = root.lookup_descendant("x", None).unwrap();
        assert_eq!(hit.id().as_str(), "x");
        assert_eq!(hit.parent().unwrap().id().as_str(), "a");

        // Without an id match the name still resolves
        assert_eq!(root.lookup_descendant("deep", None).unwrap().id().as_str(), "x");
        assert_eq!(root.lookup_local("x", None).unwrap().id().as_str(), "n");
    }

    #[tokio::test]
    async fn test_materialize_by_id_ignores_names() {
        let (_client, root) = sample();
        root.discover_children().await.unwrap();

        // "A" is a name here, never an id
        assert!(root.materialize_by_id(&"A".into()).unwrap_err().is_not_found());
        assert!(root.children().is_empty());

        let a = root.materialize_by_id(&"a".into()).unwrap();
        assert_eq!(a.name(), "A");
        assert_eq!(root.children().len(), 1);
    }

    #[tokio::test]
    async fn test_leaf_discovery_is_a_no_op() {
        let (client, root) = sample();
        root.discover_children().await.unwrap();
        let leaf = root.materialize_one("x").unwrap();
        leaf.discover_children().await.unwrap();
        assert!(leaf.materialize_all().unwrap().is_empty());
        assert_eq!(client.calls().list_children, 1);
    }

    #[tokio::test]
    async fn test_content_loads_once_and_save_requires_load() {
        let (client, root) = sample();
        root.discover_children().await.unwrap();
        let table = root.materialize_one("notes").unwrap();

        let mut body = Body::default();
        body.set_cell(0, 0, "v");
        assert!(matches!(
            table.save(body.clone()).await.unwrap_err(),
            TreeError::Conflict(_)
        ));
        assert!(!table.is_content_loaded());

        table.load_content().await.unwrap();
        table.load_content().await.unwrap();
        assert_eq!(client.calls().read_content, 1);
        assert!(table.is_content_loaded());

        table.save(body.clone()).await.unwrap();
        assert_eq!(table.load_content().await.unwrap(), body);
        assert_eq!(client.stored_content("x"), Some(body));

        let document = root.materialize_one("y").unwrap();
        assert!(matches!(
            document.load_content().await.unwrap_err(),
            TreeError::InvalidOperation(_)
        ));
    }
}
