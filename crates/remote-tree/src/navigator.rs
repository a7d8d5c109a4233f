//! Navigation and search over a forest
//!
//! A [`Navigator`] owns a [`Forest`] and a cursor. Lookups always try what is
//! already in memory before going to the resource client, and a remote hit is
//! only materialized together with the chain of ancestors that connects it
//! to a root.

use log::{debug, info, trace};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::client::{Body, LeafType, Metadata, ResourceClient};
use crate::config::NavigatorConfig;
use crate::error::{Result, TreeError};
use crate::session::Session;
use crate::tree::{Forest, Node, NodeKind, ResourceId, TreeTraversal};

/// Picks one of several search candidates
///
/// Implemented for any `Fn(&[Metadata]) -> usize`.
pub trait Chooser: Send + Sync {
    fn choose_index(&self, candidates: &[Metadata]) -> usize;
}

impl<F> Chooser for F
where
    F: Fn(&[Metadata]) -> usize + Send + Sync,
{
    fn choose_index(&self, candidates: &[Metadata]) -> usize {
        self(candidates)
    }
}

/// Options for [`Navigator::resolve_global`]
#[derive(Clone)]
pub struct ResolveOptions {
    /// Go straight to a remote search, ignoring materialized nodes
    pub skip_cache: bool,
    /// Ask `chooser` when a search returns several candidates
    ///
    /// Without it the first candidate, in the client's order, is taken.
    pub interactive: bool,
    /// Materialize the hit and its ancestors; when false the raw record is
    /// returned and the tree is left untouched
    pub materialize_path: bool,
    /// Required whenever `interactive` is set
    pub chooser: Option<Arc<dyn Chooser>>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            skip_cache: false,
            interactive: false,
            materialize_path: true,
            chooser: None,
        }
    }
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_cache(mut self, skip: bool) -> Self {
        self.skip_cache = skip;
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn materialize_path(mut self, materialize: bool) -> Self {
        self.materialize_path = materialize;
        self
    }

    /// Set the disambiguation callback and turn on `interactive`
    pub fn chooser(mut self, chooser: impl Chooser + 'static) -> Self {
        self.chooser = Some(Arc::new(chooser));
        self.interactive = true;
        self
    }
}

impl fmt::Debug for ResolveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveOptions")
            .field("skip_cache", &self.skip_cache)
            .field("interactive", &self.interactive)
            .field("materialize_path", &self.materialize_path)
            .field("chooser", &self.chooser.is_some())
            .finish()
    }
}

/// Outcome of a global resolution
#[derive(Debug, Clone)]
pub enum Resolved {
    /// A materialized node connected to a forest root
    Node(Arc<Node>),
    /// The chosen record, when path materialization was not requested
    Metadata(Metadata),
}

impl Resolved {
    pub fn metadata(&self) -> &Metadata {
        match self {
            Resolved::Node(node) => node.metadata(),
            Resolved::Metadata(meta) => meta,
        }
    }

    pub fn node(&self) -> Option<&Arc<Node>> {
        match self {
            Resolved::Node(node) => Some(node),
            Resolved::Metadata(_) => None,
        }
    }

    pub fn into_node(self) -> Result<Arc<Node>> {
        match self {
            Resolved::Node(node) => Ok(node),
            Resolved::Metadata(meta) => Err(TreeError::invalid(format!(
                "{} was resolved without materializing its path",
                meta.id
            ))),
        }
    }
}

/// Which kinds of children [`Navigator::load_children`] materializes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadScope {
    pub containers: bool,
    pub leaves: bool,
}

impl LoadScope {
    pub const ALL: LoadScope = LoadScope {
        containers: true,
        leaves: true,
    };
    pub const CONTAINERS: LoadScope = LoadScope {
        containers: true,
        leaves: false,
    };
    pub const LEAVES: LoadScope = LoadScope {
        containers: false,
        leaves: true,
    };
}

#[derive(Default)]
struct Cursor {
    root: Option<Arc<Node>>,
    current: Option<Arc<Node>>,
}

/// Entry point for browsing and searching a remote forest
pub struct Navigator {
    forest: Forest,
    cursor: Mutex<Cursor>,
}

impl Navigator {
    /// Create a navigator with an empty forest
    pub fn new(client: Arc<dyn ResourceClient>, config: NavigatorConfig) -> Self {
        Self {
            forest: Forest::new(Session::new(client, config)),
            cursor: Mutex::new(Cursor::default()),
        }
    }

    /// Create a navigator whose forest holds every root the client lists
    ///
    /// The cursor starts on the first root.
    pub async fn connect(client: Arc<dyn ResourceClient>, config: NavigatorConfig) -> Result<Self> {
        let navigator = Self::new(client, config);
        for meta in navigator.client().list_roots().await? {
            navigator.forest.admit(meta)?;
        }
        navigator.reset_cursor();
        info!("connected with {} roots", navigator.forest.len());
        Ok(navigator)
    }

    /// Create a navigator from explicit root ids
    ///
    /// Every id must name a root-shaped container.
    pub async fn with_roots<I>(
        client: Arc<dyn ResourceClient>,
        config: NavigatorConfig,
        roots: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = ResourceId>,
    {
        let navigator = Self::new(client, config);
        for id in roots {
            let meta = navigator.client().get_metadata(&id).await?;
            navigator.forest.admit(meta)?;
        }
        navigator.reset_cursor();
        Ok(navigator)
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn session(&self) -> &Arc<Session> {
        self.forest.session()
    }

    fn client(&self) -> &Arc<dyn ResourceClient> {
        self.forest.session().client()
    }

    fn config(&self) -> &NavigatorConfig {
        self.forest.session().config()
    }

    /// The node the cursor points at
    pub fn current(&self) -> Option<Arc<Node>> {
        self.cursor.lock().current.clone()
    }

    /// The root the cursor is in
    pub fn current_root(&self) -> Option<Arc<Node>> {
        self.cursor.lock().root.clone()
    }

    /// Names from the current root down to the cursor
    pub fn pwd(&self) -> Option<String> {
        self.current().map(|node| node.path())
    }

    fn reset_cursor(&self) {
        if let Some(first) = self.forest.roots().first() {
            self.set_cursor(first);
        }
    }

    fn set_cursor(&self, node: &Arc<Node>) {
        let root = node
            .ancestors()
            .last()
            .cloned()
            .unwrap_or_else(|| Arc::clone(node));
        let mut cursor = self.cursor.lock();
        cursor.root = Some(root);
        cursor.current = Some(Arc::clone(node));
    }

    fn cursor_node(&self) -> Result<Arc<Node>> {
        self.current()
            .ok_or_else(|| TreeError::not_found("navigator has no current node"))
    }

    /// Move the cursor to a forest root, admitting it first if needed
    ///
    /// An id that is not yet a root is admitted when the store describes it
    /// as a parentless container.
    pub async fn switch_root(&self, root_id: &ResourceId) -> Result<Arc<Node>> {
        if let Some(root) = self.forest.root(root_id) {
            self.set_cursor(&root);
            return Ok(root);
        }

        let meta = self.client().get_metadata(root_id).await?;
        if !meta.is_root_shaped() || meta.kind != NodeKind::Container {
            return Err(TreeError::not_found(format!("{root_id} is not a root")));
        }
        self.forest.admit(meta)?;

        let root = self
            .forest
            .root(root_id)
            .ok_or_else(|| TreeError::not_found(format!("{root_id} is not a root")))?;
        self.set_cursor(&root);
        Ok(root)
    }

    /// Search the materialized subtree below the cursor
    pub fn find_local(&self, query: &str, required: Option<NodeKind>) -> Result<Arc<Node>> {
        self.cursor_node()?.lookup_descendant(query, required)
    }

    /// Find a node anywhere the client can reach
    ///
    /// Materialized nodes in every root are checked first unless
    /// `opts.skip_cache` is set. A remote search follows; with several
    /// candidates the chooser decides when `opts.interactive` is set,
    /// otherwise the first candidate wins. The hit is then connected to the
    /// forest by [`Navigator::materialize_path`].
    pub async fn resolve_global(&self, query: &str, opts: &ResolveOptions) -> Result<Resolved> {
        if !opts.skip_cache {
            if let Ok(node) = self.forest.lookup(query, None) {
                debug!("resolved {query} from materialized nodes");
                return Ok(Resolved::Node(node));
            }
        }

        let mut candidates = self
            .client()
            .search(query, self.config().search_limit)
            .await?;
        if candidates.is_empty() {
            return Err(TreeError::not_found(format!("no resource matches {query}")));
        }

        let index = Self::choose(&candidates, opts)?;
        let candidate = candidates.swap_remove(index);
        debug!("resolving {query} to {} ({})", candidate.name, candidate.id);

        if !opts.materialize_path {
            return Ok(Resolved::Metadata(candidate));
        }
        self.materialize_path(&candidate).await.map(Resolved::Node)
    }

    fn choose(candidates: &[Metadata], opts: &ResolveOptions) -> Result<usize> {
        if candidates.len() == 1 || !opts.interactive {
            return Ok(0);
        }
        let chooser = opts
            .chooser
            .as_ref()
            .ok_or_else(|| TreeError::invalid("interactive resolution requires a chooser"))?;
        let index = chooser.choose_index(candidates);
        if index >= candidates.len() {
            return Err(TreeError::invalid(format!(
                "chooser picked {index} of {} candidates",
                candidates.len()
            )));
        }
        Ok(index)
    }

    /// Materialize a remote record and every ancestor between it and the
    /// nearest known root
    ///
    /// Ancestors are fetched one at a time walking upward until an id is a
    /// forest root, an already materialized container, or a parentless
    /// record (which is admitted as a new root). The chain is then walked
    /// back down, discovering each level. A leaf is attached by re-reading
    /// its record and checking it still belongs to the resolved parent.
    ///
    /// Roots admitted on the way are kept even if a later step fails.
    pub async fn materialize_path(&self, candidate: &Metadata) -> Result<Arc<Node>> {
        if let Some(node) = self.forest.find_materialized(&candidate.id) {
            return Ok(node);
        }

        let Some(parent_id) = candidate.parent.clone() else {
            return match candidate.kind {
                NodeKind::Container => self.forest.admit(candidate.clone()),
                NodeKind::Leaf => Err(TreeError::invalid(format!(
                    "leaf {} has no parent to attach to",
                    candidate.id
                ))),
            };
        };

        let (top, chain) = self.reconstruct_ancestry(parent_id).await?;
        let mut current = top;
        for meta in chain.iter().rev() {
            current = self.descend(&current, meta).await?;
        }

        match candidate.kind {
            NodeKind::Container => self.descend(&current, candidate).await,
            NodeKind::Leaf => self.verify_and_adopt(&current, candidate).await,
        }
    }

    /// Walk upward from `start`; returns the node where the walk stopped and
    /// the fetched records below it, nearest first
    async fn reconstruct_ancestry(
        &self,
        start: ResourceId,
    ) -> Result<(Arc<Node>, SmallVec<[Metadata; 8]>)> {
        let max_depth = self.config().max_depth;
        let mut chain: SmallVec<[Metadata; 8]> = SmallVec::new();
        let mut seen = HashSet::new();
        let mut next = start;

        loop {
            if self.forest.is_root(&next) {
                if let Some(root) = self.forest.root(&next) {
                    trace!("ancestry stops at root {}", root.id());
                    return Ok((root, chain));
                }
            }
            if let Some(known) = self.forest.find_materialized(&next) {
                if known.is_container() {
                    trace!("ancestry stops at materialized {}", known.id());
                    return Ok((known, chain));
                }
            }
            if chain.len() >= max_depth {
                return Err(TreeError::invalid(format!(
                    "ancestry deeper than {max_depth} levels at {next}"
                )));
            }
            if !seen.insert(next.clone()) {
                return Err(TreeError::conflict(format!("ancestry loops at {next}")));
            }

            let meta = self.client().get_metadata(&next).await?;
            trace!("fetched ancestor {} ({})", meta.name, meta.id);
            match meta.parent.clone() {
                None => {
                    let root = self.forest.admit(meta)?;
                    return Ok((root, chain));
                }
                Some(parent) => {
                    chain.push(meta);
                    next = parent;
                }
            }
        }
    }

    /// Discover `parent` and materialize the child described by `meta`
    async fn descend(&self, parent: &Arc<Node>, meta: &Metadata) -> Result<Arc<Node>> {
        parent.discover_children().await?;
        match parent.materialize_by_id(&meta.id) {
            Ok(node) => Ok(node),
            Err(err) if err.is_not_found() => self.verify_and_adopt(parent, meta).await,
            Err(err) => Err(err),
        }
    }

    /// Attach one child without listing its parent
    ///
    /// The record is fetched again so a resource that moved since it was
    /// found yields `Conflict` instead of a node with the wrong parent.
    async fn verify_and_adopt(&self, parent: &Arc<Node>, meta: &Metadata) -> Result<Arc<Node>> {
        if let Some(existing) = parent.child(&meta.id) {
            return Ok(existing);
        }
        let fresh = self.client().get_metadata(&meta.id).await?;
        if fresh.kind != meta.kind {
            return Err(TreeError::conflict(format!(
                "{} changed from {} to {}",
                meta.id, meta.kind, fresh.kind
            )));
        }
        parent.adopt(fresh)
    }

    /// Discover `node` and materialize the requested kinds of children
    ///
    /// Returns the nodes created by this call.
    pub async fn load_children(
        &self,
        node: &Arc<Node>,
        scope: LoadScope,
    ) -> Result<Vec<Arc<Node>>> {
        node.discover_children().await?;
        let mut created = Vec::new();
        if scope.containers {
            created.extend(node.materialize_kind(NodeKind::Container)?);
        }
        if scope.leaves {
            created.extend(node.materialize_kind(NodeKind::Leaf)?);
        }
        Ok(created)
    }

    /// Find below the cursor, discovering the cursor's children on a miss
    async fn find_near(&self, query: &str, required: NodeKind) -> Result<Arc<Node>> {
        match self.find_local(query, Some(required)) {
            Err(err) if err.is_not_found() => {
                let current = self.cursor_node()?;
                current.discover_children().await?;
                current.lookup_local(query, Some(required))
            }
            found => found,
        }
    }

    /// Move the cursor to a container; `..` goes up, `/` to the current root
    pub async fn change_directory(&self, query: &str) -> Result<Arc<Node>> {
        let target = match query {
            ".." => self
                .cursor_node()?
                .parent()
                .ok_or_else(|| TreeError::not_found("already at a root"))?,
            "/" => self
                .current_root()
                .ok_or_else(|| TreeError::not_found("navigator has no root"))?,
            _ => self.find_near(query, NodeKind::Container).await?,
        };
        self.set_cursor(&target);
        Ok(target)
    }

    /// Load the content of a leaf near the cursor
    pub async fn read_entry(&self, query: &str) -> Result<Body> {
        let leaf = self.find_near(query, NodeKind::Leaf).await?;
        leaf.load_content().await
    }

    /// Create a container under `parent` and materialize it
    pub async fn create_container(&self, parent: &Arc<Node>, name: &str) -> Result<Arc<Node>> {
        if parent.is_leaf() {
            return Err(TreeError::invalid(format!(
                "cannot create {name} under leaf {}",
                parent.id()
            )));
        }
        let meta = self.client().create_container(parent.id(), name).await?;
        info!("created container {} ({})", meta.name, meta.id);
        parent.adopt(meta)
    }

    /// Create a leaf under `parent` and materialize it
    pub async fn create_leaf(
        &self,
        parent: &Arc<Node>,
        name: &str,
        leaf_type: LeafType,
    ) -> Result<Arc<Node>> {
        if parent.is_leaf() {
            return Err(TreeError::invalid(format!(
                "cannot create {name} under leaf {}",
                parent.id()
            )));
        }
        let meta = self
            .client()
            .create_leaf(parent.id(), name, leaf_type)
            .await?;
        info!("created leaf {} ({})", meta.name, meta.id);
        parent.adopt(meta)
    }

    pub async fn load_content(&self, node: &Arc<Node>) -> Result<Body> {
        node.load_content().await
    }

    pub async fn save(&self, node: &Arc<Node>, body: Body) -> Result<()> {
        node.save(body).await
    }
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("forest", &self.forest)
            .field("current", &self.current().map(|n| n.id().clone()))
            .finish()
    }
}
