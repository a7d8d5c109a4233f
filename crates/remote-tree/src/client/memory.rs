//! In-process resource store with call instrumentation
//!
//! `MemoryClient` behaves like a remote store: every call is async, can be
//! delayed, and can be made to fail. It counts each call by operation so tests
//! can assert exactly how much remote traffic an operation caused.

use async_trait::async_trait;
use log::trace;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::client::{Body, LeafType, Metadata, ResourceClient};
use crate::error::{Result, TreeError};
use crate::tree::{NodeKind, ResourceId};

/// Snapshot of how many times each remote operation was invoked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_roots: usize,
    pub get_metadata: usize,
    pub list_children: usize,
    pub search: usize,
    pub create: usize,
    pub read_content: usize,
    pub write_content: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.list_roots
            + self.get_metadata
            + self.list_children
            + self.search
            + self.create
            + self.read_content
            + self.write_content
    }
}

#[derive(Default)]
struct Counters {
    list_roots: AtomicUsize,
    get_metadata: AtomicUsize,
    list_children: AtomicUsize,
    search: AtomicUsize,
    create: AtomicUsize,
    read_content: AtomicUsize,
    write_content: AtomicUsize,
}

#[derive(Default)]
struct Store {
    records: HashMap<ResourceId, Metadata>,
    /// Insertion order, which is also listing and search order
    order: Vec<ResourceId>,
    content: HashMap<ResourceId, Body>,
    next_id: usize,
}

impl Store {
    fn insert(&mut self, meta: Metadata) {
        if self.records.insert(meta.id.clone(), meta.clone()).is_none() {
            self.order.push(meta.id);
        }
    }

    fn ordered(&self) -> impl Iterator<Item = &Metadata> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    fn container(&self, id: &ResourceId) -> Result<&Metadata> {
        let meta = self
            .records
            .get(id)
            .ok_or_else(|| TreeError::not_found(format!("no resource with id {id}")))?;
        if meta.kind != NodeKind::Container {
            return Err(TreeError::invalid(format!("{id} is not a container")));
        }
        Ok(meta)
    }
}

/// A fake remote store kept entirely in memory
#[derive(Default)]
pub struct MemoryClient {
    store: Mutex<Store>,
    counters: Counters,
    listing_delay: Mutex<Option<Duration>>,
    failing_listings: AtomicUsize,
    offline: AtomicBool,
    history: Mutex<Vec<String>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root-shaped container
    pub fn with_root(self, id: &str, name: &str) -> Self {
        self.store.lock().insert(Metadata::container(id, name, None));
        self
    }

    /// Add a container under `parent`
    pub fn with_container(self, parent: &str, id: &str, name: &str) -> Self {
        self.store
            .lock()
            .insert(Metadata::container(id, name, Some(parent.into())));
        self
    }

    /// Add a leaf under `parent`
    pub fn with_leaf(self, parent: &str, id: &str, name: &str, leaf_type: LeafType) -> Self {
        self.store
            .lock()
            .insert(Metadata::leaf(id, name, Some(parent.into()), leaf_type));
        self
    }

    /// Set the stored body of a leaf
    pub fn with_content(self, id: &str, body: Body) -> Self {
        self.store.lock().content.insert(id.into(), body);
        self
    }

    /// Delay every `list_children` call by `delay`
    pub fn with_listing_delay(self, delay: Duration) -> Self {
        *self.listing_delay.lock() = Some(delay);
        self
    }

    /// Make the next `count` listing calls fail with `RemoteUnavailable`
    pub fn fail_next_listings(&self, count: usize) {
        self.failing_listings.store(count, Ordering::SeqCst);
    }

    /// Make every call fail with `RemoteUnavailable` while set
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Re-parent a resource, as another client of the store might
    pub fn move_resource(&self, id: &str, new_parent: Option<&str>) {
        if let Some(meta) = self.store.lock().records.get_mut(&ResourceId::from(id)) {
            meta.parent = new_parent.map(ResourceId::from);
        }
    }

    /// Stored body of a leaf, bypassing instrumentation
    pub fn stored_content(&self, id: &str) -> Option<Body> {
        self.store.lock().content.get(&ResourceId::from(id)).cloned()
    }

    pub fn calls(&self) -> CallCounts {
        let c = &self.counters;
        CallCounts {
            list_roots: c.list_roots.load(Ordering::SeqCst),
            get_metadata: c.get_metadata.load(Ordering::SeqCst),
            list_children: c.list_children.load(Ordering::SeqCst),
            search: c.search.load(Ordering::SeqCst),
            create: c.create.load(Ordering::SeqCst),
            read_content: c.read_content.load(Ordering::SeqCst),
            write_content: c.write_content.load(Ordering::SeqCst),
        }
    }

    /// Every call so far as `"<operation> <subject>"`, oldest first
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    fn record(&self, counter: &AtomicUsize, op: &str, subject: &str) -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        trace!("memory client call: {} {}", op, subject);
        self.history.lock().push(format!("{op} {subject}"));
        if self.offline.load(Ordering::SeqCst) {
            return Err(TreeError::remote(format!("{op}: store offline")));
        }
        Ok(())
    }

    fn create(
        &self,
        parent: &ResourceId,
        make: impl FnOnce(ResourceId) -> Metadata,
    ) -> Result<Metadata> {
        let mut store = self.store.lock();
        store.container(parent)?;
        store.next_id += 1;
        let id = ResourceId::from(format!("new-{}", store.next_id));
        let meta = make(id);
        store.insert(meta.clone());
        Ok(meta)
    }
}

#[async_trait]
impl ResourceClient for MemoryClient {
    async fn list_roots(&self) -> Result<Vec<Metadata>> {
        self.record(&self.counters.list_roots, "list_roots", "*")?;
        let store = self.store.lock();
        Ok(store
            .ordered()
            .filter(|m| m.is_root_shaped() && m.kind == NodeKind::Container)
            .cloned()
            .collect())
    }

    async fn get_metadata(&self, id: &ResourceId) -> Result<Metadata> {
        self.record(&self.counters.get_metadata, "get_metadata", id.as_str())?;
        self.store
            .lock()
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| TreeError::not_found(format!("no resource with id {id}")))
    }

    async fn list_children(
        &self,
        container: &ResourceId,
        page_size: usize,
    ) -> Result<Vec<Metadata>> {
        self.record(&self.counters.list_children, "list_children", container.as_str())?;

        let delay = *self.listing_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .failing_listings
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(TreeError::remote(format!("listing {container} failed")));
        }

        let store = self.store.lock();
        store.container(container)?;
        Ok(store
            .ordered()
            .filter(|m| m.parent.as_ref() == Some(container))
            .take(page_size)
            .cloned()
            .collect())
    }

    async fn search(&self, pattern: &str, limit: usize) -> Result<Vec<Metadata>> {
        self.record(&self.counters.search, "search", pattern)?;
        let store = self.store.lock();
        Ok(store
            .ordered()
            .filter(|m| m.matches(pattern))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create_container(&self, parent: &ResourceId, name: &str) -> Result<Metadata> {
        self.record(&self.counters.create, "create_container", name)?;
        self.create(parent, |id| Metadata::container(id, name, Some(parent.clone())))
    }

    async fn create_leaf(
        &self,
        parent: &ResourceId,
        name: &str,
        leaf_type: LeafType,
    ) -> Result<Metadata> {
        self.record(&self.counters.create, "create_leaf", name)?;
        self.create(parent, |id| {
            Metadata::leaf(id, name, Some(parent.clone()), leaf_type)
        })
    }

    async fn read_leaf_content(&self, id: &ResourceId) -> Result<Body> {
        self.record(&self.counters.read_content, "read_leaf_content", id.as_str())?;
        let store = self.store.lock();
        let meta = store
            .records
            .get(id)
            .ok_or_else(|| TreeError::not_found(format!("no resource with id {id}")))?;
        if !meta.has_structured_content() {
            return Err(TreeError::invalid(format!("{id} has no structured content")));
        }
        Ok(store.content.get(id).cloned().unwrap_or_default())
    }

    async fn write_leaf_content(&self, id: &ResourceId, body: &Body) -> Result<()> {
        self.record(&self.counters.write_content, "write_leaf_content", id.as_str())?;
        let mut store = self.store.lock();
        if !store.records.contains_key(id) {
            return Err(TreeError::not_found(format!("no resource with id {id}")));
        }
        store.content.insert(id.clone(), body.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> MemoryClient {
        MemoryClient::new()
            .with_root("root", "Root")
            .with_container("root", "a", "A")
            .with_leaf("root", "x", "x.csv", LeafType::Table)
            .with_leaf("a", "y", "x.csv", LeafType::Document)
    }

    #[tokio::test]
    async fn test_listing_is_ordered_and_bounded() {
        let client = sample();
        let all = client.list_children(&"root".into(), 10).await.unwrap();
        let names: Vec<_> = all.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["A", "x.csv"]);

        let page = client.list_children(&"root".into(), 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(client.calls().list_children, 2);
        assert_eq!(
            client.history(),
            vec!["list_children root", "list_children root"]
        );
    }

    #[tokio::test]
    async fn test_search_by_name_returns_every_match() {
        let client = sample();
        let hits = client.search("x.csv", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(client.search("y", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection_and_offline() {
        let client = sample();
        client.fail_next_listings(1);
        assert!(client.list_children(&"root".into(), 10).await.unwrap_err().is_remote());
        assert!(client.list_children(&"root".into(), 10).await.is_ok());

        client.set_offline(true);
        assert!(client.get_metadata(&"root".into()).await.unwrap_err().is_remote());
        client.set_offline(false);
        assert!(client.get_metadata(&"nope".into()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_create_under_leaf_is_invalid() {
        let client = sample();
        let err = client.create_container(&"x".into(), "sub").await.unwrap_err();
        assert!(matches!(err, TreeError::InvalidOperation(_)));

        let made = client.create_container(&"a".into(), "sub").await.unwrap();
        assert_eq!(made.parent, Some("a".into()));
        assert_eq!(client.calls().create, 2);
    }
}
