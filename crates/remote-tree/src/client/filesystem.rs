//! Local directories exposed as a resource store
//!
//! Each configured directory is a root. Resource ids are absolute paths,
//! directories are containers and files are leaves. The leaf type follows
//! the file extension: `.csv` files are tables (comma separated, one row per
//! line), text-like extensions are documents, everything else is binary.

use async_trait::async_trait;
use log::{debug, trace};
use std::collections::VecDeque;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::client::{Body, LeafType, Metadata, ResourceClient};
use crate::error::{Result, TreeError};
use crate::tree::{NodeKind, ResourceId};

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "json", "toml", "yaml", "yml", "rs", "html"];

/// A resource client backed by the local filesystem
#[derive(Debug, Clone)]
pub struct FilesystemClient {
    roots: Vec<PathBuf>,
}

impl FilesystemClient {
    /// Create a client exposing each directory in `roots` as a root
    ///
    /// # Errors
    ///
    /// Returns an error if a path doesn't exist or isn't a directory.
    pub fn new<I, P>(roots: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut canonical = Vec::new();
        for root in roots {
            let path = std::fs::canonicalize(root.as_ref())?;
            if !path.is_dir() {
                return Err(TreeError::invalid(format!(
                    "{} is not a directory",
                    path.display()
                )));
            }
            if !canonical.contains(&path) {
                canonical.push(path);
            }
        }
        Ok(Self { roots: canonical })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Resource id of a path
    pub fn id_of(path: &Path) -> ResourceId {
        ResourceId::from(path.to_string_lossy().into_owned())
    }

    fn is_root(&self, path: &Path) -> bool {
        self.roots.iter().any(|r| r == path)
    }

    /// Map an id back to a path, refusing anything outside the roots
    ///
    /// `..` components are rejected since `starts_with` compares components
    /// without resolving them.
    fn path_of(&self, id: &ResourceId) -> Result<PathBuf> {
        let path = PathBuf::from(id.as_str());
        let plain = path.components().all(|c| {
            matches!(
                c,
                Component::Prefix(_) | Component::RootDir | Component::Normal(_)
            )
        });
        if plain && path.is_absolute() && self.roots.iter().any(|r| path.starts_with(r)) {
            Ok(path)
        } else {
            Err(TreeError::not_found(format!("no resource with id {id}")))
        }
    }

    fn leaf_type(path: &Path) -> LeafType {
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => LeafType::Table,
            Some(ext) if TEXT_EXTENSIONS.contains(&ext) => LeafType::Document,
            None => LeafType::Document,
            Some(_) => LeafType::Binary,
        }
    }

    async fn describe(&self, path: &Path) -> Result<Metadata> {
        // Links are described, not followed, so a dangling one is still a leaf
        let metadata = fs::symlink_metadata(path).await?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        let parent = if self.is_root(path) {
            None
        } else {
            path.parent().map(Self::id_of)
        };

        let meta = if metadata.is_dir() {
            Metadata::container(Self::id_of(path), name, parent)
        } else {
            Metadata::leaf(Self::id_of(path), name, parent, Self::leaf_type(path))
        };
        Ok(meta)
    }

    async fn read_children(&self, path: &Path) -> Result<Vec<Metadata>> {
        let mut children = Vec::new();
        let mut entries = fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            children.push(self.describe(&entry.path()).await?);
        }

        // Directories first, then files, alphabetically within each group
        children.sort_by(|a, b| match (a.kind, b.kind) {
            (NodeKind::Container, NodeKind::Leaf) => std::cmp::Ordering::Less,
            (NodeKind::Leaf, NodeKind::Container) => std::cmp::Ordering::Greater,
            _ => a.name.cmp(&b.name),
        });
        Ok(children)
    }

    async fn container_path(&self, id: &ResourceId) -> Result<PathBuf> {
        let path = self.path_of(id)?;
        if !fs::metadata(&path).await?.is_dir() {
            return Err(TreeError::invalid(format!("{id} is not a container")));
        }
        Ok(path)
    }

    fn child_path(parent: &Path, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(std::path::MAIN_SEPARATOR) || name == ".." {
            return Err(TreeError::invalid(format!("invalid resource name {name:?}")));
        }
        Ok(parent.join(name))
    }
}

fn already_exists(err: std::io::Error, path: &Path) -> TreeError {
    if err.kind() == std::io::ErrorKind::AlreadyExists {
        TreeError::conflict(format!("{} already exists", path.display()))
    } else {
        err.into()
    }
}

fn parse_table(text: &str) -> Body {
    Body::new(
        text.lines()
            .map(|line| line.split(',').map(str::to_string).collect())
            .collect(),
    )
}

fn format_table(body: &Body) -> String {
    let mut out = String::new();
    for row in &body.rows {
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

#[async_trait]
impl ResourceClient for FilesystemClient {
    async fn list_roots(&self) -> Result<Vec<Metadata>> {
        let mut roots = Vec::with_capacity(self.roots.len());
        for root in &self.roots {
            roots.push(self.describe(root).await?);
        }
        Ok(roots)
    }

    async fn get_metadata(&self, id: &ResourceId) -> Result<Metadata> {
        let path = self.path_of(id)?;
        self.describe(&path).await
    }

    async fn list_children(
        &self,
        container: &ResourceId,
        page_size: usize,
    ) -> Result<Vec<Metadata>> {
        let path = self.container_path(container).await?;
        let mut children = self.read_children(&path).await?;
        children.truncate(page_size);
        debug!("listed {} children of {}", children.len(), path.display());
        Ok(children)
    }

    async fn search(&self, pattern: &str, limit: usize) -> Result<Vec<Metadata>> {
        let mut hits = Vec::new();

        if let Ok(path) = self.path_of(&ResourceId::from(pattern)) {
            if let Ok(meta) = self.describe(&path).await {
                hits.push(meta);
            }
        }

        // Breadth-first so shallower matches come first
        let mut queue: VecDeque<PathBuf> = self.roots.iter().cloned().collect();
        while let Some(dir) = queue.pop_front() {
            if hits.len() >= limit {
                break;
            }
            trace!("searching {}", dir.display());
            if let Some(root) = self.roots.iter().find(|r| **r == dir) {
                let meta = self.describe(root).await?;
                if meta.name == pattern && !hits.contains(&meta) {
                    hits.push(meta);
                }
            }
            for child in self.read_children(&dir).await? {
                if child.kind == NodeKind::Container {
                    queue.push_back(PathBuf::from(child.id.as_str()));
                }
                if child.name == pattern && !hits.contains(&child) {
                    hits.push(child);
                }
            }
        }

        hits.truncate(limit);
        Ok(hits)
    }

    async fn create_container(&self, parent: &ResourceId, name: &str) -> Result<Metadata> {
        let path = Self::child_path(&self.container_path(parent).await?, name)?;
        fs::create_dir(&path)
            .await
            .map_err(|e| already_exists(e, &path))?;
        self.describe(&path).await
    }

    async fn create_leaf(
        &self,
        parent: &ResourceId,
        name: &str,
        _leaf_type: LeafType,
    ) -> Result<Metadata> {
        let path = Self::child_path(&self.container_path(parent).await?, name)?;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| already_exists(e, &path))?;
        self.describe(&path).await
    }

    async fn read_leaf_content(&self, id: &ResourceId) -> Result<Body> {
        let path = self.path_of(id)?;
        if Self::leaf_type(&path) != LeafType::Table {
            return Err(TreeError::invalid(format!("{id} has no structured content")));
        }
        let text = fs::read_to_string(&path).await?;
        Ok(parse_table(&text))
    }

    async fn write_leaf_content(&self, id: &ResourceId, body: &Body) -> Result<()> {
        let path = self.path_of(id)?;
        if Self::leaf_type(&path) != LeafType::Table {
            return Err(TreeError::invalid(format!("{id} has no structured content")));
        }
        fs::write(&path, format_table(body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn create_test_tree() -> (TempDir, FilesystemClient) {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        // Create test structure:
        // root/
        //   file1.txt
        //   data.csv
        //   dir1/
        //     file2.txt
        //     dir2/
        //       file1.txt

        std_fs::write(root.join("file1.txt"), "content1").unwrap();
        std_fs::write(root.join("data.csv"), "a,b\n1,2\n").unwrap();
        std_fs::create_dir(root.join("dir1")).unwrap();
        std_fs::write(root.join("dir1/file2.txt"), "content2").unwrap();
        std_fs::create_dir(root.join("dir1/dir2")).unwrap();
        std_fs::write(root.join("dir1/dir2/file1.txt"), "content3").unwrap();

        let client = FilesystemClient::new([root]).unwrap();
        (temp, client)
    }

    fn root_id(client: &FilesystemClient) -> ResourceId {
        FilesystemClient::id_of(&client.roots()[0])
    }

    #[tokio::test]
    async fn test_roots_are_root_shaped() {
        let (_temp, client) = create_test_tree();
        let roots = client.list_roots().await.unwrap();
        assert_eq!(roots.len(), 1);
        assert!(roots[0].is_root_shaped());
        assert_eq!(roots[0].kind, NodeKind::Container);
    }

    #[tokio::test]
    async fn test_children_sorted_directories_first() {
        let (_temp, client) = create_test_tree();
        let children = client.list_children(&root_id(&client), 10).await.unwrap();
        let names: Vec<_> = children.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["dir1", "data.csv", "file1.txt"]);
        assert_eq!(children[1].leaf_type, Some(LeafType::Table));
        assert_eq!(children[2].leaf_type, Some(LeafType::Document));
        assert_eq!(children[0].parent, Some(root_id(&client)));

        let page = client.list_children(&root_id(&client), 2).await.unwrap();
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_search_finds_nested_matches() {
        let (_temp, client) = create_test_tree();
        let hits = client.search("file1.txt", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        // Shallow match first
        assert_eq!(hits[0].parent, Some(root_id(&client)));

        let limited = client.search("file1.txt", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_ids_outside_roots_are_not_found() {
        let (_temp, client) = create_test_tree();
        let err = client.get_metadata(&"/definitely/not/here".into()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_ids_escaping_a_root_are_not_found() {
        let (_temp, client) = create_test_tree();
        let root = client.roots()[0].clone();

        let escaping = format!("{}/dir1/../..", root.display());
        let err = client.get_metadata(&escaping.into()).await.unwrap_err();
        assert!(err.is_not_found());

        let sideways = format!("{}/dir1/../dir1", root.display());
        assert!(client.get_metadata(&sideways.into()).await.unwrap_err().is_not_found());

        let plain = FilesystemClient::id_of(&root.join("dir1"));
        assert_eq!(client.get_metadata(&plain).await.unwrap().name, "dir1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_symlink_does_not_break_listing() {
        let temp = TempDir::new().unwrap();
        std_fs::write(temp.path().join("ok.txt"), "fine").unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("broken"))
            .unwrap();
        let client = FilesystemClient::new([temp.path()]).unwrap();
        let root = root_id(&client);

        let children = client.list_children(&root, 10).await.unwrap();
        let names: Vec<_> = children.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["broken", "ok.txt"]);
        assert!(children.iter().all(|m| m.kind == NodeKind::Leaf));

        let hits = client.search("ok.txt", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_table_round_trip_and_create() {
        let (_temp, client) = create_test_tree();
        let root = root_id(&client);

        let data = client.search("data.csv", 1).await.unwrap().remove(0);
        let mut body = client.read_leaf_content(&data.id).await.unwrap();
        assert_eq!(body.cell(1, 1), Some("2"));

        body.set_cell(2, 0, "3");
        client.write_leaf_content(&data.id, &body).await.unwrap();
        assert_eq!(client.read_leaf_content(&data.id).await.unwrap(), body);

        let made = client.create_container(&root, "fresh").await.unwrap();
        assert_eq!(made.kind, NodeKind::Container);
        let again = client.create_container(&root, "fresh").await.unwrap_err();
        assert!(matches!(again, TreeError::Conflict(_)));
    }
}
