//! The filesystem tree
//!
//! A hierarchy of named entries. Each entry is a tagged variant: a directory
//! owning its children, or a file owning a `VersionedFile` chain and an
//! open flag. The root directory has no name and is its own parent.
//!
//! Every operation runs under one short critical section on the tree lock,
//! so structural changes (including `mv` across two parents) are atomic: an
//! observer sees an entry either at its source or at its destination, never
//! both and never neither.
//!
//! `detach`/`attach` exist so a caller unwinding a failed commit can restore
//! a removed entry with its identity and version history intact.

use crate::versioned::VersionedFile;
use memfs_core::{Error, NodeId, NodeKind, Path, Result};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared handle to a file entry: identity, version chain, and open flag.
///
/// The `Arc`s alias the live tree entry, so a handle taken before a rename
/// or move keeps addressing the same file.
#[derive(Debug, Clone)]
pub struct FileRef {
    /// Identity of the file entry.
    pub id: NodeId,
    /// The file's version chain.
    pub versions: Arc<VersionedFile>,
    /// Whether any client has opened the file.
    pub open: Arc<AtomicBool>,
}

impl FileRef {
    /// Whether the file has been opened.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct FileNode {
    id: NodeId,
    versions: Arc<VersionedFile>,
    open: Arc<AtomicBool>,
}

#[derive(Debug)]
struct DirNode {
    id: NodeId,
    children: FxHashMap<String, Node>,
}

#[derive(Debug)]
enum Node {
    Dir(DirNode),
    File(FileNode),
}

impl Node {
    fn id(&self) -> NodeId {
        match self {
            Node::Dir(d) => d.id,
            Node::File(f) => f.id,
        }
    }

    fn kind(&self) -> NodeKind {
        match self {
            Node::Dir(_) => NodeKind::Directory,
            Node::File(_) => NodeKind::File,
        }
    }
}

/// An entry removed from the tree, held so it can be re-attached with its
/// identity and version history intact (rollback of a committed remove).
#[derive(Debug)]
pub struct DetachedNode(Node);

impl DetachedNode {
    /// Identity of the detached entry.
    pub fn id(&self) -> NodeId {
        self.0.id()
    }

    /// Kind of the detached entry.
    pub fn kind(&self) -> NodeKind {
        self.0.kind()
    }
}

/// The directory hierarchy. Thread-safe; share behind `Arc`.
#[derive(Debug)]
pub struct Tree {
    root_id: NodeId,
    root: RwLock<DirNode>,
}

impl Tree {
    /// Create a tree holding only the root directory.
    pub fn new() -> Self {
        let root_id = NodeId::new();
        Tree {
            root_id,
            root: RwLock::new(DirNode {
                id: root_id,
                children: FxHashMap::default(),
            }),
        }
    }

    /// Identity of the root directory.
    pub fn root_id(&self) -> NodeId {
        self.root_id
    }

    /// Identity and kind of the entry at `path`, if present.
    pub fn lookup(&self, path: &Path) -> Option<(NodeId, NodeKind)> {
        let root = self.root.read();
        if path.is_root() {
            return Some((self.root_id, NodeKind::Directory));
        }
        find_node(&root, path).map(|node| (node.id(), node.kind()))
    }

    /// Resolve `path` to a file handle.
    pub fn resolve_file(&self, path: &Path) -> Result<FileRef> {
        let root = self.root.read();
        if path.is_root() {
            return Err(Error::not_a_file(path));
        }
        match find_node(&root, path) {
            None => Err(Error::no_such_file(path)),
            Some(Node::Dir(_)) => Err(Error::not_a_file(path)),
            Some(Node::File(file)) => Ok(FileRef {
                id: file.id,
                versions: Arc::clone(&file.versions),
                open: Arc::clone(&file.open),
            }),
        }
    }

    /// Resolve `path` to a directory identity.
    pub fn resolve_dir(&self, path: &Path) -> Result<NodeId> {
        let root = self.root.read();
        Ok(find_dir(&root, path)?.id)
    }

    /// Create an empty file entry at `path` with the given identity and
    /// (possibly pre-populated) chain and open flag.
    pub fn create_file(
        &self,
        path: &Path,
        id: NodeId,
        versions: Arc<VersionedFile>,
        open: Arc<AtomicBool>,
    ) -> Result<()> {
        self.insert(path, Node::File(FileNode { id, versions, open }))
    }

    /// Create a directory entry at `path`.
    pub fn create_dir(&self, path: &Path, id: NodeId) -> Result<()> {
        self.insert(
            path,
            Node::Dir(DirNode {
                id,
                children: FxHashMap::default(),
            }),
        )
    }

    fn insert(&self, path: &Path, node: Node) -> Result<()> {
        let mut root = self.root.write();
        let name = match path.name() {
            Some(name) => name.to_string(),
            None => return Err(Error::already_exists(path)),
        };
        let parent_path = path.parent();
        let parent = find_dir_mut(&mut root, &parent_path)?;
        if parent.children.contains_key(&name) {
            return Err(Error::already_exists(path));
        }
        parent.children.insert(name, node);
        Ok(())
    }

    /// Remove the entry at `path` and hand it back for possible re-attach.
    ///
    /// Fails with `NotEmpty` for a directory that still has children and
    /// with `NoSuchFile` when nothing resolves at `path`.
    pub fn detach(&self, path: &Path) -> Result<DetachedNode> {
        let mut root = self.root.write();
        let name = match path.name() {
            Some(name) => name,
            None => return Err(Error::invalid_operation("cannot remove the root directory")),
        };
        let parent_path = path.parent();
        let parent =
            find_dir_mut(&mut root, &parent_path).map_err(|_| Error::no_such_file(path))?;
        match parent.children.get(name) {
            None => Err(Error::no_such_file(path)),
            Some(Node::Dir(dir)) if !dir.children.is_empty() => Err(Error::not_empty(path)),
            Some(_) => {
                let node = parent.children.remove(name).expect("entry checked above");
                Ok(DetachedNode(node))
            }
        }
    }

    /// Re-attach a previously detached entry at `path`.
    pub fn attach(&self, path: &Path, node: DetachedNode) -> Result<()> {
        self.insert(path, node.0)
    }

    /// Move the entry at `src` to `dst`.
    ///
    /// When `dst` is an existing directory the entry keeps its name and is
    /// placed inside it; otherwise the entry is renamed to `dst`. Returns
    /// the path the entry actually landed at. A directory may not be moved
    /// into its own subtree.
    pub fn mv(&self, src: &Path, dst: &Path) -> Result<Path> {
        let mut root = self.root.write();

        let src_name = match src.name() {
            Some(name) => name.to_string(),
            None => return Err(Error::invalid_operation("cannot move the root directory")),
        };
        if find_node(&root, src).is_none() {
            return Err(Error::no_such_file(src));
        }

        let target = if dst.is_root() {
            dst.join(&src_name)
        } else {
            match find_node(&root, dst) {
                Some(Node::Dir(_)) => dst.join(&src_name),
                Some(Node::File(_)) => return Err(Error::already_exists(dst)),
                None => {
                    find_dir(&root, &dst.parent())?;
                    dst.clone()
                }
            }
        };

        if target == *src {
            return Err(Error::already_exists(&target));
        }
        if target.starts_with(src) {
            return Err(Error::invalid_operation(
                "cannot move an entry into its own subtree",
            ));
        }
        let target_parent = find_dir(&root, &target.parent())?;
        let target_name = target.name().expect("target is never the root").to_string();
        if target_parent.children.contains_key(&target_name) {
            return Err(Error::already_exists(&target));
        }

        // Validated above; the two mutations below cannot fail, so the move
        // is atomic under the single write lock.
        let node = find_dir_mut(&mut root, &src.parent())?
            .children
            .remove(&src_name)
            .expect("source checked above");
        find_dir_mut(&mut root, &target.parent())?
            .children
            .insert(target_name, node);

        Ok(target)
    }

    /// Sorted child names of the directory at `path`.
    pub fn ls(&self, path: &Path) -> Result<Vec<String>> {
        let root = self.root.read();
        let dir = find_dir(&root, path)?;
        let mut names: Vec<String> = dir.children.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Capture `file id -> cur version` over every file in the tree.
    ///
    /// Used to build a SNAPSHOT transaction's version map at begin time.
    pub fn snapshot_versions(&self) -> FxHashMap<NodeId, u64> {
        let root = self.root.read();
        let mut map = FxHashMap::default();
        collect_versions(&root, &mut map);
        map
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

fn find_node<'a>(root: &'a DirNode, path: &Path) -> Option<&'a Node> {
    let (last, dirs) = path.components().split_last()?;
    let mut current = root;
    for component in dirs {
        match current.children.get(component) {
            Some(Node::Dir(dir)) => current = dir,
            _ => return None,
        }
    }
    current.children.get(last)
}

fn find_dir<'a>(root: &'a DirNode, path: &Path) -> Result<&'a DirNode> {
    let mut current = root;
    for component in path.components() {
        match current.children.get(component) {
            Some(Node::Dir(dir)) => current = dir,
            Some(Node::File(_)) => return Err(Error::not_a_directory(path)),
            None => return Err(Error::no_such_directory(path)),
        }
    }
    Ok(current)
}

fn find_dir_mut<'a>(root: &'a mut DirNode, path: &Path) -> Result<&'a mut DirNode> {
    let mut current = root;
    for component in path.components() {
        match current.children.get_mut(component) {
            Some(Node::Dir(dir)) => current = dir,
            Some(Node::File(_)) => return Err(Error::not_a_directory(path)),
            None => return Err(Error::no_such_directory(path)),
        }
    }
    Ok(current)
}

fn collect_versions(dir: &DirNode, map: &mut FxHashMap<NodeId, u64>) {
    for node in dir.children.values() {
        match node {
            Node::File(file) => {
                map.insert(file.id, file.versions.current());
            }
            Node::Dir(child) => collect_versions(child, map),
        }
    }
}
