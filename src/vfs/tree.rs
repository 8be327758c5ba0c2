//! Arena-backed tree of directory nodes.
//!
//! Nodes own their child directories through ids into the arena and own their file handles
//! directly. The parent link is a plain id, so there is no ownership cycle between a node and
//! its children.

use std::collections::BTreeMap;

use crate::core::{Result, VfsError, utils};
use crate::vfs::FileHandle;

/// Index of a node inside a [`DirTree`].
pub type NodeId = usize;

/// One directory: named child directories and named file handles.
/// Directories and files are separate namespaces, a node may hold both `x/` and `x`.
#[derive(Debug)]
pub struct DirNode {
    name: String,
    parent: Option<NodeId>,
    dirs: BTreeMap<String, NodeId>,
    files: BTreeMap<String, FileHandle>,
}

impl DirNode {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            dirs: BTreeMap::new(),
            files: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child directories in name order.
    pub fn dirs(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.dirs.iter().map(|(name, &id)| (name.as_str(), id))
    }

    /// File bindings in name order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &FileHandle)> {
        self.files.iter().map(|(name, handle)| (name.as_str(), handle))
    }
}

/// Owned tree of [`DirNode`]s rooted at [`DirTree::ROOT`].
///
/// ### Invariants
///
/// 1. The root slot is always occupied and has no parent.
/// 2. Every id stored in a `dirs` map points to an occupied slot whose parent is the holder.
/// 3. Slots of removed subtrees are recycled; an id held outside the tree may therefore be
///    stale after `remove_dir`, which reports the ids it freed.
#[derive(Debug)]
pub struct DirTree {
    nodes: Vec<Option<DirNode>>,
    free: Vec<NodeId>,
}

impl DirTree {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self {
            nodes: vec![Some(DirNode::new("", None))],
            free: Vec::new(),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&DirNode> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    fn node(&self, id: NodeId) -> Result<&DirNode> {
        self.get(id)
            .ok_or_else(|| VfsError::NotFound(format!("<directory #{id}>")))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut DirNode> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or_else(|| VfsError::NotFound(format!("<directory #{id}>")))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(DirNode::parent)
    }

    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.get(id).and_then(|node| node.dirs.get(name).copied())
    }

    /// Creates an empty directory `name` under `parent`.
    pub fn insert_dir(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        if !utils::is_valid_name(name) {
            return Err(VfsError::InvalidPath(name.to_string()));
        }
        if self.node(parent)?.dirs.contains_key(name) {
            return Err(VfsError::AlreadyExists(self.display(parent, name)));
        }

        let node = DirNode::new(name, Some(parent));
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.node_mut(parent)?.dirs.insert(name.to_string(), id);

        log::debug!("mkdir {}", self.path_of(id));
        Ok(id)
    }

    /// Detaches directory `name` from `parent` and destroys its whole subtree.
    /// Every file handle in the subtree is released on the way out.
    /// Returns the ids that were freed.
    pub fn remove_dir(&mut self, parent: NodeId, name: &str) -> Result<Vec<NodeId>> {
        let shown = self.display(parent, name);
        let top = self
            .node_mut(parent)?
            .dirs
            .remove(name)
            .ok_or(VfsError::NotFound(shown.clone()))?;

        let mut removed = Vec::new();
        let mut stack = vec![top];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(id).and_then(Option::take) {
                stack.extend(node.dirs.values().copied());
                // dropping the node drops its handles
                removed.push(id);
            }
        }
        self.free.extend(removed.iter().copied());

        log::debug!("rmdir {} ({} directories)", shown, removed.len());
        Ok(removed)
    }

    pub fn file(&self, id: NodeId, name: &str) -> Option<&FileHandle> {
        self.get(id).and_then(|node| node.files.get(name))
    }

    /// Binds `handle` at `name`, returning the binding it replaced.
    pub fn insert_file(
        &mut self,
        id: NodeId,
        name: &str,
        handle: FileHandle,
    ) -> Result<Option<FileHandle>> {
        if !utils::is_valid_name(name) {
            return Err(VfsError::InvalidPath(name.to_string()));
        }
        Ok(self.node_mut(id)?.files.insert(name.to_string(), handle))
    }

    /// Unbinds `name` and hands the handle back to the caller.
    pub fn remove_file(&mut self, id: NodeId, name: &str) -> Result<FileHandle> {
        let shown = self.display(id, name);
        self.node_mut(id)?
            .files
            .remove(name)
            .ok_or(VfsError::NotFound(shown))
    }

    /// Returns true if `id` is `ancestor` or lies below it.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Absolute virtual path of `id`: `/` for the root, `/a/b` below it.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.get(current) {
                Some(node) if node.parent.is_some() => names.push(node.name.as_str()),
                _ => break,
            }
            cursor = self.parent(current);
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    fn display(&self, id: NodeId, name: &str) -> String {
        let base = self.path_of(id);
        if base.ends_with('/') {
            format!("{base}{name}")
        } else {
            format!("{base}/{name}")
        }
    }

    /// Pre-order listing of every directory below `id`, `id` included.
    pub fn walk(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.get(current) {
                order.push(current);
                // reversed so that children come out in name order
                stack.extend(node.dirs.values().rev().copied());
            }
        }
        order
    }
}

impl Default for DirTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::BackingStore;
    use tempdir::TempDir;

    fn setup_test_env() -> (TempDir, BackingStore) {
        let temp_dir = TempDir::new("tree_test").unwrap();
        let store = BackingStore::new(temp_dir.path()).unwrap();
        (temp_dir, store)
    }

    fn handle(store: &BackingStore, name: &str) -> FileHandle {
        store.touch(name).unwrap();
        FileHandle::open(store, name).unwrap()
    }

    mod structure {
        use super::*;

        #[test]
        fn test_new_tree_has_root_only() {
            let tree = DirTree::new();
            let root = tree.get(DirTree::ROOT).unwrap();
            assert_eq!(root.name(), "");
            assert_eq!(root.parent(), None);
            assert_eq!(root.dirs().count(), 0);
            assert_eq!(tree.path_of(DirTree::ROOT), "/");
        }

        #[test]
        fn test_insert_dir_and_paths() -> Result<()> {
            let mut tree = DirTree::new();
            let a = tree.insert_dir(DirTree::ROOT, "a")?;
            let b = tree.insert_dir(a, "b")?;

            assert_eq!(tree.child(DirTree::ROOT, "a"), Some(a));
            assert_eq!(tree.parent(b), Some(a));
            assert_eq!(tree.path_of(a), "/a");
            assert_eq!(tree.path_of(b), "/a/b");
            assert!(tree.is_within(b, DirTree::ROOT));
            assert!(tree.is_within(b, a));
            assert!(!tree.is_within(a, b));
            Ok(())
        }

        #[test]
        fn test_insert_dir_duplicate() -> Result<()> {
            let mut tree = DirTree::new();
            tree.insert_dir(DirTree::ROOT, "a")?;
            let result = tree.insert_dir(DirTree::ROOT, "a");
            assert!(matches!(result, Err(VfsError::AlreadyExists(p)) if p == "/a"));
            Ok(())
        }

        #[test]
        fn test_insert_dir_invalid_name() {
            let mut tree = DirTree::new();
            assert!(matches!(
                tree.insert_dir(DirTree::ROOT, ".."),
                Err(VfsError::InvalidPath(_))
            ));
        }

        #[test]
        fn test_dir_and_file_share_name() -> Result<()> {
            let (_tmp, store) = setup_test_env();
            let mut tree = DirTree::new();
            tree.insert_dir(DirTree::ROOT, "x")?;
            tree.insert_file(DirTree::ROOT, "x", handle(&store, "x"))?;
            assert!(tree.child(DirTree::ROOT, "x").is_some());
            assert!(tree.file(DirTree::ROOT, "x").is_some());
            Ok(())
        }

        #[test]
        fn test_walk_order() -> Result<()> {
            let mut tree = DirTree::new();
            let b = tree.insert_dir(DirTree::ROOT, "b")?;
            let a = tree.insert_dir(DirTree::ROOT, "a")?;
            let a1 = tree.insert_dir(a, "a1")?;
            assert_eq!(tree.walk(DirTree::ROOT), vec![DirTree::ROOT, a, a1, b]);
            Ok(())
        }
    }

    mod removal {
        use super::*;

        #[test]
        fn test_remove_missing_dir() {
            let mut tree = DirTree::new();
            let result = tree.remove_dir(DirTree::ROOT, "nope");
            assert!(matches!(result, Err(VfsError::NotFound(p)) if p == "/nope"));
        }

        #[test]
        fn test_remove_dir_releases_subtree_handles() -> Result<()> {
            let (_tmp, store) = setup_test_env();
            let mut tree = DirTree::new();
            let d = tree.insert_dir(DirTree::ROOT, "d")?;
            let e = tree.insert_dir(d, "e")?;
            tree.insert_file(d, "top.txt", handle(&store, "top.txt"))?;
            tree.insert_file(e, "deep.txt", handle(&store, "deep.txt"))?;

            let removed = tree.remove_dir(DirTree::ROOT, "d")?;

            assert_eq!(removed.len(), 2);
            assert!(removed.contains(&d) && removed.contains(&e));
            assert!(tree.get(d).is_none());
            assert!(tree.get(e).is_none());
            assert!(!store.exists("top.txt"));
            assert!(!store.exists("deep.txt"));
            Ok(())
        }

        #[test]
        fn test_remove_dir_keeps_aliased_content() -> Result<()> {
            let (_tmp, store) = setup_test_env();
            let mut tree = DirTree::new();
            let d = tree.insert_dir(DirTree::ROOT, "d")?;
            let shared = handle(&store, "shared.txt");
            tree.insert_file(DirTree::ROOT, "outside.txt", shared.clone())?;
            tree.insert_file(d, "inside.txt", shared)?;

            tree.remove_dir(DirTree::ROOT, "d")?;

            let outside = tree.file(DirTree::ROOT, "outside.txt").unwrap();
            assert_eq!(outside.reference_count(), 1);
            assert!(store.exists("shared.txt"));
            Ok(())
        }

        #[test]
        fn test_freed_slots_are_reused() -> Result<()> {
            let mut tree = DirTree::new();
            let old = tree.insert_dir(DirTree::ROOT, "old")?;
            tree.remove_dir(DirTree::ROOT, "old")?;
            let new = tree.insert_dir(DirTree::ROOT, "new")?;
            assert_eq!(old, new);
            assert_eq!(tree.path_of(new), "/new");
            Ok(())
        }

        #[test]
        fn test_remove_file() -> Result<()> {
            let (_tmp, store) = setup_test_env();
            let mut tree = DirTree::new();
            tree.insert_file(DirTree::ROOT, "f.txt", handle(&store, "f.txt"))?;

            let removed = tree.remove_file(DirTree::ROOT, "f.txt")?;
            assert_eq!(removed.reference_count(), 1);
            drop(removed);

            assert!(!store.exists("f.txt"));
            assert!(matches!(
                tree.remove_file(DirTree::ROOT, "f.txt"),
                Err(VfsError::NotFound(_))
            ));
            Ok(())
        }
    }
}
