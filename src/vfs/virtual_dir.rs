//! This module provides the virtual directory: a Unix-like namespace of directories and file
//! bindings layered over the flat physical namespace of a [`BackingStore`].
//!
//! ### Key Features:
//! - **Flat physical namespace**: a binding `/a/b/f.txt` is backed by the physical file `f.txt`.
//!   Bindings with the same leaf name in different directories share one physical file.
//! - **Aliasing**: `ln` binds a second name to the same record, with a shared reference count.
//! - **Cascading release**: removing a directory releases every binding below it, deleting
//!   physical files whose last reference goes away.
//! - **Two resolution modes**: the parent of a leaf (`mkdir`, `rmdir`, file operations) or the
//!   directory named by the whole path (`chdir`, `ls`).

use std::path::Path;

use crate::core::{Result, VfsError, utils};
use crate::vfs::{BackingStore, DirTree, Entry, FileHandle, NodeId, WordCount};

/// How the last segment of a path is treated by [`VirtualDirectory::resolve`].
#[derive(Debug, Copy, Clone, PartialEq)]
enum Resolve {
    /// The whole path must name an existing directory.
    Target,
    /// The prefix must name an existing directory; the leaf is returned as a pending name.
    Parent,
}

/// A virtual file hierarchy whose files are reference-counted handles to physical files.
///
/// ### Path syntax
///
/// Segments are separated by `/`. A path starting with `/` is resolved from the root, any
/// other path from the working directory. A trailing `/` is ignored. `.` stays in place and
/// `..` walks to the parent, clamped at the root. Every segment before the leaf must be an
/// existing directory.
///
/// ### Invariants
///
/// 1. The working directory is always a live node of the tree. Removing it or one of its
///    ancestors moves it back to the root.
/// 2. Every binding holds one live reference; the reported count of a binding is the number
///    of bindings (and outside handles) aliasing its record.
///
/// ### Example
///
/// ```no_run
/// use vfs_alias_kit::VirtualDirectory;
///
/// let mut vd = VirtualDirectory::new("/tmp/vd_store").unwrap();
/// vd.touch("a.txt").unwrap();
/// vd.ln("a.txt", "b.txt").unwrap();
/// vd.write("a.txt", 0, b'Z').unwrap();
/// assert_eq!(vd.read("b.txt", 0).unwrap(), b'Z');
/// assert_eq!(vd.reference_count("b.txt").unwrap(), 2);
/// ```
#[derive(Debug)]
pub struct VirtualDirectory {
    store: BackingStore,
    tree: DirTree,
    cwd: NodeId,
    bounds_check: bool,
}

impl VirtualDirectory {
    /// Creates an empty virtual directory whose physical files live in `root`.
    /// `root` is created if it does not exist.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        Ok(Self::with_store(BackingStore::new(root)?))
    }

    pub fn with_store(store: BackingStore) -> Self {
        Self {
            store,
            tree: DirTree::new(),
            cwd: DirTree::ROOT,
            bounds_check: false,
        }
    }

    /// Enables or disables bounds checking of `read`/`write` positions against the current
    /// content length. Disabled by default: writes past the end extend the file.
    pub fn set_bounds_check(&mut self, enabled: bool) {
        self.bounds_check = enabled;
    }

    pub fn store(&self) -> &BackingStore {
        &self.store
    }

    fn resolve<'p>(&self, path: &'p str, mode: Resolve) -> Result<(NodeId, Option<&'p str>)> {
        let segments = utils::split(path);
        let mut parts = segments.parts;

        let leaf = match mode {
            Resolve::Target => None,
            Resolve::Parent => {
                let leaf = parts
                    .pop()
                    .ok_or_else(|| VfsError::InvalidPath(path.to_string()))?;
                if !utils::is_valid_name(leaf) {
                    return Err(VfsError::InvalidPath(path.to_string()));
                }
                Some(leaf)
            }
        };

        let mut node = if segments.absolute {
            DirTree::ROOT
        } else {
            self.cwd
        };
        for part in parts {
            node = match part {
                utils::CURRENT => node,
                utils::PARENT => self.tree.parent(node).unwrap_or(node),
                name => self
                    .tree
                    .child(node, name)
                    .ok_or_else(|| VfsError::NotFound(path.to_string()))?,
            };
        }
        Ok((node, leaf))
    }

    /// Resolves `path` to the directory it names.
    fn resolve_target(&self, path: &str) -> Result<NodeId> {
        self.resolve(path, Resolve::Target).map(|(node, _)| node)
    }

    /// Resolves `path` to the directory holding its leaf, and the leaf itself.
    fn resolve_parent<'p>(&self, path: &'p str) -> Result<(NodeId, &'p str)> {
        match self.resolve(path, Resolve::Parent)? {
            (node, Some(leaf)) => Ok((node, leaf)),
            (_, None) => Err(VfsError::InvalidPath(path.to_string())),
        }
    }

    fn binding(&self, path: &str) -> Result<&FileHandle> {
        let (node, leaf) = self.resolve_parent(path)?;
        self.tree
            .file(node, leaf)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    fn leaf_of(path: &str) -> Result<&str> {
        utils::leaf(path).ok_or_else(|| VfsError::InvalidPath(path.to_string()))
    }

    /// Absolute path of the working directory.
    pub fn pwd(&self) -> String {
        self.tree.path_of(self.cwd)
    }

    /// Creates directory `path`. Its parent must exist.
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        let (parent, leaf) = self.resolve_parent(path)?;
        self.tree.insert_dir(parent, leaf)?;
        Ok(())
    }

    /// Changes the working directory. `path` must name an existing directory.
    pub fn chdir(&mut self, path: &str) -> Result<()> {
        self.cwd = self.resolve_target(path)?;
        Ok(())
    }

    /// Removes directory `path` with everything below it, releasing all of its bindings.
    /// If the working directory was inside the removed subtree it is reset to the root.
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        if utils::is_virtual_root(path) {
            return Err(VfsError::InvalidPath(path.to_string()));
        }
        let (parent, leaf) = self.resolve_parent(path)?;
        let cwd_inside = self
            .tree
            .child(parent, leaf)
            .is_some_and(|top| self.tree.is_within(self.cwd, top));
        self.tree.remove_dir(parent, leaf)?;
        if cwd_inside {
            log::warn!("working directory removed by rmdir {}, back to /", path);
            self.cwd = DirTree::ROOT;
        }
        Ok(())
    }

    /// Lists the immediate children of `path` (or of the working directory): directories
    /// first, then files with their reference counts, each group in name order.
    pub fn ls(&self, path: Option<&str>) -> Result<Vec<Entry>> {
        let id = match path {
            Some(path) => self.resolve_target(path)?,
            None => self.cwd,
        };
        let node = self
            .tree
            .get(id)
            .ok_or_else(|| VfsError::NotFound(self.tree.path_of(id)))?;

        let mut entries: Vec<Entry> = node.dirs().map(|(name, _)| Entry::dir(name)).collect();
        entries.extend(
            node.files()
                .map(|(name, handle)| Entry::file(name, handle.reference_count())),
        );
        Ok(entries)
    }

    /// Dumps the whole tree from the root: every directory and every binding as an absolute
    /// path, in pre-order.
    pub fn tree(&self) -> Vec<Entry> {
        let mut entries = Vec::new();
        for id in self.tree.walk(DirTree::ROOT) {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            let base = self.tree.path_of(id);
            entries.push(Entry::dir(base.clone()));
            let prefix = base.trim_end_matches('/');
            entries.extend(node.files().map(|(name, handle)| {
                Entry::file(format!("{prefix}/{name}"), handle.reference_count())
            }));
        }
        entries
    }

    /// Creates the physical file named by the leaf of `path` (or refreshes its modification
    /// time) and binds it at `path`.
    ///
    /// A binding already backed by the same physical name is kept as is. A binding backed by
    /// another physical name (an alias made by `ln`) is replaced and released.
    pub fn touch(&mut self, path: &str) -> Result<()> {
        let (node, leaf) = self.resolve_parent(path)?;
        self.store.touch(leaf)?;

        if let Some(existing) = self.tree.file(node, leaf) {
            if existing.physical_name() == Some(leaf) {
                return Ok(());
            }
        }
        let handle = FileHandle::open(&self.store, leaf)?;
        self.tree.insert_file(node, leaf, handle)?;
        Ok(())
    }

    /// Writes one byte at `pos` of the file bound at `path`.
    pub fn write(&mut self, path: &str, pos: u64, byte: u8) -> Result<()> {
        let handle = self.binding(path)?;
        if self.bounds_check {
            handle.check_bounds(pos)?;
        }
        handle.write_at(pos, byte)
    }

    /// Reads the byte at `pos` of the file bound at `path`.
    pub fn read(&self, path: &str, pos: u64) -> Result<u8> {
        let handle = self.binding(path)?;
        if self.bounds_check {
            handle.check_bounds(pos)?;
        }
        handle.read_at(pos)
    }

    pub fn cat(&self, path: &str) -> Result<Vec<String>> {
        self.binding(path)?.lines()
    }

    pub fn wc(&self, path: &str) -> Result<WordCount> {
        self.binding(path)?.wc()
    }

    /// Reference count of the record bound at `path`.
    pub fn reference_count(&self, path: &str) -> Result<usize> {
        Ok(self.binding(path)?.reference_count())
    }

    /// Physical file name backing the binding at `path`.
    pub fn physical_name(&self, path: &str) -> Result<String> {
        self.binding(path)?
            .physical_name()
            .map(str::to_string)
            .ok_or(VfsError::ReleasedHandle)
    }

    /// Copies the content behind `src` into a fresh binding at `dst`.
    /// Does nothing if both paths end in the same file name.
    /// A missing source binding is touched into existence first.
    pub fn copy(&mut self, src: &str, dst: &str) -> Result<()> {
        let dst_leaf = Self::leaf_of(dst)?;
        let (src_node, src_leaf) = self.resolve_parent(src)?;
        if src_leaf == dst_leaf {
            return Ok(());
        }

        self.touch(dst)?;
        if self.tree.file(src_node, src_leaf).is_none() {
            self.touch(src)?;
        }
        self.store.copy(src_leaf, dst_leaf)
    }

    /// Unbinds `path`, dropping one reference to its record.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        let (node, leaf) = self.resolve_parent(path)?;
        let handle = self.tree.remove_file(node, leaf)?;
        log::debug!(
            "remove {} ({} refs left)",
            path,
            handle.reference_count() - 1
        );
        Ok(())
    }

    /// Moves the physical file behind `src` to the leaf name of `dst`, binds `dst` and
    /// unbinds `src`. Does nothing if both paths end in the same file name.
    pub fn mv(&mut self, src: &str, dst: &str) -> Result<()> {
        let dst_leaf = Self::leaf_of(dst)?;
        let (src_node, src_leaf) = self.resolve_parent(src)?;
        if src_leaf == dst_leaf {
            // TODO: relocate through a temporary name once a same-name move across directories is needed
            return Ok(());
        }
        if self.tree.file(src_node, src_leaf).is_none() {
            return Err(VfsError::NotFound(src.to_string()));
        }
        // nothing may change before the destination is known to resolve
        self.resolve_parent(dst)?;

        self.store.mv(src_leaf, dst_leaf)?;
        self.touch(dst)?;
        self.tree.remove_file(src_node, src_leaf)?;
        Ok(())
    }

    /// Binds `dst` as an alias of the binding at `src`. Whatever was bound at `dst` is
    /// released first.
    pub fn ln(&mut self, src: &str, dst: &str) -> Result<()> {
        let alias = self.binding(src)?.clone();
        let (node, leaf) = self.resolve_parent(dst)?;
        if let Some(previous) = self.tree.insert_file(node, leaf, alias)? {
            log::debug!(
                "ln {} replaced a binding with {} refs",
                dst,
                previous.reference_count()
            );
        }
        Ok(())
    }
}
