//! Stateless primitives over the flat physical namespace.
//!
//! Every physical file lives directly under one host directory and is addressed by its leaf
//! name only. Two virtual paths ending in the same file name, in any virtual directories,
//! resolve to the same physical file here.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::core::{Result, VfsError, utils};

/// Host directory holding the physical files behind a virtual directory.
#[derive(Debug, Clone)]
pub struct BackingStore {
    root: PathBuf, // host-related absolute normalized path
}

impl BackingStore {
    /// Opens a store rooted at `root`, creating the directory and its parents if needed.
    /// Fails if `root` exists and is not a directory.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let shown = root.display().to_string();

        if root.as_os_str().is_empty() {
            return Err(VfsError::InvalidPath(shown));
        }
        if root.exists() && !root.is_dir() {
            return Err(VfsError::io(
                "open store",
                shown,
                std::io::Error::other("not a directory"),
            ));
        }
        std::fs::create_dir_all(root).map_err(|e| VfsError::io("create store", &shown, e))?;
        let root = root
            .canonicalize()
            .map_err(|e| VfsError::io("canonicalize", &shown, e))?;

        Ok(Self { root })
    }

    /// Returns root path related to the host file system.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Maps a physical name onto its host path.
    pub fn host_path(&self, name: &str) -> Result<PathBuf> {
        if !utils::is_valid_name(name) {
            return Err(VfsError::InvalidPath(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.host_path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Creates `name` if missing and sets its modification time to now.
    pub fn touch(&self, name: &str) -> Result<()> {
        let host = self.host_path(name)?;
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&host)
            .map_err(|e| VfsError::io("touch", name, e))?;
        file.set_modified(SystemTime::now())
            .map_err(|e| VfsError::io("touch", name, e))?;
        Ok(())
    }

    /// Replaces the content of `dst` with the content of `src`.
    /// `src` is touched first, so copying a name that was never written succeeds.
    pub fn copy(&self, src: &str, dst: &str) -> Result<()> {
        if src == dst {
            return Ok(());
        }
        self.touch(src)?;

        let mut input =
            File::open(self.host_path(src)?).map_err(|e| VfsError::io("open for read", src, e))?;
        let mut output = File::create(self.host_path(dst)?)
            .map_err(|e| VfsError::io("open for write", dst, e))?;
        std::io::copy(&mut input, &mut output).map_err(|e| VfsError::io("copy", src, e))?;

        log::debug!("copied physical file '{}' to '{}'", src, dst);
        Ok(())
    }

    /// Deletes the physical file. A missing file is an error.
    pub fn remove(&self, name: &str) -> Result<()> {
        let host = self.host_path(name)?;
        std::fs::remove_file(&host).map_err(|e| VfsError::io("remove", name, e))?;
        log::debug!("removed physical file '{}'", name);
        Ok(())
    }

    /// Copies `src` into `dst` and removes `src`.
    pub fn mv(&self, src: &str, dst: &str) -> Result<()> {
        if src == dst {
            return Ok(());
        }
        self.copy(src, dst)?;
        self.remove(src)
    }
}
