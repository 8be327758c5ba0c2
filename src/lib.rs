//! A virtual directory tree layered over a flat collection of real files.
//!
//! ### Overview
//!
//! Every virtual file is a reference-counted handle to a physical file living directly under one
//! host directory. Several virtual names may alias the same handle record (`ln`), and the physical
//! file is deleted only when the last handle referencing it is released.
//!
//! **Key ideas**:
//! - **Flat physical namespace**: the physical file behind `/a/b/note.txt` is `note.txt`; the same
//!   leaf name in two virtual directories means the same physical file.
//! - **Aliasing without host links**: `ln` shares the in-memory record instead of creating a hard
//!   link on the host.
//! - **Cascading release**: `rmdir` releases every binding in the removed subtree.
//! - **Line shell**: [`Shell`] drives a [`VirtualDirectory`] one command per line.

mod core;
pub mod shell;
mod vfs;

pub use crate::core::{Result, VfsError, utils};
pub use shell::{Flow, Shell};
pub use vfs::{
    BackingStore, DirNode, DirTree, Entry, EntryType, FileHandle, NodeId, VirtualDirectory,
    WordCount,
};
