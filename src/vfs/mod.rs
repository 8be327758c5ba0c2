mod entry;
mod handle;
mod store;
mod tree;
mod virtual_dir;

pub use entry::{Entry, EntryType};
pub use handle::{FileHandle, WordCount};
pub use store::BackingStore;
pub use tree::{DirNode, DirTree, NodeId};
pub use virtual_dir::VirtualDirectory;
