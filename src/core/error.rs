use thiserror::Error;

/// Errors returned by the virtual directory and its file handles.
#[derive(Error, Debug)]
pub enum VfsError {
    /// A host filesystem call failed.
    #[error("{op} failed for '{name}': {source}")]
    Io {
        op: &'static str,
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Missing directory, missing file binding or missing path segment.
    #[error("{0}: no such file or directory")]
    NotFound(String),

    #[error("{0}: already exists")]
    AlreadyExists(String),

    /// The handle has dropped its reference to the shared record.
    #[error("file handle is released")]
    ReleasedHandle,

    #[error("index {pos} out of bounds for file of length {len}")]
    OutOfBounds { pos: u64, len: u64 },

    #[error("invalid path: '{0}'")]
    InvalidPath(String),
}

impl VfsError {
    pub(crate) fn io(op: &'static str, name: impl Into<String>, source: std::io::Error) -> Self {
        VfsError::Io {
            op,
            name: name.into(),
            source,
        }
    }
}
