mod error;
pub mod utils;

pub use error::VfsError;

pub type Result<T> = std::result::Result<T, VfsError>;
