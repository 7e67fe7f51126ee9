//! Error types for core value construction.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while constructing core value types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The path is empty or consists only of separators.
    #[error("Invalid virtual path: {0:?}")]
    InvalidPath(String),

    /// Virtual paths are ASCII-only keys.
    #[error("Virtual path contains non-ASCII characters: {0:?}")]
    NonAsciiPath(String),

    /// The normalized path exceeds [`MAX_PATH_LENGTH`](crate::MAX_PATH_LENGTH).
    #[error("Virtual path is {len} bytes long, maximum is {max}")]
    PathTooLong { len: usize, max: usize },
}
