//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading or writing a page log stream.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of the stream.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current stream size.
        size: u64,
    },

    /// Attempted to grow the stream through `truncate`.
    #[error("cannot truncate to {requested} bytes, stream holds only {size}")]
    InvalidTruncate {
        /// The requested new size.
        requested: u64,
        /// The current stream size.
        size: u64,
    },
}
