//! Error types for PageVault core.

use crate::types::Timestamp;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Coarse error classes that callers such as an HTTP layer branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No revision at or before a requested time, or no such page.
    NotFound,
    /// Unlock or decrypt attempted with the wrong passphrase.
    WrongPassphrase,
    /// The page state does not allow the operation.
    Forbidden,
    /// Durable storage could not be read or written, or is corrupt.
    StorageFailure,
    /// The submitted text exceeds the configured ceiling.
    PayloadTooLarge,
}

/// Errors that can occur in PageVault core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] pagevault_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No revision exists at or before the requested timestamp.
    #[error("no revision of page {page:?} at or before {timestamp}")]
    RevisionNotFound {
        /// The page that was searched.
        page: String,
        /// The requested timestamp.
        timestamp: Timestamp,
    },

    /// The page has no stored history.
    #[error("page not found: {name:?}")]
    PageNotFound {
        /// Name of the page.
        name: String,
    },

    /// Passphrase did not match the stored digest or ciphertext.
    #[error("wrong passphrase for page {page:?}")]
    WrongPassphrase {
        /// The page the passphrase was tried on.
        page: String,
    },

    /// Operation not permitted in the page's current state.
    #[error("forbidden on page {page:?}: {reason}")]
    Forbidden {
        /// The page the operation targeted.
        page: String,
        /// Which state blocked the operation.
        reason: &'static str,
    },

    /// Update text exceeds the configured ceiling.
    #[error("text of {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge {
        /// Size of the submitted text.
        size: usize,
        /// Configured ceiling.
        limit: usize,
    },

    /// A page log violates its structural invariants.
    #[error("page log corruption: {message}")]
    LogCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch detected in a stored record.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Expected checksum.
        expected: u32,
        /// Actual checksum.
        actual: u32,
    },

    /// Invalid on-disk format or version.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// The page directory is held by another process.
    #[error("page directory locked: another process has exclusive access")]
    DirectoryLocked,

    /// Encryption or key derivation failed.
    #[error("encryption failed: {message}")]
    EncryptionFailed {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Maps the error onto the coarse taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RevisionNotFound { .. } | Self::PageNotFound { .. } => ErrorKind::NotFound,
            Self::WrongPassphrase { .. } => ErrorKind::WrongPassphrase,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::Storage(_)
            | Self::Io(_)
            | Self::LogCorruption { .. }
            | Self::ChecksumMismatch { .. }
            | Self::InvalidFormat { .. }
            | Self::DirectoryLocked
            | Self::EncryptionFailed { .. } => ErrorKind::StorageFailure,
        }
    }

    /// Creates a revision not found error.
    pub fn revision_not_found(page: impl Into<String>, timestamp: Timestamp) -> Self {
        Self::RevisionNotFound {
            page: page.into(),
            timestamp,
        }
    }

    /// Creates a page not found error.
    pub fn page_not_found(name: impl Into<String>) -> Self {
        Self::PageNotFound { name: name.into() }
    }

    /// Creates a wrong passphrase error.
    pub fn wrong_passphrase(page: impl Into<String>) -> Self {
        Self::WrongPassphrase { page: page.into() }
    }

    /// Creates a forbidden transition error.
    pub fn forbidden(page: impl Into<String>, reason: &'static str) -> Self {
        Self::Forbidden {
            page: page.into(),
            reason,
        }
    }

    /// Creates a log corruption error.
    pub fn log_corruption(message: impl Into<String>) -> Self {
        Self::LogCorruption {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an encryption failed error.
    pub fn encryption_failed(message: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            CoreError::revision_not_found("a", Timestamp::from_secs(1)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(CoreError::page_not_found("a").kind(), ErrorKind::NotFound);
        assert_eq!(CoreError::wrong_passphrase("a").kind(), ErrorKind::WrongPassphrase);
        assert_eq!(CoreError::forbidden("a", "locked").kind(), ErrorKind::Forbidden);
        assert_eq!(
            CoreError::PayloadTooLarge { size: 2, limit: 1 }.kind(),
            ErrorKind::PayloadTooLarge
        );
        assert_eq!(
            CoreError::log_corruption("timestamps out of order").kind(),
            ErrorKind::StorageFailure
        );
    }

    #[test]
    fn messages_name_the_page() {
        let err = CoreError::forbidden("notes", "page is encrypted");
        assert_eq!(err.to_string(), "forbidden on page \"notes\": page is encrypted");
    }
}
