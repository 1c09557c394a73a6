//! Storage backend trait definition.

use crate::error::StorageResult;

/// An append-only byte stream holding one page log.
///
/// Backends are **opaque**: they never look inside the bytes they hold.
/// The page log writer in `pagevault_core` frames revisions and state
/// records on top of this trait.
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_at` returns exactly the bytes previously written at that offset
/// - after `sync` returns, every appended byte survives process termination
/// - `truncate` only ever shrinks the stream
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadPastEnd`](crate::StorageError::ReadPastEnd)
    /// if the range extends beyond the current size, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the stream and returns its offset.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the operating system.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size of the stream in bytes.
    fn size(&self) -> StorageResult<u64>;

    /// Makes all appended data and the stream length durable.
    fn sync(&mut self) -> StorageResult<()>;

    /// Shrinks the stream to `new_size` bytes.
    ///
    /// Used to drop a torn record left at the tail by an interrupted save.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidTruncate`](crate::StorageError::InvalidTruncate)
    /// if `new_size` is larger than the current size.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Reads the whole stream.
    ///
    /// Page logs are replayed in full on open, so this is the common read.
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        let len = usize::try_from(size).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::OutOfMemory,
                format!("page log of {size} bytes does not fit in memory"),
            )
        })?;
        self.read_at(0, len)
    }
}
