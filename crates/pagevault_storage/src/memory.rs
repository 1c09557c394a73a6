//! In-memory storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// A page log stream held entirely in memory.
///
/// Used by the in-memory page store and throughout the test suites.
/// Nothing survives the process.
///
/// # Example
///
/// ```rust
/// use pagevault_storage::{InMemoryBackend, StorageBackend};
///
/// let mut backend = InMemoryBackend::new();
/// assert_eq!(backend.append(b"abc").unwrap(), 0);
/// assert_eq!(backend.append(b"def").unwrap(), 3);
/// assert_eq!(backend.size().unwrap(), 6);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Vec<u8>>,
    syncs: RwLock<u64>,
}

impl InMemoryBackend {
    /// Creates a new empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stream pre-filled with `data`.
    ///
    /// Handy for feeding hand-crafted or corrupted logs to the reader.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
            syncs: RwLock::new(0),
        }
    }

    /// Returns a copy of the stream contents.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Returns how many times [`StorageBackend::sync`] has been called.
    #[must_use]
    pub fn sync_count(&self) -> u64 {
        *self.syncs.read()
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let end = offset.saturating_add(len as u64);

        if end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[offset as usize..end as usize].to_vec())
    }

    fn append(&mut self, bytes: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(bytes);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        *self.syncs.write() += 1;
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;
        if new_size > size {
            return Err(StorageError::InvalidTruncate {
                requested: new_size,
                size,
            });
        }
        data.truncate(new_size as usize);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stream_is_empty() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.size().unwrap(), 0);
        assert!(backend.read_all().unwrap().is_empty());
    }

    #[test]
    fn appends_are_contiguous() {
        let mut backend = InMemoryBackend::new();
        assert_eq!(backend.append(b"rev-1;").unwrap(), 0);
        assert_eq!(backend.append(b"rev-2;").unwrap(), 6);
        assert_eq!(backend.read_at(6, 6).unwrap(), b"rev-2;");
        assert_eq!(backend.read_all().unwrap(), b"rev-1;rev-2;");
    }

    #[test]
    fn read_past_end_fails() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"short").unwrap();

        assert!(matches!(
            backend.read_at(3, 10),
            Err(StorageError::ReadPastEnd { size: 5, .. })
        ));
        assert!(matches!(
            backend.read_at(9, 1),
            Err(StorageError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn zero_length_read_at_end() {
        let backend = InMemoryBackend::with_data(b"abc".to_vec());
        assert!(backend.read_at(3, 0).unwrap().is_empty());
    }

    #[test]
    fn truncate_drops_torn_tail() {
        let mut backend = InMemoryBackend::with_data(b"whole|torn".to_vec());
        backend.truncate(5).unwrap();
        assert_eq!(backend.data(), b"whole");
    }

    #[test]
    fn truncate_cannot_grow() {
        let mut backend = InMemoryBackend::with_data(b"abc".to_vec());
        assert!(matches!(
            backend.truncate(10),
            Err(StorageError::InvalidTruncate {
                requested: 10,
                size: 3
            })
        ));
    }

    #[test]
    fn sync_is_counted() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"x").unwrap();
        backend.sync().unwrap();
        backend.sync().unwrap();
        assert_eq!(backend.sync_count(), 2);
    }
}
