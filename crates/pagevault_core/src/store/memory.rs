//! In-memory page store.

use crate::error::CoreResult;
use crate::store::{decode_log, PageStore, PageWrite, StoredPage};
use pagevault_storage::{InMemoryBackend, StorageBackend};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Page store keeping every log in an [`InMemoryBackend`].
///
/// Logs are encoded exactly as on disk, so everything the directory store
/// checks on load is checked here too.
#[derive(Default)]
pub struct MemoryStore {
    logs: Mutex<HashMap<String, InMemoryBackend>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw log bytes of `name`.
    #[must_use]
    pub fn raw_log(&self, name: &str) -> Option<Vec<u8>> {
        self.logs.lock().get(name).map(InMemoryBackend::data)
    }

    /// Replaces the raw log bytes of `name`.
    pub fn set_raw_log(&self, name: &str, data: Vec<u8>) {
        self.logs
            .lock()
            .insert(name.to_string(), InMemoryBackend::with_data(data));
    }

    /// Returns how many times the log of `name` was synced.
    #[must_use]
    pub fn sync_count(&self, name: &str) -> u64 {
        self.logs
            .lock()
            .get(name)
            .map_or(0, InMemoryBackend::sync_count)
    }
}

impl PageStore for MemoryStore {
    fn load(&self, name: &str) -> CoreResult<Option<StoredPage>> {
        let mut logs = self.logs.lock();
        let Some(backend) = logs.get_mut(name) else {
            return Ok(None);
        };

        let data = backend.read_all()?;
        let decoded = decode_log(name, &data)?;
        if decoded.valid_len < data.len() as u64 {
            backend.truncate(decoded.valid_len)?;
        }
        Ok(decoded.page)
    }

    fn save(&self, name: &str, write: &PageWrite<'_>) -> CoreResult<()> {
        if write.is_empty() {
            return Ok(());
        }
        let data = write.encode()?;

        let mut logs = self.logs.lock();
        let backend = logs.entry(name.to_string()).or_default();
        backend.append(&data)?;
        backend.flush()?;
        if write.sync {
            backend.sync()?;
        }
        Ok(())
    }

    fn delete(&self, name: &str) -> CoreResult<()> {
        self.logs.lock().remove(name);
        Ok(())
    }

    fn names(&self) -> CoreResult<Vec<String>> {
        let mut names: Vec<String> = self.logs.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("pages", &self.logs.lock().len())
            .finish()
    }
}
