//! Process-wide registry of open pages.
//!
//! The registry is the only global state. It maps each page name to one
//! shared [`Page`] behind a [`RwLock`], so every caller that opens a name
//! works on the same aggregate:
//!
//! - mutations take the page's write lock and are serialized per page
//! - reads of the current text share the read lock
//! - the map lock covers lookup and insert only, never page I/O
//!
//! Entries are never removed. Erasing a page resets it in place, which
//! lets two threads that raced to load the same name converge on
//! whichever entry was inserted first.

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::crypto::PassphraseCrypto;
use crate::error::{CoreError, CoreResult};
use crate::page::Page;
use crate::store::PageStore;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Shared handle to one open page.
#[derive(Clone)]
pub struct PageHandle {
    page: Arc<RwLock<Page>>,
}

impl PageHandle {
    /// Locks the page for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Locks the page for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    /// Returns true if both handles refer to the same page.
    #[must_use]
    pub fn same_page(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.page, &other.page)
    }
}

impl std::fmt::Debug for PageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageHandle")
            .field("name", &self.page.read().name())
            .finish()
    }
}

/// Map from page name to the page it names.
pub struct PageRegistry {
    pages: Mutex<HashMap<String, Arc<RwLock<Page>>>>,
    store: Arc<dyn PageStore>,
    crypto: Arc<dyn PassphraseCrypto>,
    config: Arc<Config>,
    clock: Arc<dyn Clock>,
}

impl PageRegistry {
    /// Creates a registry stamping revisions with the system clock.
    pub fn new(
        config: Config,
        store: Arc<dyn PageStore>,
        crypto: Arc<dyn PassphraseCrypto>,
    ) -> Self {
        Self::with_clock(config, store, crypto, Arc::new(SystemClock))
    }

    /// Creates a registry with an explicit clock.
    pub fn with_clock(
        config: Config,
        store: Arc<dyn PageStore>,
        crypto: Arc<dyn PassphraseCrypto>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            store,
            crypto,
            config: Arc::new(config),
            clock,
        }
    }

    /// Returns the handle of `name`, loading the page on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the page has to be loaded and its stored log
    /// is unreadable or corrupt. Nothing is cached in that case.
    pub fn open(&self, name: &str) -> CoreResult<PageHandle> {
        if let Some(page) = self.pages.lock().get(name) {
            return Ok(PageHandle { page: page.clone() });
        }

        let loaded = Page::load(
            name,
            self.store.clone(),
            self.crypto.clone(),
            self.config.clone(),
            self.clock.clone(),
        )?;

        let page = self
            .pages
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(page = %name, "registered page");
                Arc::new(RwLock::new(loaded))
            })
            .clone();
        Ok(PageHandle { page })
    }

    /// Returns the handle of `name` only if the page is already open or
    /// has something stored.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PageNotFound`] for a name that was never saved,
    /// or a storage error if its log is unreadable.
    pub fn open_existing(&self, name: &str) -> CoreResult<PageHandle> {
        if let Some(page) = self.pages.lock().get(name) {
            return Ok(PageHandle { page: page.clone() });
        }
        if self.store.load(name)?.is_none() {
            return Err(CoreError::page_not_found(name));
        }
        self.open(name)
    }

    /// Runs `f` under the read lock of `name`.
    pub fn with_page<R>(&self, name: &str, f: impl FnOnce(&Page) -> CoreResult<R>) -> CoreResult<R> {
        let handle = self.open(name)?;
        let page = handle.read();
        f(&page)
    }

    /// Runs `f` under the write lock of `name`.
    pub fn with_page_mut<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Page) -> CoreResult<R>,
    ) -> CoreResult<R> {
        let handle = self.open(name)?;
        let mut page = handle.write();
        f(&mut page)
    }

    /// Saves every open page with unsaved changes.
    ///
    /// Stops at the first failure.
    pub fn save_all(&self) -> CoreResult<()> {
        let pages: Vec<_> = self.pages.lock().values().cloned().collect();
        for page in pages {
            let mut page = page.write();
            if page.is_dirty() {
                page.save()?;
            }
        }
        Ok(())
    }

    /// Returns the number of pages held in memory.
    #[must_use]
    pub fn open_pages(&self) -> usize {
        self.pages.lock().len()
    }

    /// Returns the shared configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn PageStore> {
        &self.store
    }
}

impl std::fmt::Debug for PageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRegistry")
            .field("open_pages", &self.open_pages())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
