//! The page aggregate.
//!
//! A [`Page`] binds one revision log and one [`PageState`] to a name and
//! enforces the state machine around every operation on them.
//!
//! Mutations are applied in memory and reach the store on
//! [`save`](Page::save), with two exceptions that touch the store
//! immediately: [`erase`](Page::erase) and the self-destruct sequence run
//! by [`read`](Page::read).
//!
//! # Example
//!
//! ```rust
//! use pagevault_core::{AesGcmCrypto, Config, MemoryStore, Page, ReadMode, SystemClock};
//! use std::sync::Arc;
//!
//! let mut page = Page::load(
//!     "notes",
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(AesGcmCrypto),
//!     Arc::new(Config::default()),
//!     Arc::new(SystemClock),
//! )?;
//! page.update(b"# Notes")?;
//! page.save()?;
//! assert_eq!(page.read(ReadMode::View)?.text, b"# Notes");
//! # Ok::<(), pagevault_core::CoreError>(())
//! ```

use crate::clock::Clock;
use crate::config::{Config, SelfDestructTrigger};
use crate::crypto::PassphraseCrypto;
use crate::error::{CoreError, CoreResult};
use crate::log::RevisionLog;
use crate::state::{EncryptOutcome, LockOutcome, PageState};
use crate::store::{PageStore, PageWrite};
use crate::types::{MajorSnapshots, RevisionMeta, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How a caller intends to use the text it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Loading the text into an editor.
    Edit,
    /// Rendering the text for display.
    View,
    /// Fetching the stored bytes verbatim.
    Raw,
    /// Browsing past revisions.
    History,
}

impl ReadMode {
    /// Returns true if locked or encrypted pages refuse this read.
    #[must_use]
    pub const fn is_gated(self) -> bool {
        matches!(self, Self::Edit | Self::View)
    }
}

/// The result of a [`Page::read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    /// The text that was read.
    pub text: Vec<u8>,
    /// True if this read destroyed the page. `text` is then the final
    /// revision, notice included, and the page is now empty.
    pub self_destructed: bool,
}

/// A named document with its full edit history and flags.
pub struct Page {
    name: String,
    log: RevisionLog,
    state: PageState,
    store: Arc<dyn PageStore>,
    crypto: Arc<dyn PassphraseCrypto>,
    config: Arc<Config>,
    /// Number of leading revisions already in the store.
    persisted: usize,
    state_dirty: bool,
    /// History was scrubbed since the last save.
    reset_pending: bool,
}

impl Page {
    /// Loads `name` from `store`, or creates an empty page if nothing is
    /// stored under that name. An empty page touches the store only once
    /// something is saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored log cannot be read or is corrupt.
    pub fn load(
        name: &str,
        store: Arc<dyn PageStore>,
        crypto: Arc<dyn PassphraseCrypto>,
        config: Arc<Config>,
        clock: Arc<dyn Clock>,
    ) -> CoreResult<Self> {
        let (log, state) = match store.load(name)? {
            Some(stored) => {
                let log =
                    RevisionLog::from_revisions(stored.revisions, config.snapshot_interval, clock)
                        .map_err(|e| {
                            warn!(page = %name, error = %e, "page log failed to load");
                            e
                        })?;
                (log, stored.state)
            }
            None => (
                RevisionLog::new(config.snapshot_interval, clock),
                PageState::new(),
            ),
        };

        info!(
            page = %name,
            revisions = log.len(),
            locked = state.is_locked(),
            encrypted = state.is_encrypted(),
            primed = state.is_primed(),
            "loaded page"
        );
        Ok(Self {
            name: name.to_string(),
            persisted: log.len(),
            log,
            state,
            store,
            crypto,
            config,
            state_dirty: false,
            reset_pending: false,
        })
    }

    /// Returns the page name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the authorization state.
    #[must_use]
    pub fn state(&self) -> &PageState {
        &self.state
    }

    /// Returns the revision log.
    #[must_use]
    pub fn log(&self) -> &RevisionLog {
        &self.log
    }

    /// Returns true if the page has never been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.is_empty() && self.state.is_default()
    }

    /// Returns true if there are changes not yet saved.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.reset_pending || self.state_dirty || self.persisted < self.log.len()
    }

    /// Records `text` as the newest revision.
    ///
    /// Returns `None` if `text` equals the current text. Not gated by the
    /// page state; see [`update_gated`](Self::update_gated).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PayloadTooLarge`] if `text` exceeds the
    /// configured ceiling, or [`CoreError::LogCorruption`] if the log has
    /// no timestamp left to give it.
    pub fn update(&mut self, text: &[u8]) -> CoreResult<Option<RevisionMeta>> {
        if let Some(limit) = self.config.max_text_size {
            if text.len() > limit {
                return Err(CoreError::PayloadTooLarge {
                    size: text.len(),
                    limit,
                });
            }
        }
        self.log.append(text)
    }

    /// [`update`](Self::update), refused while locked or encrypted.
    pub fn update_gated(&mut self, text: &[u8]) -> CoreResult<Option<RevisionMeta>> {
        self.state.check_open(&self.name)?;
        self.update(text)
    }

    /// Returns the newest text, ungated and without side effects.
    #[must_use]
    pub fn current(&self) -> &[u8] {
        self.log.current()
    }

    /// Returns the text as it was at `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RevisionNotFound`] if no revision was written
    /// at or before `timestamp`.
    pub fn previous_by_timestamp(&self, timestamp: Timestamp) -> CoreResult<Vec<u8>> {
        self.log
            .reconstruct_at(timestamp)?
            .ok_or_else(|| CoreError::revision_not_found(&self.name, timestamp))
    }

    /// Groups the history into editing sessions separated by gaps of at
    /// least `interval_secs` seconds, newest first.
    #[must_use]
    pub fn major_snapshots_and_change_sums(&self, interval_secs: u64) -> MajorSnapshots {
        self.log.index().major_snapshots_secs(interval_secs)
    }

    /// Groups the history using the configured history interval.
    #[must_use]
    pub fn history(&self) -> MajorSnapshots {
        self.log.major_snapshots(self.config.history_interval)
    }

    /// Groups the history with an arbitrary bucket width.
    #[must_use]
    pub fn history_with(&self, interval: Duration) -> MajorSnapshots {
        self.log.major_snapshots(interval)
    }

    /// Iterates revision metadata, oldest first.
    pub fn revisions(&self) -> impl ExactSizeIterator<Item = RevisionMeta> + '_ {
        self.log.all()
    }

    /// Reads the current text.
    ///
    /// [`ReadMode::Edit`] and [`ReadMode::View`] are refused while the page
    /// is locked or encrypted. If the page is primed and the read
    /// qualifies under the configured [`SelfDestructTrigger`], the page is
    /// destroyed before this returns: one last revision carrying the
    /// destruct notice is saved and synced, then the page is erased.
    ///
    /// If the final revision cannot be saved, the page is left as it was
    /// and stays primed. If it is saved but the store refuses to delete
    /// the log, the page is emptied and an empty history is saved over it
    /// instead.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Forbidden`] for a gated read of a locked or encrypted page
    /// - storage errors from the self-destruct sequence
    pub fn read(&mut self, mode: ReadMode) -> CoreResult<PageView> {
        if mode.is_gated() {
            self.state.check_open(&self.name)?;
        }

        let qualifies = match self.config.self_destruct_trigger {
            SelfDestructTrigger::GatedReads => mode.is_gated(),
            SelfDestructTrigger::AllReads => true,
        };
        if qualifies && self.state.should_self_destruct() {
            return self.self_destruct();
        }

        Ok(PageView {
            text: self.log.current().to_vec(),
            self_destructed: false,
        })
    }

    fn self_destruct(&mut self) -> CoreResult<PageView> {
        let mut text = self.config.destruct_notice.as_bytes().to_vec();
        text.extend_from_slice(self.log.current());

        let len = self.log.len();
        self.log.append(&text)?;
        if let Err(e) = self.save_with(true) {
            self.log.truncate_to(len)?;
            warn!(page = %self.name, error = %e, "self-destruct aborted, final revision not saved");
            return Err(e);
        }

        if let Err(e) = self.store.delete(&self.name) {
            // The final revision is durable and its log survived. An empty
            // history on top of it keeps the page from destructing twice.
            warn!(page = %self.name, error = %e, "self-destruct could not delete page log");
            self.clear();
            self.reset_pending = true;
            self.state_dirty = true;
            self.save_with(true)?;
        } else {
            self.clear();
        }

        info!(page = %self.name, "page self-destructed");
        Ok(PageView {
            text,
            self_destructed: true,
        })
    }

    /// Locks an open page under `passphrase`, or unlocks a locked one.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Forbidden`] if the page is encrypted
    /// - [`CoreError::WrongPassphrase`] if unlocking with the wrong passphrase
    ///
    /// The page is unchanged on error.
    pub fn toggle_lock(&mut self, passphrase: &str) -> CoreResult<LockOutcome> {
        let (next, outcome) = self
            .state
            .toggled_lock(&self.name, passphrase, self.crypto.as_ref())?;
        self.state = next;
        self.state_dirty = true;

        info!(page = %self.name, ?outcome, "lock toggled");
        Ok(outcome)
    }

    /// Encrypts the current text under `passphrase`, or decrypts it.
    ///
    /// The transformed text is appended as a new revision. With
    /// `scrub_history_on_encrypt` set, earlier revisions are dropped first.
    /// The primed flag is kept.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Forbidden`] if the page is locked
    /// - [`CoreError::WrongPassphrase`] if decryption fails
    ///
    /// The page is unchanged on error.
    pub fn toggle_encrypt(&mut self, passphrase: &str) -> CoreResult<EncryptOutcome> {
        let (next, outcome) = self.state.toggled_encryption(&self.name)?;
        let text = match outcome {
            EncryptOutcome::Encrypted => self.crypto.encrypt(self.log.current(), passphrase)?,
            EncryptOutcome::Decrypted => self
                .crypto
                .decrypt(self.log.current(), passphrase)
                .map_err(|_| CoreError::wrong_passphrase(&self.name))?,
        };

        if self.config.scrub_history_on_encrypt {
            self.log.clear();
            self.persisted = 0;
            self.reset_pending = true;
        }
        self.log.append(&text)?;
        self.state = next;
        self.state_dirty = true;

        info!(
            page = %self.name,
            ?outcome,
            scrubbed = self.config.scrub_history_on_encrypt,
            "encryption toggled"
        );
        Ok(outcome)
    }

    /// Primes the page to self-destruct on its next qualifying read.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Forbidden`] if the page is locked or encrypted.
    pub fn prime(&mut self) -> CoreResult<()> {
        self.state = self.state.primed(&self.name)?;
        self.state_dirty = true;
        info!(page = %self.name, "page primed for self-destruct");
        Ok(())
    }

    /// Writes unsaved revisions and state to the store.
    ///
    /// Does nothing when there is nothing to write. Syncs when the
    /// configuration asks for it.
    pub fn save(&mut self) -> CoreResult<()> {
        self.save_with(self.config.sync_on_save)
    }

    fn save_with(&mut self, sync: bool) -> CoreResult<()> {
        let write = PageWrite {
            reset: self.reset_pending,
            revisions: &self.log.revisions()[self.persisted..],
            state: self.state_dirty.then_some(&self.state),
            sync,
        };
        if write.is_empty() {
            return Ok(());
        }

        self.store.save(&self.name, &write)?;
        debug!(
            page = %self.name,
            revisions = write.revisions.len(),
            state = write.state.is_some(),
            reset = write.reset,
            sync,
            "saved page"
        );
        self.persisted = self.log.len();
        self.state_dirty = false;
        self.reset_pending = false;
        Ok(())
    }

    /// Deletes the page from the store and resets it to an empty page.
    ///
    /// If the store refuses, the page is left untouched.
    pub fn erase(&mut self) -> CoreResult<()> {
        self.store.delete(&self.name)?;
        self.clear();
        info!(page = %self.name, "page erased");
        Ok(())
    }

    fn clear(&mut self) {
        self.log.clear();
        self.state = PageState::new();
        self.persisted = 0;
        self.state_dirty = false;
        self.reset_pending = false;
    }

    /// [`erase`](Self::erase), refused while locked or encrypted.
    pub fn erase_gated(&mut self) -> CoreResult<()> {
        self.state.check_open(&self.name)?;
        self.erase()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("name", &self.name)
            .field("log", &self.log)
            .field("state", &self.state)
            .field("persisted", &self.persisted)
            .field("state_dirty", &self.state_dirty)
            .finish_non_exhaustive()
    }
}
