//! Durable storage of page logs.
//!
//! A [`PageStore`] keeps one append-only log of [records](record) per page
//! name. Saving appends the revisions written since the last save and,
//! when it changed, the page state. Loading replays the log:
//!
//! - revisions are collected in order
//! - the last state record wins
//! - a reset record drops every revision before it
//!
//! Two stores ship with the crate: [`DirectoryStore`] keeps one file per
//! page, [`MemoryStore`] keeps everything in memory for tests and
//! embedding.

mod directory;
mod memory;
pub mod record;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;

use crate::error::CoreResult;
use crate::log::Revision;
use crate::state::PageState;
use record::{PageRecord, RecordIter};
use tracing::warn;

/// Everything a store holds for one page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredPage {
    /// Revisions, oldest first.
    pub revisions: Vec<Revision>,
    /// Latest saved state.
    pub state: PageState,
}

/// One batch of changes appended to a page log.
#[derive(Debug, Clone, Copy)]
pub struct PageWrite<'a> {
    /// Drop every previously stored revision before appending.
    pub reset: bool,
    /// Revisions not yet stored, oldest first.
    pub revisions: &'a [Revision],
    /// New page state, if it changed.
    pub state: Option<&'a PageState>,
    /// Sync the log to durable storage before returning.
    pub sync: bool,
}

impl PageWrite<'_> {
    /// Returns true if the batch writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.reset && self.revisions.is_empty() && self.state.is_none()
    }

    /// Serializes the batch as consecutive records.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let mut data = Vec::new();
        if self.reset {
            data.extend(PageRecord::Reset.encode()?);
        }
        for revision in self.revisions {
            data.extend(PageRecord::Revision(revision.clone()).encode()?);
        }
        if let Some(state) = self.state {
            data.extend(PageRecord::State(state.clone()).encode()?);
        }
        Ok(data)
    }
}

/// Durable home of page logs.
///
/// Implementations are shared between threads. Callers never save or
/// delete the same page concurrently; the registry serializes them.
pub trait PageStore: Send + Sync {
    /// Reads the log of `name`, or `None` if nothing was ever saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or fails its checks.
    fn load(&self, name: &str) -> CoreResult<Option<StoredPage>>;

    /// Appends `write` to the log of `name`, creating it if needed.
    fn save(&self, name: &str, write: &PageWrite<'_>) -> CoreResult<()>;

    /// Removes the log of `name`. Removing a missing log succeeds.
    fn delete(&self, name: &str) -> CoreResult<()>;

    /// Lists the names of all stored pages, sorted.
    fn names(&self) -> CoreResult<Vec<String>>;
}

/// A page log decoded from raw bytes.
#[derive(Debug)]
pub(crate) struct DecodedLog {
    /// The page, or `None` if the log holds no complete record.
    pub page: Option<StoredPage>,
    /// Length of the intact prefix. Bytes past it are a torn append.
    pub valid_len: u64,
}

/// Replays a raw page log.
pub(crate) fn decode_log(name: &str, data: &[u8]) -> CoreResult<DecodedLog> {
    let mut iter = RecordIter::new(data);
    let mut page: Option<StoredPage> = None;

    for item in iter.by_ref() {
        let (_, record) = item?;
        let page = page.get_or_insert_with(StoredPage::default);
        match record {
            PageRecord::Revision(revision) => page.revisions.push(revision),
            PageRecord::State(state) => page.state = state,
            PageRecord::Reset => page.revisions.clear(),
        }
    }

    let valid_len = iter.offset();
    if valid_len < data.len() {
        warn!(
            page = %name,
            valid_len,
            discarded = data.len() - valid_len,
            "discarding truncated record at end of page log"
        );
    }
    Ok(DecodedLog {
        page,
        valid_len: valid_len as u64,
    })
}
