//! Append-only revision log of one page.

use crate::clock::Clock;
use crate::diff::Delta;
use crate::error::{CoreError, CoreResult};
use crate::log::index::RevisionIndex;
use crate::log::revision::{Payload, Revision};
use crate::types::{MajorSnapshots, RevisionMeta, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The edit history of one page.
///
/// Revisions are stored as snapshots or deltas. A snapshot is forced when
/// the log is empty, when `snapshot_interval` deltas have been written
/// since the last snapshot, or when a delta would be larger than half of
/// the text it produces. Reconstruction therefore never replays more than
/// `snapshot_interval` deltas.
///
/// The text of the newest revision is cached, so [`current`](Self::current)
/// is free.
///
/// # Invariants
///
/// - timestamps are strictly increasing
/// - the first revision is a snapshot
/// - entries are never reordered or removed, except by [`clear`](Self::clear)
pub struct RevisionLog {
    revisions: Vec<Revision>,
    index: RevisionIndex,
    current: Vec<u8>,
    snapshot_interval: usize,
    clock: Arc<dyn Clock>,
}

impl RevisionLog {
    /// Creates an empty log.
    pub fn new(snapshot_interval: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            revisions: Vec::new(),
            index: RevisionIndex::new(),
            current: Vec::new(),
            snapshot_interval: snapshot_interval.max(1),
            clock,
        }
    }

    /// Rebuilds a log from revisions read back from storage.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LogCorruption`] if the first revision is not a
    /// snapshot, if timestamps are not strictly increasing, or if a delta
    /// does not apply to the text before it.
    pub fn from_revisions(
        revisions: Vec<Revision>,
        snapshot_interval: usize,
        clock: Arc<dyn Clock>,
    ) -> CoreResult<Self> {
        if let Some(first) = revisions.first() {
            if !first.is_snapshot() {
                return Err(CoreError::log_corruption("first revision is not a snapshot"));
            }
        }
        for pair in revisions.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                warn!(
                    previous = %pair[0].timestamp,
                    next = %pair[1].timestamp,
                    "non-monotonic revision timestamps"
                );
                return Err(CoreError::log_corruption(format!(
                    "timestamp {} does not follow {}",
                    pair[1].timestamp, pair[0].timestamp
                )));
            }
        }

        let mut log = Self::new(snapshot_interval, clock);
        log.index = RevisionIndex::rebuild(&revisions);
        log.revisions = revisions;
        if let Some(last) = log.revisions.len().checked_sub(1) {
            log.current = log.reconstruct_position(last)?;
        }
        Ok(log)
    }

    /// Records `text` as the newest revision.
    ///
    /// Returns `Ok(None)` without touching the log or the clock when `text`
    /// equals the current text.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LogCorruption`] if no timestamp after the
    /// newest revision can be represented. The log is unchanged then.
    pub fn append(&mut self, text: &[u8]) -> CoreResult<Option<RevisionMeta>> {
        if text == self.current.as_slice() {
            return Ok(None);
        }

        let now = self.clock.now();
        let timestamp = match self.index.last_timestamp() {
            Some(last) if now <= last => last.next().ok_or_else(|| {
                CoreError::log_corruption(format!("no timestamp left after {last}"))
            })?,
            _ => now,
        };

        let delta = Delta::between(&self.current, text);
        let change_sum = delta.change_sum();
        let payload = if self.needs_snapshot(&delta, text) {
            Payload::Snapshot(text.to_vec())
        } else {
            Payload::Delta(delta)
        };

        let revision = Revision {
            timestamp,
            change_sum,
            payload,
        };
        let meta = revision.meta();
        self.index.push(&revision);
        self.revisions.push(revision);
        self.current = text.to_vec();

        debug!(
            %timestamp,
            change_sum,
            snapshot = meta.is_snapshot,
            revisions = self.revisions.len(),
            "appended revision"
        );
        Ok(Some(meta))
    }

    fn needs_snapshot(&self, delta: &Delta, text: &[u8]) -> bool {
        let Some(last_snapshot) = self.index.last_snapshot() else {
            return true;
        };
        let deltas_since = self.revisions.len() - last_snapshot - 1;
        deltas_since >= self.snapshot_interval || delta.encoded_len() * 2 > text.len()
    }

    /// Returns the text as it was at `timestamp`.
    ///
    /// Returns `Ok(None)` when the log is empty or `timestamp` precedes the
    /// first revision.
    pub fn reconstruct_at(&self, timestamp: Timestamp) -> CoreResult<Option<Vec<u8>>> {
        match self.index.position_at_or_before(timestamp) {
            Some(position) if position + 1 == self.revisions.len() => {
                Ok(Some(self.current.clone()))
            }
            Some(position) => self.reconstruct_position(position).map(Some),
            None => Ok(None),
        }
    }

    /// Replays the log from the nearest snapshot up to `position`.
    fn reconstruct_position(&self, position: usize) -> CoreResult<Vec<u8>> {
        let start = self.index.snapshot_at_or_before(position).ok_or_else(|| {
            CoreError::log_corruption(format!("no snapshot before revision {position}"))
        })?;

        let mut text = Vec::new();
        for revision in &self.revisions[start..=position] {
            text = match &revision.payload {
                Payload::Snapshot(bytes) => bytes.clone(),
                Payload::Delta(delta) => delta.apply(&text)?,
            };
        }
        Ok(text)
    }

    /// Returns the text of the newest revision, or an empty slice.
    #[must_use]
    pub fn current(&self) -> &[u8] {
        &self.current
    }

    /// Iterates revision metadata, oldest first.
    pub fn all(&self) -> impl ExactSizeIterator<Item = RevisionMeta> + '_ {
        self.revisions.iter().map(Revision::meta)
    }

    /// Returns the stored revisions, oldest first.
    #[must_use]
    pub fn revisions(&self) -> &[Revision] {
        &self.revisions
    }

    /// Returns the revision index.
    #[must_use]
    pub fn index(&self) -> &RevisionIndex {
        &self.index
    }

    /// Returns the history grouped into editing sessions, newest first.
    #[must_use]
    pub fn major_snapshots(&self, interval: Duration) -> MajorSnapshots {
        self.index.major_snapshots(interval)
    }

    /// Returns the number of revisions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    /// Returns true if the log holds no revisions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Drops every revision from position `len` on, restoring the text
    /// of the revision before them as current.
    pub(crate) fn truncate_to(&mut self, len: usize) -> CoreResult<()> {
        if len >= self.revisions.len() {
            return Ok(());
        }
        let current = match len.checked_sub(1) {
            Some(last) => self.reconstruct_position(last)?,
            None => Vec::new(),
        };
        self.revisions.truncate(len);
        self.index = RevisionIndex::rebuild(&self.revisions);
        self.current = current;
        Ok(())
    }

    /// Empties the log irreversibly.
    pub fn clear(&mut self) {
        self.revisions.clear();
        self.index.clear();
        self.current.clear();
    }
}

impl std::fmt::Debug for RevisionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionLog")
            .field("revisions", &self.revisions.len())
            .field("current_len", &self.current.len())
            .field("snapshot_interval", &self.snapshot_interval)
            .finish_non_exhaustive()
    }
}
