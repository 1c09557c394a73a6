//! Timestamp index over a revision log.
//!
//! The index is never persisted: it is rebuilt whenever a log is loaded
//! and extended on every append. It answers three questions:
//!
//! - which revision was current at time T (binary search)
//! - where the nearest snapshot before a revision is
//! - how the history groups into editing sessions

use crate::log::revision::Revision;
use crate::types::{MajorSnapshots, Timestamp, NANOS_PER_SECOND};
use std::time::Duration;

/// In-memory index over the revisions of one page.
#[derive(Debug, Clone, Default)]
pub struct RevisionIndex {
    /// Timestamp of every revision, in log order.
    timestamps: Vec<Timestamp>,
    /// Change sum of every revision, in log order.
    change_sums: Vec<u64>,
    /// Positions of snapshot revisions, ascending.
    snapshots: Vec<usize>,
}

impl RevisionIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the index for an existing sequence of revisions.
    #[must_use]
    pub fn rebuild(revisions: &[Revision]) -> Self {
        let mut index = Self::new();
        for revision in revisions {
            index.push(revision);
        }
        index
    }

    /// Records a newly appended revision.
    pub fn push(&mut self, revision: &Revision) {
        if revision.is_snapshot() {
            self.snapshots.push(self.timestamps.len());
        }
        self.timestamps.push(revision.timestamp);
        self.change_sums.push(revision.change_sum);
    }

    /// Forgets every revision.
    pub fn clear(&mut self) {
        self.timestamps.clear();
        self.change_sums.clear();
        self.snapshots.clear();
    }

    /// Returns the number of indexed revisions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Returns the timestamp of the newest revision.
    #[must_use]
    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.timestamps.last().copied()
    }

    /// Returns the position of the newest snapshot.
    #[must_use]
    pub fn last_snapshot(&self) -> Option<usize> {
        self.snapshots.last().copied()
    }

    /// Returns the position of the latest revision written at or before
    /// `timestamp`.
    #[must_use]
    pub fn position_at_or_before(&self, timestamp: Timestamp) -> Option<usize> {
        self.timestamps
            .partition_point(|ts| *ts <= timestamp)
            .checked_sub(1)
    }

    /// Returns the position of the nearest snapshot at or before
    /// `position`.
    #[must_use]
    pub fn snapshot_at_or_before(&self, position: usize) -> Option<usize> {
        let after = self.snapshots.partition_point(|p| *p <= position);
        after.checked_sub(1).map(|i| self.snapshots[i])
    }

    /// Collapses the history into editing sessions.
    ///
    /// Consecutive revisions less than `interval` apart share a bucket.
    /// A bucket is reported at the timestamp of its last revision, so
    /// jumping to it shows the end state of that session. Buckets come
    /// back newest first.
    #[must_use]
    pub fn major_snapshots(&self, interval: Duration) -> MajorSnapshots {
        let interval = i64::try_from(interval.as_nanos()).unwrap_or(i64::MAX);
        let mut timestamps: Vec<Timestamp> = Vec::new();
        let mut change_sums: Vec<u64> = Vec::new();

        for (ts, change) in self.timestamps.iter().zip(&self.change_sums) {
            match (timestamps.last_mut(), change_sums.last_mut()) {
                (Some(last), Some(sum)) if ts.as_nanos().saturating_sub(last.as_nanos()) < interval => {
                    *last = *ts;
                    *sum += change;
                }
                _ => {
                    timestamps.push(*ts);
                    change_sums.push(*change);
                }
            }
        }

        timestamps.reverse();
        change_sums.reverse();
        MajorSnapshots {
            timestamps,
            change_sums,
        }
    }

    /// [`major_snapshots`](Self::major_snapshots) with the interval in
    /// whole seconds.
    #[must_use]
    pub fn major_snapshots_secs(&self, interval_secs: u64) -> MajorSnapshots {
        let nanos = interval_secs.saturating_mul(NANOS_PER_SECOND as u64);
        self.major_snapshots(Duration::from_nanos(nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Delta;
    use crate::log::revision::Payload;

    fn rev(secs: i64, change_sum: u64, snapshot: bool) -> Revision {
        Revision {
            timestamp: Timestamp::from_secs(secs),
            change_sum,
            payload: if snapshot {
                Payload::Snapshot(Vec::new())
            } else {
                Payload::Delta(Delta::default())
            },
        }
    }

    fn sample() -> RevisionIndex {
        RevisionIndex::rebuild(&[
            rev(0, 5, true),
            rev(10, 1, false),
            rev(20, 1, false),
            rev(200, 7, true),
            rev(230, 2, false),
            rev(1000, 3, false),
        ])
    }

    #[test]
    fn position_lookup() {
        let index = sample();
        assert_eq!(index.position_at_or_before(Timestamp::from_secs(-1)), None);
        assert_eq!(index.position_at_or_before(Timestamp::from_secs(0)), Some(0));
        assert_eq!(index.position_at_or_before(Timestamp::from_secs(15)), Some(1));
        assert_eq!(index.position_at_or_before(Timestamp::from_secs(200)), Some(3));
        assert_eq!(index.position_at_or_before(Timestamp::from_secs(9999)), Some(5));
    }

    #[test]
    fn snapshot_lookup() {
        let index = sample();
        assert_eq!(index.snapshot_at_or_before(2), Some(0));
        assert_eq!(index.snapshot_at_or_before(3), Some(3));
        assert_eq!(index.snapshot_at_or_before(5), Some(3));
        assert_eq!(index.last_snapshot(), Some(3));
    }

    #[test]
    fn buckets_newest_first() {
        let snaps = sample().major_snapshots_secs(60);
        assert_eq!(
            snaps.timestamps,
            vec![
                Timestamp::from_secs(1000),
                Timestamp::from_secs(230),
                Timestamp::from_secs(20)
            ]
        );
        assert_eq!(snaps.change_sums, vec![3, 9, 7]);
    }

    #[test]
    fn bucket_chain_follows_last_revision() {
        // Each gap is under the interval, so a long chain stays one bucket
        // even though its span is far wider than the interval.
        let revisions: Vec<_> = (0..10).map(|i| rev(i * 50, 1, i == 0)).collect();
        let snaps = RevisionIndex::rebuild(&revisions).major_snapshots_secs(60);
        assert_eq!(snaps.timestamps, vec![Timestamp::from_secs(450)]);
        assert_eq!(snaps.change_sums, vec![10]);
    }

    #[test]
    fn gap_equal_to_interval_splits() {
        let index = RevisionIndex::rebuild(&[rev(0, 1, true), rev(60, 1, false)]);
        assert_eq!(index.major_snapshots_secs(60).len(), 2);
    }

    #[test]
    fn empty_index_has_no_buckets() {
        let snaps = RevisionIndex::new().major_snapshots_secs(60);
        assert!(snaps.is_empty());
        assert!(snaps.change_sums.is_empty());
    }

    #[test]
    fn zero_interval_keeps_every_revision() {
        let snaps = sample().major_snapshots(Duration::ZERO);
        assert_eq!(snaps.len(), 6);
        assert_eq!(snaps.timestamps[0], Timestamp::from_secs(1000));
    }

    #[test]
    fn clear_resets() {
        let mut index = sample();
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.last_snapshot(), None);
        assert_eq!(index.last_timestamp(), None);
    }
}
