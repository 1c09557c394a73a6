//! Core type definitions for PageVault.

use std::fmt;

/// Nanoseconds in one second.
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Point in time at which a revision was written.
///
/// Nanoseconds since the Unix epoch. Within one page log timestamps are
/// strictly increasing and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a timestamp from raw nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Creates a timestamp from whole seconds.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(NANOS_PER_SECOND))
    }

    /// Returns the raw nanosecond value.
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Returns the whole seconds part.
    #[must_use]
    pub const fn as_secs(self) -> i64 {
        self.0.div_euclid(NANOS_PER_SECOND)
    }

    /// Returns the smallest timestamp strictly after this one, or `None`
    /// at the end of the representable range.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(nanos) => Some(Self(nanos)),
            None => None,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata of one revision, without its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionMeta {
    /// When the revision was written.
    pub timestamp: Timestamp,
    /// Inserted plus deleted bytes relative to the previous revision.
    pub change_sum: u64,
    /// Whether the revision is stored as a full snapshot.
    pub is_snapshot: bool,
}

/// History of a page collapsed into editing sessions.
///
/// Both vectors have the same length and are ordered newest first.
/// Entry `i` describes one bucket: `timestamps[i]` is the time of the last
/// edit in the bucket and `change_sums[i]` the total change inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MajorSnapshots {
    /// Timestamp of the most recent revision in each bucket.
    pub timestamps: Vec<Timestamp>,
    /// Summed change of each bucket.
    pub change_sums: Vec<u64>,
}

impl MajorSnapshots {
    /// Returns the number of buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns true if the page has no history.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Iterates `(timestamp, change_sum)` pairs, newest first.
    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, u64)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.change_sums.iter().copied())
    }
}
