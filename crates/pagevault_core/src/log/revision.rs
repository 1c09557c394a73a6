//! A single recorded edit.

use crate::diff::Delta;
use crate::types::{RevisionMeta, Timestamp};

/// How a revision's text is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// The complete text. Reconstruction starts here.
    Snapshot(Vec<u8>),
    /// An edit script against the previous revision's text.
    Delta(Delta),
}

/// One recorded edit of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// When the revision was written.
    pub timestamp: Timestamp,
    /// Inserted plus deleted bytes relative to the previous revision.
    pub change_sum: u64,
    /// Stored text or edit script.
    pub payload: Payload,
}

impl Revision {
    /// Returns true if the payload is a full snapshot.
    #[must_use]
    pub fn is_snapshot(&self) -> bool {
        matches!(self.payload, Payload::Snapshot(_))
    }

    /// Returns the revision's metadata.
    #[must_use]
    pub fn meta(&self) -> RevisionMeta {
        RevisionMeta {
            timestamp: self.timestamp,
            change_sum: self.change_sum,
            is_snapshot: self.is_snapshot(),
        }
    }
}
