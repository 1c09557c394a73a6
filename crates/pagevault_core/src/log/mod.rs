//! Revision log and its timestamp index.
//!
//! Every page owns one [`RevisionLog`]: an append-only list of
//! [`Revision`]s, each holding either a full snapshot of the text or a
//! delta against the revision before it. The [`RevisionIndex`] sits next
//! to it and is rebuilt from the revisions whenever a page is loaded.
//!
//! ## Reconstruction
//!
//! ```text
//!  snapshot ── delta ── delta ── snapshot ── delta ── delta
//!                                    ▲                  ▲
//!                          nearest snapshot      requested revision
//! ```
//!
//! Reading the text at time T finds the latest revision at or before T,
//! walks back to the nearest snapshot and replays deltas forward.

mod index;
mod revision;
mod revision_log;

pub use index::RevisionIndex;
pub use revision::{Payload, Revision};
pub use revision_log::RevisionLog;
