//! # PageVault Core
//!
//! Revision store and page state machine for PageVault.
//!
//! This crate provides:
//! - Revision logs storing every edit as a snapshot or a byte delta
//! - Point-in-time reconstruction and session-grouped history
//! - Lock, encryption and self-destruct state per page
//! - A registry handing out one shared aggregate per page name
//! - Durable page stores with checksummed record framing
//!
//! ## Example
//!
//! ```rust
//! use pagevault_core::{AesGcmCrypto, Config, MemoryStore, PageRegistry, ReadMode};
//! use std::sync::Arc;
//!
//! let registry = PageRegistry::new(
//!     Config::default(),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(AesGcmCrypto),
//! );
//!
//! let page = registry.open("groceries")?;
//! page.write().update(b"- milk")?;
//! page.write().update(b"- milk\n- eggs")?;
//! page.write().save()?;
//!
//! let view = page.write().read(ReadMode::View)?;
//! assert_eq!(view.text, b"- milk\n- eggs");
//! assert_eq!(page.read().revisions().len(), 2);
//! # Ok::<(), pagevault_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod crypto;
pub mod diff;
mod error;
pub mod log;
mod page;
mod registry;
mod state;
pub mod store;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, SelfDestructTrigger, DEFAULT_DESTRUCT_NOTICE};
pub use crypto::{AesGcmCrypto, PassphraseCrypto, PassphraseDigest};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use log::{Payload, Revision, RevisionIndex, RevisionLog};
pub use page::{Page, PageView, ReadMode};
pub use registry::{PageHandle, PageRegistry};
pub use state::{Access, EncryptOutcome, LockOutcome, PageState};
pub use store::{DirectoryStore, MemoryStore, PageStore, PageWrite, StoredPage};
pub use types::{MajorSnapshots, RevisionMeta, Timestamp, NANOS_PER_SECOND};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
