//! # PageVault Storage
//!
//! Byte-level storage backends that hold PageVault page logs.
//!
//! Every page's revision history is persisted as one append-only byte
//! stream. This crate provides that stream and nothing else: backends do
//! not know about revisions, deltas or page state. Record framing and
//! interpretation live in `pagevault_core`.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For tests and ephemeral registries
//! - [`FileBackend`] - One file per page log, using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use pagevault_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.append(b"first revision").unwrap();
//! assert_eq!(backend.read_all().unwrap(), b"first revision");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
