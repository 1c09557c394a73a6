//! Page store backed by a directory of log files.
//!
//! ```text
//! <root>/
//! ├─ LOCK                # Advisory lock for single-process access
//! ├─ 6e6f746573.log      # Log of page "notes"
//! └─ ...
//! ```
//!
//! File names are the hex encoding of the page name, so any name, including
//! ones with slashes or dots, maps to exactly one flat file.

use crate::error::{CoreError, CoreResult};
use crate::store::{decode_log, PageStore, PageWrite, StoredPage};
use fs2::FileExt;
use pagevault_storage::{FileBackend, StorageBackend};
use parking_lot::Mutex;
use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCK_FILE: &str = "LOCK";
const LOG_EXTENSION: &str = "log";

/// Page store keeping one log file per page under a root directory.
///
/// Holds an exclusive lock on the directory for its whole lifetime; a
/// second store on the same directory fails with
/// [`CoreError::DirectoryLocked`]. Within the process, log file I/O is
/// serialized so a load that cuts a torn tail never races an append.
#[derive(Debug)]
pub struct DirectoryStore {
    root: PathBuf,
    io: Mutex<()>,
    _lock_file: File,
}

impl DirectoryStore {
    /// Opens or creates a page directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another process holds the lock (returns `DirectoryLocked`)
    /// - I/O errors occur
    pub fn open(root: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !root.exists() {
            if create_if_missing {
                fs::create_dir_all(root)?;
            } else {
                return Err(CoreError::invalid_format(format!(
                    "page directory does not exist: {}",
                    root.display()
                )));
            }
        }

        if !root.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                root.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(root.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::DirectoryLocked);
        }

        debug!(root = %root.display(), "opened page directory");
        Ok(Self {
            root: root.to_path_buf(),
            io: Mutex::new(()),
            _lock_file: lock_file,
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the log file path of `name`.
    #[must_use]
    pub fn log_path(&self, name: &str) -> PathBuf {
        self.root
            .join(format!("{}.{LOG_EXTENSION}", encode_name(name)))
    }

    /// Syncs the directory so file creation and removal are durable.
    #[cfg(unix)]
    fn sync_directory(&self) -> CoreResult<()> {
        File::open(&self.root)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> CoreResult<()> {
        Ok(())
    }
}

impl PageStore for DirectoryStore {
    fn load(&self, name: &str) -> CoreResult<Option<StoredPage>> {
        let _io = self.io.lock();
        let Some(mut backend) = FileBackend::open_existing(&self.log_path(name))? else {
            return Ok(None);
        };

        let data = backend.read_all()?;
        let decoded = decode_log(name, &data)?;
        if decoded.valid_len < data.len() as u64 {
            backend.truncate(decoded.valid_len)?;
            backend.sync()?;
        }
        Ok(decoded.page)
    }

    fn save(&self, name: &str, write: &PageWrite<'_>) -> CoreResult<()> {
        if write.is_empty() {
            return Ok(());
        }
        let data = write.encode()?;

        let path = self.log_path(name);
        let _io = self.io.lock();
        let created = !path.exists();
        let mut backend = FileBackend::open(&path)?;
        backend.append(&data)?;
        backend.flush()?;
        if write.sync {
            backend.sync()?;
            if created {
                self.sync_directory()?;
            }
        }
        Ok(())
    }

    fn delete(&self, name: &str) -> CoreResult<()> {
        let _io = self.io.lock();
        if let Some(backend) = FileBackend::open_existing(&self.log_path(name))? {
            backend.remove()?;
            self.sync_directory()?;
        }
        Ok(())
    }

    fn names(&self) -> CoreResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(LOG_EXTENSION) {
                continue;
            }
            if let Some(name) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_name)
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

fn encode_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() * 2);
    for byte in name.as_bytes() {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn decode_name(stem: &str) -> Option<String> {
    if stem.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..stem.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(stem.get(i..i + 2)?, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}
