//! CLI command implementations.

pub mod encrypt;
pub mod erase;
pub mod history;
pub mod list;
pub mod lock;
pub mod prime;
pub mod show;
pub mod update;
pub mod verify;

use pagevault_core::{AesGcmCrypto, Config, DirectoryStore, PageRegistry};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Opens the store at `path` behind a registry.
///
/// Only `update` may create a missing store; every other command expects
/// one to exist already.
pub(crate) fn open_registry(
    path: &Path,
    create_if_missing: bool,
) -> Result<PageRegistry, Box<dyn std::error::Error>> {
    let store = DirectoryStore::open(path, create_if_missing)?;
    debug!(path = %path.display(), "opened page store");
    Ok(PageRegistry::new(
        Config::default(),
        Arc::new(store),
        Arc::new(AesGcmCrypto),
    ))
}

/// Page text for display. Invalid UTF-8 (ciphertext) is replaced.
pub(crate) fn display_text(text: &[u8]) -> String {
    String::from_utf8_lossy(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn commands_share_one_store() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("pages");

        assert!(show::run(&root, "todo", "view", None, "text").is_err());
        update::run(&root, "todo", Some("- water plants".into()), None).unwrap();
        update::run(&root, "todo", Some("- water plants\n- post".into()), None).unwrap();
        assert!(show::run(&root, "never-saved", "view", None, "text").is_err());
        assert!(prime::run(&root, "never-saved").is_err());
        history::run(&root, "todo", Some(1), true, "json").unwrap();

        lock::run(&root, "todo", "pw").unwrap();
        assert!(show::run(&root, "todo", "view", None, "text").is_err());
        assert!(update::run(&root, "todo", Some("x".into()), None).is_err());
        show::run(&root, "todo", "raw", None, "json").unwrap();
        lock::run(&root, "todo", "pw").unwrap();

        verify::run(&root, None, "json").unwrap();
        erase::run(&root, "todo").unwrap();
        list::run(&root, "text").unwrap();
        assert!(erase::run(&root, "todo").is_err());
        assert!(verify::run(&root, Some("todo"), "text").is_err());
    }

    #[test]
    fn display_text_replaces_invalid_utf8() {
        assert_eq!(display_text(b"plain"), "plain");
        assert_eq!(display_text(&[0x66, 0xFF]), "f\u{FFFD}");
    }
}
