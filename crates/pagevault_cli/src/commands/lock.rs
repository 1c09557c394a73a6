//! Lock command implementation.

use super::open_registry;
use pagevault_core::LockOutcome;
use std::path::Path;

/// Runs the lock command, toggling the lock of `page`.
pub fn run(path: &Path, page: &str, passphrase: &str) -> Result<(), Box<dyn std::error::Error>> {
    let registry = open_registry(path, false)?;
    let handle = registry.open_existing(page)?;
    let mut p = handle.write();
    let outcome = p.toggle_lock(passphrase)?;
    p.save()?;

    match outcome {
        LockOutcome::Locked => println!("Locked '{page}'"),
        LockOutcome::Unlocked => println!("Unlocked '{page}'"),
    }
    Ok(())
}
