//! Prime command implementation.

use super::open_registry;
use std::path::Path;

/// Runs the prime command.
pub fn run(path: &Path, page: &str) -> Result<(), Box<dyn std::error::Error>> {
    let registry = open_registry(path, false)?;
    let handle = registry.open_existing(page)?;
    let mut p = handle.write();
    p.prime()?;
    p.save()?;

    println!("'{page}' will self-destruct on its next read");
    Ok(())
}
