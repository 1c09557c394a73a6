//! Erase command implementation.

use super::open_registry;
use std::path::Path;

/// Runs the erase command.
pub fn run(path: &Path, page: &str) -> Result<(), Box<dyn std::error::Error>> {
    let registry = open_registry(path, false)?;
    registry.open_existing(page)?.write().erase_gated()?;

    println!("Erased '{page}'");
    Ok(())
}
