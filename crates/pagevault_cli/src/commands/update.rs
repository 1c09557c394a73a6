//! Update command implementation.

use super::open_registry;
use std::io::Read;
use std::path::Path;

/// Runs the update command.
///
/// The new text comes from `text`, else from `file`, else from stdin.
pub fn run(
    path: &Path,
    page: &str,
    text: Option<String>,
    file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = match (text, file) {
        (Some(text), _) => text.into_bytes(),
        (None, Some(file)) => std::fs::read(file)?,
        (None, None) => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    let registry = open_registry(path, true)?;
    let written = registry.with_page_mut(page, |p| {
        let meta = p.update_gated(&bytes)?;
        p.save()?;
        Ok(meta)
    })?;

    match written {
        Some(meta) => println!(
            "Recorded revision {} of '{}' ({} bytes changed)",
            meta.timestamp, page, meta.change_sum
        ),
        None => println!("'{page}' is unchanged"),
    }

    Ok(())
}
