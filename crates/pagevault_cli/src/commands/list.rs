//! List command implementation.

use pagevault_core::{DirectoryStore, PageStore};
use std::path::Path;

/// Runs the list command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = DirectoryStore::open(path, false)?;
    let names = store.names()?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&names)?);
        }
        _ => {
            for name in &names {
                println!("{name}");
            }
            if names.is_empty() {
                println!("(no pages)");
            }
        }
    }

    Ok(())
}
