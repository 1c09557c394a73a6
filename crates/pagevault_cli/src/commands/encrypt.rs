//! Encrypt command implementation.

use super::open_registry;
use pagevault_core::EncryptOutcome;
use std::path::Path;

/// Runs the encrypt command, toggling the encryption of `page`.
pub fn run(path: &Path, page: &str, passphrase: &str) -> Result<(), Box<dyn std::error::Error>> {
    let registry = open_registry(path, false)?;
    let handle = registry.open_existing(page)?;
    let mut p = handle.write();
    let outcome = p.toggle_encrypt(passphrase)?;
    p.save()?;

    match outcome {
        EncryptOutcome::Encrypted => println!("Encrypted '{page}'"),
        EncryptOutcome::Decrypted => println!("Decrypted '{page}'"),
    }
    Ok(())
}
