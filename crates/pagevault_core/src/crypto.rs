//! Passphrase hashing and page encryption.
//!
//! The page state machine only needs four opaque operations, collected in
//! [`PassphraseCrypto`]. [`AesGcmCrypto`] is the default implementation.
//!
//! ## Formats
//!
//! ```text
//! digest     = salt (16) || HKDF-SHA256(passphrase, salt) (32)
//! ciphertext = salt (16) || nonce (12) || AES-256-GCM ciphertext || tag (16)
//! ```
//!
//! A fresh salt and nonce are drawn for every digest and every encryption,
//! so hashing or encrypting the same input twice gives different bytes.
//!
//! HKDF is a key derivation function rather than a password hash; pages
//! that need resistance against offline guessing should plug in an
//! implementation backed by a memory-hard KDF.

use crate::error::{CoreError, CoreResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the random salt in bytes.
pub const SALT_SIZE: usize = 16;
/// Size of the derived AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

const DIGEST_INFO: &[u8] = b"pagevault-passphrase-digest-v1";
const CIPHER_INFO: &[u8] = b"pagevault-page-key-v1";

/// Stored proof of a lock passphrase.
///
/// Opaque to the page state machine: only the [`PassphraseCrypto`] that
/// produced it can check a passphrase against it.
#[derive(Clone, PartialEq, Eq)]
pub struct PassphraseDigest(Vec<u8>);

impl PassphraseDigest {
    /// Wraps digest bytes read back from storage.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for PassphraseDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PassphraseDigest")
            .field(&"[REDACTED]")
            .finish()
    }
}

/// Hashing and symmetric encryption keyed by a user passphrase.
pub trait PassphraseCrypto: Send + Sync {
    /// Produces a digest that [`check_hash`](Self::check_hash) accepts for
    /// `passphrase`.
    fn hash(&self, passphrase: &str) -> CoreResult<PassphraseDigest>;

    /// Returns whether `passphrase` matches `digest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the digest is malformed.
    fn check_hash(&self, passphrase: &str, digest: &PassphraseDigest) -> CoreResult<bool>;

    /// Encrypts `text` under `passphrase`.
    fn encrypt(&self, text: &[u8], passphrase: &str) -> CoreResult<Vec<u8>>;

    /// Decrypts `ciphertext` produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Returns an error for a wrong passphrase or a damaged ciphertext;
    /// the two are indistinguishable.
    fn decrypt(&self, ciphertext: &[u8], passphrase: &str) -> CoreResult<Vec<u8>>;
}

/// Key material derived from a passphrase, wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    fn derive(passphrase: &str, salt: &[u8], info: &[u8]) -> CoreResult<Self> {
        let hk = Hkdf::<Sha256>::new(Some(salt), passphrase.as_bytes());
        let mut bytes = [0u8; KEY_SIZE];
        hk.expand(info, &mut bytes)
            .map_err(|_| CoreError::encryption_failed("HKDF expand failed"))?;
        Ok(Self { bytes })
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(GenericArray::from_slice(&self.bytes))
    }
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Compares two byte strings without short-circuiting on the first
/// difference.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// HKDF-SHA256 digests and AES-256-GCM page encryption.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmCrypto;

impl PassphraseCrypto for AesGcmCrypto {
    fn hash(&self, passphrase: &str) -> CoreResult<PassphraseDigest> {
        let salt: [u8; SALT_SIZE] = random_bytes();
        let key = DerivedKey::derive(passphrase, &salt, DIGEST_INFO)?;

        let mut digest = Vec::with_capacity(SALT_SIZE + KEY_SIZE);
        digest.extend_from_slice(&salt);
        digest.extend_from_slice(&key.bytes);
        Ok(PassphraseDigest(digest))
    }

    fn check_hash(&self, passphrase: &str, digest: &PassphraseDigest) -> CoreResult<bool> {
        let bytes = digest.as_bytes();
        if bytes.len() != SALT_SIZE + KEY_SIZE {
            return Err(CoreError::invalid_format(format!(
                "passphrase digest is {} bytes, expected {}",
                bytes.len(),
                SALT_SIZE + KEY_SIZE
            )));
        }

        let (salt, expected) = bytes.split_at(SALT_SIZE);
        let key = DerivedKey::derive(passphrase, salt, DIGEST_INFO)?;
        Ok(constant_time_eq(&key.bytes, expected))
    }

    fn encrypt(&self, text: &[u8], passphrase: &str) -> CoreResult<Vec<u8>> {
        let salt: [u8; SALT_SIZE] = random_bytes();
        let nonce_bytes: [u8; NONCE_SIZE] = random_bytes();
        let key = DerivedKey::derive(passphrase, &salt, CIPHER_INFO)?;

        let sealed = key
            .cipher()
            .encrypt(Nonce::from_slice(&nonce_bytes), text)
            .map_err(|_| CoreError::encryption_failed("encryption error"))?;

        let mut out = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + sealed.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce_bytes);
        out.extend(sealed);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], passphrase: &str) -> CoreResult<Vec<u8>> {
        if ciphertext.len() < SALT_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(CoreError::encryption_failed("ciphertext too short"));
        }

        let (salt, rest) = ciphertext.split_at(SALT_SIZE);
        let (nonce, sealed) = rest.split_at(NONCE_SIZE);
        let key = DerivedKey::derive(passphrase, salt, CIPHER_INFO)?;

        key.cipher()
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CoreError::encryption_failed("decryption error"))
    }
}
