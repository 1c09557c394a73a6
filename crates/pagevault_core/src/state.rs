//! Lock, encryption and self-destruct state of a page.
//!
//! ```text
//!            toggle_lock                  toggle_encrypt
//!   Locked ◄────────────► Open ◄──────────────────────────► Encrypted
//!
//!   primed: set by prime() on an Open page, kept across encryption,
//!           consumed by the self-destruct read
//! ```
//!
//! Transitions never mutate a state in place. Each one checks the table
//! above and returns the next state, which the page installs only after
//! every other step of the operation has succeeded.

use crate::crypto::{PassphraseCrypto, PassphraseDigest};
use crate::error::{CoreError, CoreResult};

/// Reason reported when a locked page refuses an operation.
pub const LOCKED_REASON: &str = "page is locked";
/// Reason reported when an encrypted page refuses an operation.
pub const ENCRYPTED_REASON: &str = "page is encrypted";

/// Who may read and edit a page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Access {
    /// Readable and editable by anyone.
    #[default]
    Open,
    /// Read-only until unlocked with the passphrase behind `digest`.
    Locked {
        /// Proof of the lock passphrase.
        digest: PassphraseDigest,
    },
    /// The current text is ciphertext. The passphrase is not retained.
    Encrypted,
}

/// Result of a successful lock toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// The page is now locked.
    Locked,
    /// The page is now open.
    Unlocked,
}

/// Result of a successful encryption toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptOutcome {
    /// The page text is now ciphertext.
    Encrypted,
    /// The page text is plaintext again.
    Decrypted,
}

/// Authorization state of one page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageState {
    access: Access,
    primed: bool,
}

impl PageState {
    /// Creates the state of a fresh page: open and not primed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a state from its stored flags.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] if the flags claim both lock
    /// and encryption, or if a digest is present without the lock (or the
    /// other way round).
    pub fn from_flags(
        locked: bool,
        encrypted: bool,
        primed: bool,
        digest: Option<PassphraseDigest>,
    ) -> CoreResult<Self> {
        let access = match (locked, encrypted, digest) {
            (true, true, _) => {
                return Err(CoreError::invalid_format(
                    "page state is both locked and encrypted",
                ))
            }
            (true, false, Some(digest)) => Access::Locked { digest },
            (true, false, None) => {
                return Err(CoreError::invalid_format("locked page state has no digest"))
            }
            (false, _, Some(_)) => {
                return Err(CoreError::invalid_format(
                    "unlocked page state carries a digest",
                ))
            }
            (false, true, None) => Access::Encrypted,
            (false, false, None) => Access::Open,
        };
        Ok(Self { access, primed })
    }

    /// Returns the access level.
    #[must_use]
    pub fn access(&self) -> &Access {
        &self.access
    }

    /// Returns true if the page is locked.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self.access, Access::Locked { .. })
    }

    /// Returns true if the page text is ciphertext.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        matches!(self.access, Access::Encrypted)
    }

    /// Returns true if the page is primed for self-destruction.
    #[must_use]
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Returns the lock digest, present only while locked.
    #[must_use]
    pub fn digest(&self) -> Option<&PassphraseDigest> {
        match &self.access {
            Access::Locked { digest } => Some(digest),
            Access::Open | Access::Encrypted => None,
        }
    }

    /// Returns true for the state of a page that was never touched.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Returns true if the next qualifying read destroys the page.
    ///
    /// Priming is ignored while the page is locked or encrypted.
    #[must_use]
    pub fn should_self_destruct(&self) -> bool {
        self.primed && matches!(self.access, Access::Open)
    }

    /// Refuses gated operations on locked or encrypted pages.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Forbidden`] naming the blocking state.
    pub fn check_open(&self, page: &str) -> CoreResult<()> {
        match self.access {
            Access::Open => Ok(()),
            Access::Locked { .. } => Err(CoreError::forbidden(page, LOCKED_REASON)),
            Access::Encrypted => Err(CoreError::forbidden(page, ENCRYPTED_REASON)),
        }
    }

    /// Computes the state after toggling the lock.
    ///
    /// Locking hashes `passphrase`; unlocking checks it against the stored
    /// digest and drops the digest.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Forbidden`] if the page is encrypted
    /// - [`CoreError::WrongPassphrase`] if unlocking with a wrong passphrase
    pub fn toggled_lock(
        &self,
        page: &str,
        passphrase: &str,
        crypto: &dyn PassphraseCrypto,
    ) -> CoreResult<(Self, LockOutcome)> {
        match &self.access {
            Access::Encrypted => Err(CoreError::forbidden(page, ENCRYPTED_REASON)),
            Access::Open => {
                let digest = crypto.hash(passphrase)?;
                let next = Self {
                    access: Access::Locked { digest },
                    primed: self.primed,
                };
                Ok((next, LockOutcome::Locked))
            }
            Access::Locked { digest } => {
                if !crypto.check_hash(passphrase, digest)? {
                    return Err(CoreError::wrong_passphrase(page));
                }
                let next = Self {
                    access: Access::Open,
                    primed: self.primed,
                };
                Ok((next, LockOutcome::Unlocked))
            }
        }
    }

    /// Computes the state after toggling encryption.
    ///
    /// Only the flag flips here; transforming the text is the caller's
    /// job. The primed flag is carried over.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Forbidden`] if the page is locked.
    pub fn toggled_encryption(&self, page: &str) -> CoreResult<(Self, EncryptOutcome)> {
        let (access, outcome) = match self.access {
            Access::Locked { .. } => return Err(CoreError::forbidden(page, LOCKED_REASON)),
            Access::Open => (Access::Encrypted, EncryptOutcome::Encrypted),
            Access::Encrypted => (Access::Open, EncryptOutcome::Decrypted),
        };
        Ok((
            Self {
                access,
                primed: self.primed,
            },
            outcome,
        ))
    }

    /// Computes the state after priming for self-destruction.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Forbidden`] if the page is locked or encrypted.
    pub fn primed(&self, page: &str) -> CoreResult<Self> {
        self.check_open(page)?;
        Ok(Self {
            access: Access::Open,
            primed: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::AesGcmCrypto;

    #[test]
    fn fresh_state_is_open() {
        let state = PageState::new();
        assert!(!state.is_locked());
        assert!(!state.is_encrypted());
        assert!(!state.is_primed());
        assert!(state.digest().is_none());
        assert!(state.is_default());
        assert!(state.check_open("p").is_ok());
    }

    #[test]
    fn lock_then_unlock() {
        let crypto = AesGcmCrypto;
        let (locked, outcome) = PageState::new().toggled_lock("p", "pw", &crypto).unwrap();
        assert_eq!(outcome, LockOutcome::Locked);
        assert!(locked.is_locked());
        assert!(locked.digest().is_some());

        let (open, outcome) = locked.toggled_lock("p", "pw", &crypto).unwrap();
        assert_eq!(outcome, LockOutcome::Unlocked);
        assert!(open.is_default());
    }

    #[test]
    fn unlock_with_wrong_passphrase() {
        let crypto = AesGcmCrypto;
        let (locked, _) = PageState::new().toggled_lock("p", "pw", &crypto).unwrap();
        let err = locked.toggled_lock("p", "nope", &crypto).unwrap_err();
        assert!(matches!(err, CoreError::WrongPassphrase { .. }));
        assert!(locked.is_locked());
    }

    #[test]
    fn lock_forbidden_while_encrypted() {
        let (encrypted, _) = PageState::new().toggled_encryption("p").unwrap();
        let err = encrypted
            .toggled_lock("p", "pw", &AesGcmCrypto)
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden { reason: ENCRYPTED_REASON, .. }));
    }

    #[test]
    fn encrypt_forbidden_while_locked() {
        let (locked, _) = PageState::new()
            .toggled_lock("p", "pw", &AesGcmCrypto)
            .unwrap();
        let err = locked.toggled_encryption("p").unwrap_err();
        assert!(matches!(err, CoreError::Forbidden { reason: LOCKED_REASON, .. }));
    }

    #[test]
    fn encryption_keeps_primed() {
        let primed = PageState::new().primed("p").unwrap();
        let (encrypted, outcome) = primed.toggled_encryption("p").unwrap();
        assert_eq!(outcome, EncryptOutcome::Encrypted);
        assert!(encrypted.is_primed());
        assert!(!encrypted.should_self_destruct());

        let (decrypted, outcome) = encrypted.toggled_encryption("p").unwrap();
        assert_eq!(outcome, EncryptOutcome::Decrypted);
        assert!(decrypted.should_self_destruct());
    }

    #[test]
    fn prime_refused_when_gated() {
        let (encrypted, _) = PageState::new().toggled_encryption("p").unwrap();
        assert!(encrypted.primed("p").is_err());
        assert!(encrypted.check_open("p").is_err());
    }

    #[test]
    fn from_flags_validation() {
        let digest = || Some(PassphraseDigest::from_bytes(vec![0; 48]));

        assert!(PageState::from_flags(true, true, false, digest()).is_err());
        assert!(PageState::from_flags(true, false, false, None).is_err());
        assert!(PageState::from_flags(false, false, false, digest()).is_err());

        let locked = PageState::from_flags(true, false, true, digest()).unwrap();
        assert!(locked.is_locked());
        assert!(locked.is_primed());
        assert!(!locked.should_self_destruct());

        let encrypted = PageState::from_flags(false, true, false, None).unwrap();
        assert_eq!(encrypted.access(), &Access::Encrypted);
    }
}
