//! End-to-end page scenarios through the registry.

use pagevault_core::{
    AesGcmCrypto, Config, CoreError, CoreResult, EncryptOutcome, ErrorKind, LockOutcome,
    ManualClock, MemoryStore, PageHandle, PageRegistry, PageStore, PageWrite, ReadMode,
    RevisionLog, StoredPage, Timestamp, DEFAULT_DESTRUCT_NOTICE,
};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn setup(config: Config) -> (PageRegistry, Arc<MemoryStore>, Arc<ManualClock>) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(Timestamp::from_secs(1_600_000_000)));
    let registry =
        PageRegistry::with_clock(config, store.clone(), Arc::new(AesGcmCrypto), clock.clone());
    (registry, store, clock)
}

#[test]
fn alpha_edits_collapse_into_one_bucket() {
    let (registry, _, clock) = setup(Config::default());
    let page = registry.open("alpha").unwrap();

    let mut last = None;
    for text in ["a", "ab", "abc"] {
        last = page.write().update(text.as_bytes()).unwrap();
        clock.advance(Duration::from_secs(10));
    }

    let snaps = page.read().major_snapshots_and_change_sums(60);
    assert_eq!(snaps.timestamps, vec![last.unwrap().timestamp]);
    assert_eq!(snaps.change_sums, vec![3]);
    assert_eq!(page.read().history(), snaps);
}

#[test]
fn distant_sessions_become_separate_buckets() {
    let (registry, _, clock) = setup(Config::default());
    let page = registry.open("sessions").unwrap();

    page.write().update(b"morning").unwrap();
    clock.advance(Duration::from_secs(5));
    page.write().update(b"morning notes").unwrap();
    clock.advance(Duration::from_secs(3600));
    page.write().update(b"evening notes").unwrap();

    let snaps = page.read().major_snapshots_and_change_sums(60);
    assert_eq!(snaps.len(), 2);
    assert!(snaps.change_sums[0] > 0);
    assert_eq!(snaps.change_sums[1], 7 + 6);
}

#[test]
fn previous_versions_by_time() {
    let (registry, _, clock) = setup(Config::default());
    let page = registry.open("doc").unwrap();

    let mut stamps = Vec::new();
    for text in ["v1", "v2", "v3"] {
        stamps.push(page.write().update(text.as_bytes()).unwrap().unwrap().timestamp);
        clock.advance(Duration::from_secs(30));
    }

    let page = page.read();
    assert_eq!(page.previous_by_timestamp(stamps[0]).unwrap(), b"v1");
    let between = Timestamp::from_nanos(stamps[1].as_nanos() + 1_000);
    assert_eq!(page.previous_by_timestamp(between).unwrap(), b"v2");
    assert_eq!(
        page.previous_by_timestamp(Timestamp::from_secs(0))
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn lock_round_trip_and_wrong_passphrase() {
    let (registry, _, _) = setup(Config::default());
    let page = registry.open("locked").unwrap();
    page.write().update(b"contents").unwrap();

    assert_eq!(page.write().toggle_lock("hunter2").unwrap(), LockOutcome::Locked);
    let before = page.read().state().clone();

    let err = page.write().toggle_lock("hunter3").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WrongPassphrase);
    assert_eq!(page.read().state(), &before);

    assert_eq!(page.write().toggle_lock("hunter2").unwrap(), LockOutcome::Unlocked);
    assert!(page.read().state().is_default());
    assert_eq!(page.write().read(ReadMode::Edit).unwrap().text, b"contents");
}

#[test]
fn lock_while_encrypted_is_forbidden() {
    let (registry, _, _) = setup(Config::default());
    let page = registry.open("sealed").unwrap();
    page.write().update(b"top secret").unwrap();
    page.write().toggle_encrypt("key").unwrap();

    let revisions = page.read().revisions().len();
    let state = page.read().state().clone();

    let err = page.write().toggle_lock("pw").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(page.read().state(), &state);
    assert_eq!(page.read().revisions().len(), revisions);
}

#[test]
fn encrypt_while_locked_is_forbidden() {
    let (registry, _, _) = setup(Config::default());
    let page = registry.open("p").unwrap();
    page.write().update(b"text").unwrap();
    page.write().toggle_lock("pw").unwrap();

    let err = page.write().toggle_encrypt("key").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(page.read().current(), b"text");
    assert_eq!(page.read().revisions().len(), 1);
}

#[test]
fn encrypt_round_trip_preserves_text_and_primed_flag() {
    let (registry, store, clock) = setup(Config::default());
    let page = registry.open("vault").unwrap();
    let text = "line one\nline two\n\u{1F512}".as_bytes();

    page.write().update(text).unwrap();
    page.write().prime().unwrap();
    clock.advance(Duration::from_secs(1));

    assert_eq!(page.write().toggle_encrypt("k").unwrap(), EncryptOutcome::Encrypted);
    assert_eq!(page.write().read(ReadMode::View).unwrap_err().kind(), ErrorKind::Forbidden);
    page.write().save().unwrap();
    clock.advance(Duration::from_secs(1));

    assert_eq!(page.write().toggle_encrypt("k").unwrap(), EncryptOutcome::Decrypted);
    assert_eq!(page.read().current(), text);
    assert!(page.read().state().is_primed());
    assert!(!page.read().state().is_encrypted());

    // the saved log still holds the ciphertext revision
    let stored = store.load("vault").unwrap().unwrap();
    assert!(stored.state.is_encrypted());
    assert_eq!(stored.revisions.len(), 2);
}

/// Store that records the order of save and delete calls, and fails
/// them on request.
#[derive(Default)]
struct RecordingStore {
    inner: MemoryStore,
    events: Mutex<Vec<Event>>,
    fail_save: AtomicBool,
    fail_delete: AtomicBool,
}

fn refused(what: &str) -> CoreError {
    CoreError::Io(io::Error::new(io::ErrorKind::Other, format!("{what} refused")))
}

impl RecordingStore {
    /// Newest text as it would be reloaded from the store.
    fn stored_text(&self, name: &str) -> CoreResult<Vec<u8>> {
        let revisions = self.inner.load(name)?.unwrap_or_default().revisions;
        let log = RevisionLog::from_revisions(revisions, 32, Arc::new(ManualClock::default()))?;
        Ok(log.current().to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Save { last_text: Option<Vec<u8>>, sync: bool },
    Delete,
}

impl PageStore for RecordingStore {
    fn load(&self, name: &str) -> CoreResult<Option<StoredPage>> {
        self.inner.load(name)
    }

    fn save(&self, name: &str, write: &PageWrite<'_>) -> CoreResult<()> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(refused("save"));
        }
        self.inner.save(name, write)?;
        let last_text = match write.revisions.last() {
            Some(_) => Some(self.stored_text(name)?),
            None => None,
        };
        self.events.lock().push(Event::Save {
            last_text,
            sync: write.sync,
        });
        Ok(())
    }

    fn delete(&self, name: &str) -> CoreResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(refused("delete"));
        }
        self.inner.delete(name)?;
        self.events.lock().push(Event::Delete);
        Ok(())
    }

    fn names(&self) -> CoreResult<Vec<String>> {
        self.inner.names()
    }
}

#[test]
fn self_destruct_saves_notice_before_erasing() {
    let store = Arc::new(RecordingStore::default());
    let config = Config::new().sync_on_save(false);
    let notice = config.destruct_notice.clone();
    let registry = PageRegistry::new(config, store.clone(), Arc::new(AesGcmCrypto));

    let page = registry.open("ephemeral").unwrap();
    page.write().update(b"read me once").unwrap();
    page.write().prime().unwrap();
    page.write().save().unwrap();

    let view = page.write().read(ReadMode::View).unwrap();
    assert!(view.self_destructed);
    let expected = [notice.as_bytes(), &b"read me once"[..]].concat();
    assert_eq!(view.text, expected);

    let events = store.events.lock().clone();
    assert_eq!(
        events,
        vec![
            Event::Save {
                last_text: Some(b"read me once".to_vec()),
                sync: false,
            },
            Event::Save {
                last_text: Some(expected),
                sync: true,
            },
            Event::Delete,
        ]
    );

    assert!(page.read().is_empty());
    assert!(store.load("ephemeral").unwrap().is_none());
    assert!(registry.open("ephemeral").unwrap().read().is_empty());
}

fn primed_page(store: &Arc<RecordingStore>) -> (PageRegistry, PageHandle) {
    let registry = PageRegistry::new(Config::default(), store.clone(), Arc::new(AesGcmCrypto));
    let page = registry.open("ephemeral").unwrap();
    page.write().update(b"secret").unwrap();
    page.write().prime().unwrap();
    page.write().save().unwrap();
    (registry, page)
}

#[test]
fn failed_final_save_leaves_page_primed_and_unchanged() {
    let store = Arc::new(RecordingStore::default());
    let (_registry, page) = primed_page(&store);

    store.fail_save.store(true, Ordering::SeqCst);
    let err = page.write().read(ReadMode::View).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageFailure);
    assert_eq!(page.read().revisions().len(), 1);
    assert_eq!(page.read().current(), b"secret");
    assert!(page.read().state().is_primed());
    assert!(!page.read().is_dirty());

    store.fail_save.store(false, Ordering::SeqCst);
    let view = page.write().read(ReadMode::View).unwrap();
    assert!(view.self_destructed);
    assert_eq!(view.text, [DEFAULT_DESTRUCT_NOTICE.as_bytes(), &b"secret"[..]].concat());
    assert!(store.load("ephemeral").unwrap().is_none());
}

#[test]
fn failed_delete_still_destroys_page_once() {
    let store = Arc::new(RecordingStore::default());
    let (_registry, page) = primed_page(&store);

    store.fail_delete.store(true, Ordering::SeqCst);
    let view = page.write().read(ReadMode::View).unwrap();
    assert!(view.self_destructed);
    assert!(page.read().is_empty());
    assert!(page.read().state().is_default());

    // the surviving log now holds an empty history
    let stored = store.load("ephemeral").unwrap().unwrap();
    assert!(stored.revisions.is_empty());
    assert!(stored.state.is_default());

    let fresh = PageRegistry::new(Config::default(), store.clone(), Arc::new(AesGcmCrypto));
    let reopened = fresh.open("ephemeral").unwrap();
    let view = reopened.write().read(ReadMode::View).unwrap();
    assert!(!view.self_destructed);
    assert!(view.text.is_empty());
}

#[test]
fn locked_primed_page_waits_for_unlock() {
    let (registry, _, _) = setup(Config::default());
    let page = registry.open("p").unwrap();
    page.write().update(b"x").unwrap();
    page.write().prime().unwrap();
    page.write().toggle_lock("pw").unwrap();

    assert!(!page.write().read(ReadMode::Raw).unwrap().self_destructed);
    assert!(!page.write().read(ReadMode::History).unwrap().self_destructed);

    page.write().toggle_lock("pw").unwrap();
    assert!(page.write().read(ReadMode::View).unwrap().self_destructed);
}

#[test]
fn gated_update_and_erase() {
    let (registry, store, _) = setup(Config::default());
    let page = registry.open("p").unwrap();
    page.write().update_gated(b"draft").unwrap();
    page.write().save().unwrap();
    page.write().toggle_encrypt("k").unwrap();

    assert_eq!(
        page.write().update_gated(b"overwrite").unwrap_err().kind(),
        ErrorKind::Forbidden
    );
    assert_eq!(page.write().erase_gated().unwrap_err().kind(), ErrorKind::Forbidden);
    assert!(store.load("p").unwrap().is_some());

    page.write().toggle_encrypt("k").unwrap();
    page.write().erase_gated().unwrap();
    assert!(store.load("p").unwrap().is_none());
}
