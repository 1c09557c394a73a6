//! Concurrent access through the registry.

use pagevault_core::{AesGcmCrypto, Config, MemoryStore, PageRegistry, PageStore, ReadMode};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;
const WRITES_PER_THREAD: usize = 50;

fn registry(store: Arc<MemoryStore>) -> Arc<PageRegistry> {
    Arc::new(PageRegistry::new(
        Config::new().snapshot_interval(4),
        store,
        Arc::new(AesGcmCrypto),
    ))
}

#[test]
fn concurrent_writers_on_one_page() {
    let store = Arc::new(MemoryStore::new());
    let registry = registry(store.clone());
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..WRITES_PER_THREAD {
                    registry
                        .with_page_mut("shared", |page| {
                            let mut text = page.current().to_vec();
                            text.extend_from_slice(format!("[{t}:{i}]").as_bytes());
                            page.update(&text)?;
                            if i % 10 == 0 {
                                page.save()?;
                            }
                            Ok(())
                        })
                        .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let handle = registry.open("shared").unwrap();
    handle.write().save().unwrap();
    let page = handle.read();

    // every write became exactly one revision
    let metas: Vec<_> = page.revisions().collect();
    assert_eq!(metas.len(), THREADS * WRITES_PER_THREAD);
    assert!(metas.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

    // and every marker made it into the final text exactly once
    let text = String::from_utf8(page.current().to_vec()).unwrap();
    let markers: Vec<&str> = text.split_terminator(']').collect();
    assert_eq!(markers.len(), THREADS * WRITES_PER_THREAD);
    let unique: HashSet<&str> = markers.iter().copied().collect();
    assert_eq!(unique.len(), markers.len());

    // each revision still reconstructs after a reload from the store
    let reloaded = registry_on(&store).open("shared").unwrap();
    let reloaded = reloaded.read();
    assert_eq!(reloaded.current(), page.current());
    for meta in metas.iter().step_by(37) {
        assert_eq!(
            reloaded.previous_by_timestamp(meta.timestamp).unwrap(),
            page.previous_by_timestamp(meta.timestamp).unwrap()
        );
    }
}

fn registry_on(store: &Arc<MemoryStore>) -> Arc<PageRegistry> {
    registry(Arc::clone(store))
}

#[test]
fn concurrent_opens_share_one_page() {
    let registry = registry(Arc::new(MemoryStore::new()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.open("contended").unwrap()
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|worker| worker.join().unwrap())
        .collect();

    assert!(handles.iter().all(|h| h.same_page(&handles[0])));
    assert_eq!(registry.open_pages(), 1);
}

#[test]
fn readers_never_see_half_destroyed_page() {
    let store = Arc::new(MemoryStore::new());
    let registry = registry(store.clone());
    registry
        .with_page_mut("fleeting", |page| {
            page.update(b"only once")?;
            page.prime()?;
            page.save()
        })
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let views: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry
                    .with_page_mut("fleeting", |page| page.read(ReadMode::View))
                    .unwrap()
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|worker| worker.join().unwrap())
        .collect();

    let destroyed = views.iter().filter(|v| v.self_destructed).count();
    assert_eq!(destroyed, 1);
    for view in views.iter().filter(|v| !v.self_destructed) {
        assert!(view.text.is_empty());
    }
    assert!(store.load("fleeting").unwrap().is_none());
}
