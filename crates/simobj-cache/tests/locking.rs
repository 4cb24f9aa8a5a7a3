//! Cross-owner locking and abort-safety of the cache directory.

use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;

use indexmap::IndexMap;
use simobj_cache::{CacheEntry, CacheError, CacheManager, CancelAction, Fingerprint};
use simobj_core::Value;

fn fp() -> Fingerprint {
    Fingerprint::from_raw("simobj_snap-28_fof-1_sub-0_fofsub")
}

fn entry(values: &[f64]) -> CacheEntry {
    let mut fields = IndexMap::new();
    fields.insert("mass_g".to_string(), Value::column(values.to_vec(), "Msun"));
    CacheEntry {
        fingerprint: fp().as_str().to_string(),
        config_hash: 42,
        fields,
        ..CacheEntry::default()
    }
}

#[test]
fn racing_acquires_exactly_one_wins() {
    let dir = tempfile::tempdir().unwrap();
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let path = dir.path().to_path_buf();
            thread::spawn(move || {
                barrier.wait();
                CacheManager::open(path, fp(), CancelAction::ReturnError)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(CacheError::AlreadyLocked { .. }))));

    drop(results);
    let again = CacheManager::open(dir.path(), fp(), CancelAction::ReturnError);
    assert!(again.is_ok(), "lock must be free once the winner is dropped");
}

#[test]
fn reacquire_after_release() {
    let dir = tempfile::tempdir().unwrap();
    let mut first = CacheManager::open(dir.path(), fp(), CancelAction::ReturnError).unwrap();
    assert!(matches!(
        CacheManager::open(dir.path(), fp(), CancelAction::ReturnError),
        Err(CacheError::AlreadyLocked { .. })
    ));
    first.release();
    CacheManager::open(dir.path(), fp(), CancelAction::ReturnError).unwrap();
}

#[test]
fn interrupted_write_leaves_previous_entry() {
    let dir = tempfile::tempdir().unwrap();
    let mut m = CacheManager::open(dir.path(), fp(), CancelAction::ReturnError).unwrap();
    m.persist(&entry(&[1.0, 2.0])).unwrap();

    // A crash mid-write leaves only a partial temporary file behind.
    fs::write(fp().tmp_path(dir.path()), b"SOBJ\x01trunc").unwrap();
    assert_eq!(m.load(42).unwrap(), Some(entry(&[1.0, 2.0])));

    m.persist(&entry(&[3.0])).unwrap();
    assert_eq!(m.load(42).unwrap(), Some(entry(&[3.0])));
    assert!(!fp().tmp_path(dir.path()).exists());
}

#[test]
fn corrupt_entry_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let m = CacheManager::open(dir.path(), fp(), CancelAction::ReturnError).unwrap();
    fs::write(m.entry_path(), b"not a cache entry").unwrap();
    assert_eq!(m.load(42).unwrap(), None);
}

#[test]
fn entry_under_other_fingerprint_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let mut m = CacheManager::open(dir.path(), fp(), CancelAction::ReturnError).unwrap();
    let mut foreign = entry(&[1.0]);
    foreign.fingerprint = "someone_else".into();
    m.persist(&foreign).unwrap();
    assert_eq!(m.load(42).unwrap(), None);
}

#[test]
fn cancellation_from_another_thread_releases_lock() {
    let dir = tempfile::tempdir().unwrap();
    let mut m = CacheManager::open(dir.path(), fp(), CancelAction::ReturnError).unwrap();
    let handle = m.cancel_handle();
    thread::spawn(move || handle.request()).join().unwrap();

    assert!(!fp().lock_path(dir.path()).exists());
    assert!(matches!(m.persist(&entry(&[1.0])), Err(CacheError::Cancelled)));
    // Another owner can take over immediately.
    CacheManager::open(dir.path(), fp(), CancelAction::ReturnError).unwrap();
}
