//! Lock and atomic-write behaviour under concurrent access.

use pact_fs::{StorageLayout, StorageLock, io};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

#[test]
fn test_try_acquire_reports_contention() {
    let dir = tempdir().unwrap();
    let layout = StorageLayout::new(dir.path());

    let held = StorageLock::acquire(&layout).unwrap();
    assert_eq!(held.path(), layout.lock_path());
    assert!(StorageLock::try_acquire(&layout).unwrap().is_none());

    drop(held);
    assert!(StorageLock::try_acquire(&layout).unwrap().is_some());
}

#[test]
fn test_acquire_waits_for_holder() {
    let dir = tempdir().unwrap();
    let layout = StorageLayout::new(dir.path());
    let held = StorageLock::acquire(&layout).unwrap();

    let waiter = {
        let layout = layout.clone();
        thread::spawn(move || StorageLock::acquire(&layout).map(|_| ()))
    };
    thread::sleep(std::time::Duration::from_millis(100));
    assert!(!waiter.is_finished());

    drop(held);
    waiter.join().expect("Thread should not panic").unwrap();
}

#[test]
fn test_lock_file_is_created_with_root() {
    let dir = tempdir().unwrap();
    let layout = StorageLayout::new(dir.path().join("not-yet"));

    let _lock = StorageLock::acquire(&layout).unwrap();

    assert!(layout.lock_path().is_file());
}

#[test]
fn test_lock_serialises_read_modify_write() {
    let dir = tempdir().unwrap();
    let layout = Arc::new(StorageLayout::new(dir.path()));
    let counter = layout.root().join("counter");
    io::write_atomic(&counter, b"0").unwrap();

    let num_threads = 8;
    let rounds = 10;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let layout = Arc::clone(&layout);
            let barrier = Arc::clone(&barrier);
            let counter = counter.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..rounds {
                    let _guard = StorageLock::acquire(&layout).unwrap();
                    let current: u32 = io::read_optional(&counter)
                        .unwrap()
                        .unwrap()
                        .trim()
                        .parse()
                        .unwrap();
                    io::write_atomic(&counter, (current + 1).to_string().as_bytes()).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread should not panic");
    }

    let total: usize = std::fs::read_to_string(&counter).unwrap().parse().unwrap();
    assert_eq!(total, num_threads * rounds);
}

#[test]
fn test_concurrent_atomic_writes_leave_complete_content() {
    let dir = tempdir().unwrap();
    let path = Arc::new(dir.path().join("config.json"));
    let barrier = Arc::new(Barrier::new(6));

    let handles: Vec<_> = (0..6)
        .map(|id| {
            let path = Arc::clone(&path);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..20 {
                    let body = format!("writer{id}:{i}:{}", "x".repeat(id * 50));
                    io::write_atomic(&path, body.as_bytes()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread should not panic");
    }

    let content = std::fs::read_to_string(path.as_ref()).unwrap();
    let (head, tail) = content.split_once(':').unwrap();
    let id: usize = head.trim_start_matches("writer").parse().unwrap();
    let (_, padding) = tail.split_once(':').unwrap();
    assert_eq!(padding.len(), id * 50, "interleaved write: {content}");
}
