//! Concurrent access tests for write_atomic locking
//!
//! Verifies that readers never observe a half-written file while several
//! writers replace it.

use deb_fs::io;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

#[test]
fn test_concurrent_writes_no_corruption() {
    let dir = tempdir().unwrap();
    let file_path = Arc::new(dir.path().join("control"));

    let num_threads = 8;
    let writes_per_thread = 20;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let path = Arc::clone(&file_path);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                for i in 0..writes_per_thread {
                    let content = format!("Source: thread{}\nVersion: {}\n", thread_id, i);
                    io::write_atomic(&path, content.as_bytes()).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread should not panic");
    }

    let content = std::fs::read_to_string(file_path.as_ref()).unwrap();
    assert!(content.starts_with("Source: thread"), "got: {content:?}");
    assert_eq!(content.matches("Source:").count(), 1);
    assert!(content.ends_with('\n'));
}
