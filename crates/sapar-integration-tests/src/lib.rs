//! Integration test crate for the Sapar dispatch core.
//!
//! This crate has no library code beyond small test helpers. It exists
//! for integration tests that exercise end-to-end dispatch flows across
//! multiple workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p sapar-integration-tests
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_DB: AtomicU32 = AtomicU32::new(0);

/// A unique throwaway database path for file-backed tests.
///
/// In-memory SQLite databases are private to one connection, so tests that
/// race multiple connections need a real file.
pub fn scratch_db_path(tag: &str) -> PathBuf {
    let n = NEXT_DB.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!("sapar-test-{tag}-{}-{n}.db", std::process::id()))
}

/// Remove a scratch database and its WAL side files.
pub fn remove_scratch_db(path: &Path) {
    let _ = std::fs::remove_file(path);
    for suffix in ["-wal", "-shm"] {
        let mut side = path.as_os_str().to_owned();
        side.push(suffix);
        let _ = std::fs::remove_file(PathBuf::from(side));
    }
}
