//! Test fixtures.
//!
//! Provides temporary on-disk store locations and a tracing setup for
//! tests that want to see the access layer's log output.

use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;

/// A database path inside a temporary directory, removed on drop.
pub struct TempStore {
    path: PathBuf,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TempStore {
    /// Creates a fresh directory and returns a store path inside it.
    ///
    /// Nothing is created at the path itself.
    pub fn new() -> Self {
        Self::named("test.db")
    }

    /// Like [`TempStore::new`] with a chosen file name.
    pub fn named(file_name: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self {
            path: temp_dir.path().join(file_name),
            _temp_dir: temp_dir,
        }
    }

    /// Returns the store path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true once something has been written at the path.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl Default for TempStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `f` with a temporary store path.
///
/// # Example
///
/// ```rust,ignore
/// use kvbridge_testkit::with_temp_store;
///
/// #[test]
/// fn my_test() {
///     with_temp_store(|path| {
///         // open, write, close, reopen ...
///     });
/// }
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&Path) -> R,
{
    let store = TempStore::new();
    f(store.path())
}

/// Installs a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `kvbridge=debug`. Output goes through the
/// test harness capture.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kvbridge=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_path_is_inside_live_directory() {
        let store = TempStore::new();
        assert!(store.path().parent().unwrap().is_dir());
        assert!(!store.exists());
    }

    #[test]
    fn directory_removed_on_drop() {
        let dir = {
            let store = TempStore::named("x.db");
            store.path().parent().unwrap().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[test]
    fn tracing_init_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
    }
}
