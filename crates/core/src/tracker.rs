//! File tracking side-channel.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Records every file the compiler produces.
///
/// The compiler never writes files itself; it reports the paths it computed
/// so the caller can stage, persist or clean them up.
pub trait FileTracker: Send + Sync {
    /// Record that `path` was created.
    fn track_created(&self, path: &Path);
}

/// In-memory [`FileTracker`] that keeps paths in creation order.
#[derive(Debug, Default)]
pub struct MemoryFileTracker {
    created: Mutex<Vec<PathBuf>>,
}

impl MemoryFileTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths recorded so far.
    #[must_use]
    pub fn created(&self) -> Vec<PathBuf> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FileTracker for MemoryFileTracker {
    fn track_created(&self, path: &Path) {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_path_buf());
    }
}
