//! Open-dataset handle cache.
//!
//! Deliberately dumb: no recency tracking, no reference counts. The peak
//! number of open handles is bounded by the provider's diff-release
//! protocol, which is the sole authority on when a handle may go away.

use cube_source::{RasterStore, SourceResult};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Caches open dataset handles keyed by source file path.
pub struct DatasetCache<S: RasterStore> {
    store: S,
    open: HashMap<PathBuf, S::Dataset>,
}

impl<S: RasterStore> DatasetCache<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            open: HashMap::new(),
        }
    }

    /// The underlying store, for operations outside the cache's lifetime
    /// management (index scans open and drop their own handles).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the open handle for `path`, opening the file on first use.
    ///
    /// Idempotent: repeated calls without an intervening [`release`] return
    /// the same handle without reopening. Open errors propagate verbatim.
    ///
    /// [`release`]: DatasetCache::release
    pub fn acquire(&mut self, path: &Path) -> SourceResult<&S::Dataset> {
        match self.open.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let dataset = self.store.open(path)?;
                debug!(path = %path.display(), "cached new dataset handle");
                Ok(entry.insert(dataset))
            }
        }
    }

    /// Close the handle for `path` if one is open; no-op otherwise.
    pub fn release(&mut self, path: &Path) {
        if self.open.remove(path).is_some() {
            debug!(path = %path.display(), "released dataset handle");
        }
    }

    /// Close every open handle; used at shutdown.
    pub fn release_all(&mut self) {
        let count = self.open.len();
        self.open.clear();
        if count > 0 {
            debug!(handles = count, "released all dataset handles");
        }
    }

    /// Number of currently open handles.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}
