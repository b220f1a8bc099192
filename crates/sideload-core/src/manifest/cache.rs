//! Append-only manifest cache shared by parsers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::PackageManifest;

/// Manifests keyed by normalized source path.
///
/// Entries are never evicted. Lookups and inserts go through a single mutex so
/// the cache can be shared across threads.
#[derive(Debug, Default)]
pub struct ManifestCache {
    entries: Mutex<HashMap<PathBuf, Arc<PackageManifest>>>,
}

impl ManifestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Arc<PackageManifest>> {
        self.lock().get(&normalize_key(path)).cloned()
    }

    /// Insert `manifest` under `path` unless an entry already exists.
    ///
    /// Returns whichever manifest ends up cached.
    pub(crate) fn insert_if_absent(
        &self,
        path: &Path,
        manifest: Arc<PackageManifest>,
    ) -> Arc<PackageManifest> {
        self.lock()
            .entry(normalize_key(path))
            .or_insert(manifest)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<PackageManifest>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Canonical path when the source exists, otherwise its absolute form.
pub fn normalize_key(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
