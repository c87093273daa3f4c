//! Per-root parse artifact cache.
//!
//! The [`ArtifactCache`] maps a source file to the [`ParseArtifact`] computed
//! for it on an earlier run. Entries are keyed by a fingerprint of the file's
//! absolute path and are valid only while the file's modification time is
//! exactly the one recorded in the entry. File contents are never hashed.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use quill_common::Fingerprint;
use quill_model::ParseArtifact;
use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactStore;
use crate::error::CacheError;

/// Name of the cache directory under the platform cache location.
const CACHE_DIR_NAME: &str = "quill";

/// The persisted form of one parse result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Modification time of the source file the artifact was computed from.
    pub modified: SystemTime,
    /// The parse result.
    pub artifact: ParseArtifact,
}

/// Cache of parse artifacts for the files under one source root.
///
/// A disabled cache misses on every lookup and ignores every store.
pub struct ArtifactCache {
    store: Option<ArtifactStore>,
    tool_version: String,
}

impl ArtifactCache {
    /// Returns a cache that never hits and never writes.
    pub fn disabled() -> Self {
        Self {
            store: None,
            tool_version: String::new(),
        }
    }

    /// Opens the cache for `root` under `base`, creating its directory.
    pub fn open(base: &Path, root: &Path, tool_version: &str) -> Result<Self, CacheError> {
        let store = ArtifactStore::new(&Self::dir_for_root(base, root));
        store.ensure_dir()?;
        Ok(Self {
            store: Some(store),
            tool_version: tool_version.to_string(),
        })
    }

    /// Returns the cache directory used for `root` under `base`.
    ///
    /// The directory name is the fingerprint of the root's absolute path,
    /// so every root gets a stable directory of its own.
    pub fn dir_for_root(base: &Path, root: &Path) -> PathBuf {
        base.join(Fingerprint::of_path(&absolute(root)).as_str())
    }

    /// Returns the default cache base directory.
    ///
    /// `$XDG_CACHE_HOME/quill`, then `$HOME/.cache/quill`, then
    /// `<tmp>/quill`.
    pub fn default_base_dir() -> PathBuf {
        if let Some(xdg) = std::env::var_os("XDG_CACHE_HOME").filter(|v| !v.is_empty()) {
            return PathBuf::from(xdg).join(CACHE_DIR_NAME);
        }
        if let Some(home) = std::env::var_os("HOME").filter(|v| !v.is_empty()) {
            return PathBuf::from(home).join(".cache").join(CACHE_DIR_NAME);
        }
        std::env::temp_dir().join(CACHE_DIR_NAME)
    }

    /// Returns `true` unless the cache was created with [`disabled`](Self::disabled).
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Returns the cache directory, if enabled.
    pub fn dir(&self) -> Option<&Path> {
        self.store.as_ref().map(ArtifactStore::dir)
    }

    /// Returns the cache key of a source file.
    pub fn key_for(path: &Path) -> Fingerprint {
        Fingerprint::of_path(&absolute(path))
    }

    /// Returns the entry file that would hold `path`'s artifact, if enabled.
    pub fn entry_path(&self, path: &Path) -> Option<PathBuf> {
        let store = self.store.as_ref()?;
        Some(store.entry_path(Self::key_for(path).as_str()))
    }

    /// Looks up the artifact for `path`.
    ///
    /// Hits only if an entry exists, the file's current modification time is
    /// readable, and it equals the time recorded in the entry.
    pub fn lookup(&self, path: &Path) -> Option<ParseArtifact> {
        let modified = modified_time(path)?;
        self.lookup_at(path, modified)
    }

    /// Looks up the artifact for `path` against a known modification time.
    pub fn lookup_at(&self, path: &Path, modified: SystemTime) -> Option<ParseArtifact> {
        let store = self.store.as_ref()?;
        let key = Self::key_for(path);
        let payload = store.read_entry(key.as_str(), &self.tool_version)?;

        let entry: CacheEntry =
            match bincode::serde::decode_from_slice(&payload, bincode::config::standard()) {
                Ok((entry, _)) => entry,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "undecodable cache entry");
                    return None;
                }
            };

        if entry.modified != modified {
            tracing::trace!(path = %path.display(), "stale cache entry");
            return None;
        }

        Some(entry.artifact)
    }

    /// Stores `artifact` as the result for `path` at modification time `modified`.
    ///
    /// Does nothing when the cache is disabled. Any failure is returned; the
    /// caller must not continue as if the entry had been written.
    pub fn store(
        &self,
        path: &Path,
        artifact: &ParseArtifact,
        modified: SystemTime,
    ) -> Result<(), CacheError> {
        let Some(store) = self.store.as_ref() else {
            return Ok(());
        };

        let entry = CacheEntry {
            modified,
            artifact: artifact.clone(),
        };
        let bytes = bincode::serde::encode_to_vec(&entry, bincode::config::standard()).map_err(
            |e| CacheError::Serialization {
                reason: e.to_string(),
            },
        )?;

        let key = Self::key_for(path);
        store.write_entry(key.as_str(), &bytes, &self.tool_version)?;
        Ok(())
    }

    /// Number of entries currently stored.
    pub fn entry_count(&self) -> usize {
        self.store.as_ref().map_or(0, ArtifactStore::count)
    }

    /// Removes every entry. Returns the number removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        match self.store.as_ref() {
            Some(store) => store.clear(),
            None => Ok(0),
        }
    }
}

/// Returns the modification time of `path`, if the platform reports one.
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
