//! Binary entry storage with integrity headers.
//!
//! Each entry is a single file `<dir>/<key>.srf` holding a length-prefixed
//! header (magic bytes, format version, tool version, payload checksum)
//! followed by the payload bytes.

use std::path::{Path, PathBuf};

use quill_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Magic bytes identifying a Quill cache entry.
const ENTRY_MAGIC: [u8; 4] = *b"QUIL";

/// Current entry format version. Increment on breaking changes to
/// the header or payload format.
const ENTRY_FORMAT_VERSION: u32 = 1;

/// File extension of cache entries.
pub const ENTRY_EXT: &str = "srf";

/// Header prepended to every cache entry for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryHeader {
    /// Magic bytes: must be `b"QUIL"`.
    pub magic: [u8; 4],

    /// Entry format version.
    pub format_version: u32,

    /// Quill version that produced this entry.
    pub tool_version: String,

    /// Content hash of the payload (for integrity checks).
    pub checksum: ContentHash,
}

/// Flat keyed store of binary entries in one directory.
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at `dir`. Nothing is touched on disk.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Returns the store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the store directory if it does not exist.
    pub fn ensure_dir(&self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::Io {
            path: self.dir.clone(),
            source: e,
        })
    }

    /// Returns the file path for the entry with the given key.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{ENTRY_EXT}"))
    }

    /// Writes an entry and returns its path.
    ///
    /// The bytes go to a temporary sibling first and are renamed into place,
    /// so readers see either the previous entry or the complete new one.
    pub fn write_entry(
        &self,
        key: &str,
        data: &[u8],
        tool_version: &str,
    ) -> Result<PathBuf, CacheError> {
        let header = EntryHeader {
            magic: ENTRY_MAGIC,
            format_version: ENTRY_FORMAT_VERSION,
            tool_version: tool_version.to_string(),
            checksum: ContentHash::from_bytes(data),
        };

        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        // Write: 4-byte header length (little-endian) + header + payload
        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + data.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(data);

        let path = self.entry_path(key);
        let tmp = self.dir.join(format!("{key}.{ENTRY_EXT}.tmp"));
        std::fs::write(&tmp, &output).map_err(|e| CacheError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e,
        })?;

        Ok(path)
    }

    /// Reads an entry's payload, validating its header.
    ///
    /// Returns `None` if the file doesn't exist or fails validation; the
    /// reason is logged at debug level. Corruption is a cache miss.
    pub fn read_entry(&self, key: &str, tool_version: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(key);
        let raw = std::fs::read(&path).ok()?;
        match decode_entry(&path, &raw, tool_version) {
            Ok(payload) => Some(payload.to_vec()),
            Err(err) => {
                tracing::debug!(%err, "discarding cache entry");
                None
            }
        }
    }

    /// Counts the entries currently in the store.
    pub fn count(&self) -> usize {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return 0;
        };
        entries
            .flatten()
            .filter(|e| is_entry(&e.path()))
            .count()
    }

    /// Removes every entry. Returns the number of files removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        let entries = std::fs::read_dir(&self.dir).map_err(|e| CacheError::Io {
            path: self.dir.clone(),
            source: e,
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| CacheError::Io {
                path: self.dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if is_entry(&path) {
                std::fs::remove_file(&path).map_err(|e| CacheError::Io {
                    path: path.clone(),
                    source: e,
                })?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

fn is_entry(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXT)
}

/// Splits a raw entry into header and payload and validates the header.
fn decode_entry<'a>(
    path: &Path,
    raw: &'a [u8],
    tool_version: &str,
) -> Result<&'a [u8], CacheError> {
    let invalid = |reason: &str| CacheError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if raw.len() < 4 {
        return Err(invalid("truncated header length"));
    }
    let header_len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
    if raw.len() < 4 + header_len {
        return Err(invalid("truncated header"));
    }

    let (header, _): (EntryHeader, usize) =
        bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
            .map_err(|e| invalid(&e.to_string()))?;

    if header.magic != ENTRY_MAGIC {
        return Err(invalid("missing magic bytes"));
    }
    if header.format_version != ENTRY_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: ENTRY_FORMAT_VERSION,
            actual: header.format_version,
        });
    }
    if header.tool_version != tool_version {
        return Err(CacheError::ToolVersionMismatch {
            path: path.to_path_buf(),
            expected: tool_version.to_string(),
            actual: header.tool_version,
        });
    }

    let payload = &raw[4 + header_len..];
    let actual = ContentHash::from_bytes(payload);
    if actual != header.checksum {
        return Err(CacheError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: header.checksum.to_string(),
            actual: actual.to_string(),
        });
    }

    Ok(payload)
}
