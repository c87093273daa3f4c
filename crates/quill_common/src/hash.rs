//! Hashing for cache integrity checks and cache keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// A 128-bit content hash computed using XXH3.
///
/// Used as the integrity checksum of cached payloads and as the fallback
/// path fingerprint when a path has no UTF-8 form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// A stable, filename-safe fingerprint of a filesystem path.
///
/// The fingerprint is the hex-encoded SHA-256 of the path's UTF-8 form.
/// Paths that are not valid UTF-8 fall back to the XXH3-128 hash of the raw
/// path bytes, which is shorter (32 hex chars instead of 64) so the two
/// schemes can never collide.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprints a path by its string identity. The path is not
    /// canonicalized; callers pass the absolute path they want keyed.
    pub fn of_path(path: &Path) -> Self {
        match path.to_str() {
            Some(s) => Self(hex::encode(Sha256::digest(s.as_bytes()))),
            None => {
                let raw = path.as_os_str().as_encoded_bytes();
                Self(ContentHash::from_bytes(raw).to_string())
            }
        }
    }

    /// Returns the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}..)", &self.0[..8.min(self.0.len())])
    }
}
