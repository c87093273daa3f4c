//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Reads are fail-safe: every read-side error is logged and turned into a
/// cache miss. Write-side errors are returned to the caller, which treats
/// them as fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An entry file has an invalid or missing header.
    #[error("invalid cache entry header in {path}: {reason}")]
    InvalidHeader {
        /// The entry file path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// The stored checksum does not match the computed checksum of the payload.
    #[error("checksum mismatch in {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The entry file path.
        path: PathBuf,
        /// The expected checksum from the header.
        expected: String,
        /// The actual checksum computed from the payload.
        actual: String,
    },

    /// The entry format version does not match the current version.
    #[error("format version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The entry file path.
        path: PathBuf,
        /// The expected format version.
        expected: u32,
        /// The actual format version found in the file.
        actual: u32,
    },

    /// The entry was written by a different release of the tool.
    #[error("entry in {path} was written by quill {actual}, running {expected}")]
    ToolVersionMismatch {
        /// The entry file path.
        path: PathBuf,
        /// The running tool version.
        expected: String,
        /// The tool version recorded in the entry.
        actual: String,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}
