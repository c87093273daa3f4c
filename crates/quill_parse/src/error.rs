//! Error types for the scan pipeline.

use std::path::PathBuf;

use quill_cache::CacheError;

/// A structural parser's failure on one file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}{}", line.map(|l| format!(" (line {l})")).unwrap_or_default())]
pub struct ParseError {
    /// Description of the failure.
    pub message: String,
    /// 1-based line the failure was detected on, if known.
    pub line: Option<usize>,
}

impl ParseError {
    /// Creates a parse error without a location.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    /// Creates a parse error at a 1-based line.
    pub fn at_line(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
        }
    }
}

/// The terminal error of a pipeline run.
///
/// Only one is surfaced per run. [`is_fatal`](Self::is_fatal) errors mean
/// the cache may be left inconsistent and take precedence over per-file
/// failures when several are recorded concurrently.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A source file or root could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A file contains unresolved merge conflict markers.
    #[error("{path} contains merge conflict markers")]
    ConflictMarkers {
        /// The offending file.
        path: PathBuf,
    },

    /// The structural parser rejected a file.
    #[error("unable to parse {path}: {source}")]
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        /// The parser's error.
        source: ParseError,
    },

    /// A root's cache directory could not be prepared.
    #[error("unable to open cache for {root}: {source}")]
    CacheOpen {
        /// The source root.
        root: PathBuf,
        /// The cache error.
        source: CacheError,
    },

    /// A parse artifact could not be written to the cache.
    #[error("unable to save artifacts for {path}: {source}")]
    CacheWrite {
        /// The source file whose artifact failed to save.
        path: PathBuf,
        /// The cache error.
        source: CacheError,
    },

    /// A root's cache entries could not be removed.
    #[error("unable to clear cache for {root}: {source}")]
    CacheClear {
        /// The source root.
        root: PathBuf,
        /// The cache error.
        source: CacheError,
    },

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

impl PipelineError {
    /// Returns `true` for errors that put the cache's integrity at risk.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CacheOpen { .. } | Self::CacheWrite { .. })
    }
}
