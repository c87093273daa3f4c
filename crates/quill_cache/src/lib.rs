//! Persistent cache of per-file parse artifacts.
//!
//! This crate stores each file's [`ParseArtifact`](quill_model::ParseArtifact)
//! in a per-root directory, keyed by a fingerprint of the file's path and
//! invalidated by its modification time, so unchanged files are not reparsed
//! on the next run.

#![warn(missing_docs)]

pub mod artifact;
pub mod cache;
pub mod error;

pub use artifact::ArtifactStore;
pub use cache::{modified_time, ArtifactCache, CacheEntry};
pub use error::CacheError;
