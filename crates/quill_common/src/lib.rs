//! Shared foundational types used across the Quill workspace.
//!
//! This crate provides the hashing primitives every other crate builds on:
//! payload checksums for cache integrity and stable path fingerprints for
//! cache keys.

#![warn(missing_docs)]

pub mod hash;

pub use hash::{ContentHash, Fingerprint};
