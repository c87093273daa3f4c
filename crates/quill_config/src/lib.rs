//! Parsing and validation of `quill.toml` scan configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`QuillConfig`], then resolves its relative paths into a [`ResolvedScan`]
//! ready to drive a pipeline run.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_scan, ResolvedScan};
pub use types::*;
