//! Collaborator seams of the pipeline.
//!
//! The pipeline does not know the scanned language. It asks a
//! [`StructuralParser`] for per-file artifacts, a [`GenerationVerifier`]
//! whether a file may be parsed at all, and a [`Composer`] to resolve the
//! merged declarations into the final model. All three are shared across
//! worker threads.

use std::path::Path;

use quill_model::{ComposedModel, MergedModel, ParseArtifact};

use crate::error::ParseError;

/// Marker written at the top of every generated file.
pub const GENERATION_MARKER: &str = "// Generated using Sourcery";

/// Everything a structural parser needs to parse one file.
#[derive(Debug, Clone, Copy)]
pub struct ParseInput<'a> {
    /// The file's text.
    pub content: &'a str,
    /// The file's path, as enumerated.
    pub path: &'a Path,
    /// The module of the file's root, if one was declared.
    pub module: Option<&'a str>,
    /// Whether `///` documentation should be captured.
    pub parse_documentation: bool,
    /// Whether the file is on the force-parse list.
    pub force_parse: bool,
}

/// Parses a source file into a [`ParseArtifact`].
pub trait StructuralParser: Send + Sync {
    /// File extensions (without the dot) this parser accepts.
    fn extensions(&self) -> &[&str];

    /// Parses one file.
    ///
    /// Returns `Ok(None)` when the file should contribute nothing, e.g. a
    /// generated file that is not force-parsed.
    fn parse(&self, input: &ParseInput<'_>) -> Result<Option<ParseArtifact>, ParseError>;
}

/// Outcome of checking a file's content before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The file contains unresolved merge conflict markers.
    ConflictMarkers,
    /// The file is generated output and must not be scanned.
    AlreadyGenerated,
    /// The file may be parsed.
    Approved,
}

/// Screens file content before any cache lookup or parse.
pub trait GenerationVerifier: Send + Sync {
    /// Classifies `content`.
    ///
    /// `marker` is the generated-file header and `force_parse` the names
    /// that must be parsed even when generated.
    fn verify(&self, content: &str, path: &Path, marker: &str, force_parse: &[String]) -> Verdict;
}

/// Resolves merged declarations into the final model.
///
/// Implementations must not depend on the order of `merged`'s contents.
pub trait Composer: Send + Sync {
    /// Deduplicates and links the declarations of `merged`.
    fn compose(&self, merged: MergedModel) -> ComposedModel;
}

/// Returns `true` if `path` is named by the force-parse list.
///
/// A file matches an entry when its file name equals the entry or its stem
/// ends with `.<entry>`, so `generated` matches `User.generated.swift`.
pub fn is_force_parsed(path: &Path, force_parse: &[String]) -> bool {
    if force_parse.is_empty() {
        return false;
    }
    let name = path.file_name().and_then(|n| n.to_str());
    let stem = path.file_stem().and_then(|s| s.to_str());
    force_parse.iter().any(|entry| {
        name == Some(entry.as_str())
            || stem.is_some_and(|s| {
                s.len() > entry.len()
                    && s.ends_with(entry.as_str())
                    && s[..s.len() - entry.len()].ends_with('.')
            })
    })
}
