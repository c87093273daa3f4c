//! Per-file parse results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::decl::{Function, TypeAlias, TypeDecl};

/// The byte range of an inline region's body within its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineRange {
    /// Byte offset of the first byte after the opening marker line.
    pub offset: usize,
    /// Length of the region body in bytes.
    pub length: usize,
}

/// The structural parse result for one source file.
///
/// Produced by a structural parser or loaded from the artifact cache.
/// `modified` records the file's modification time when it was parsed and
/// is what cache validity is checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseArtifact {
    /// The parsed file.
    pub path: PathBuf,
    /// The module the file belongs to, if one was declared for its root.
    pub module: Option<String>,
    /// Types and extensions declared in the file.
    pub types: Vec<TypeDecl>,
    /// Free functions declared in the file.
    pub functions: Vec<Function>,
    /// Type aliases declared in the file.
    pub typealiases: Vec<TypeAlias>,
    /// Inline regions keyed by region name.
    pub inline_ranges: BTreeMap<String, InlineRange>,
    /// Leading whitespace of each inline region's opening marker.
    pub inline_indentations: BTreeMap<String, String>,
    /// The file's modification time at parse time.
    pub modified: Option<SystemTime>,
}

impl ParseArtifact {
    /// Creates an empty artifact for the given file.
    pub fn empty(path: impl Into<PathBuf>, module: Option<String>) -> Self {
        Self {
            path: path.into(),
            module,
            types: Vec::new(),
            functions: Vec::new(),
            typealiases: Vec::new(),
            inline_ranges: BTreeMap::new(),
            inline_indentations: BTreeMap::new(),
            modified: None,
        }
    }

    /// Returns the inline-region metadata of this artifact.
    pub fn inline_regions(&self) -> InlineRegions {
        InlineRegions {
            file: self.path.clone(),
            ranges: self.inline_ranges.clone(),
            indentations: self.inline_indentations.clone(),
        }
    }
}

/// Inline-region metadata of one file, used for in-place code insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineRegions {
    /// The file the regions belong to.
    pub file: PathBuf,
    /// Region body ranges keyed by region name.
    pub ranges: BTreeMap<String, InlineRange>,
    /// Region indentation keyed by region name.
    pub indentations: BTreeMap<String, String>,
}
