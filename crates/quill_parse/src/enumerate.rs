//! Expansion of source roots into candidate files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::PipelineError;

/// A path to scan, optionally tagged with a module name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoot {
    /// A file or directory.
    pub path: PathBuf,
    /// Module name inherited by every file under this root.
    pub module: Option<String>,
}

impl SourceRoot {
    /// Creates a root without a module.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            module: None,
        }
    }

    /// Creates a root tagged with `module`.
    pub fn with_module(path: impl Into<PathBuf>, module: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            module: Some(module.into()),
        }
    }

    /// Pairs paths with module names positionally.
    ///
    /// # Panics
    ///
    /// Panics if `modules` is given and its length differs from `paths`.
    /// Callers validate user input before reaching this point.
    pub fn zip(paths: Vec<PathBuf>, modules: Option<Vec<String>>) -> Vec<Self> {
        match modules {
            None => paths.into_iter().map(Self::new).collect(),
            Some(modules) => {
                assert_eq!(
                    paths.len(),
                    modules.len(),
                    "module names must be provided for every source root"
                );
                paths
                    .into_iter()
                    .zip(modules)
                    .map(|(path, module)| Self::with_module(path, module))
                    .collect()
            }
        }
    }
}

/// A source file selected for scanning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateFile {
    /// The file's path, as produced by walking its root.
    pub path: PathBuf,
    /// The module of the root it came from.
    pub module: Option<String>,
}

/// Expands roots into candidate files, one root at a time.
///
/// Files already returned for an earlier root are not returned again, so a
/// file reachable from two roots is scanned once, with the first root's
/// module.
#[derive(Debug)]
pub struct FileEnumerator {
    extensions: Vec<String>,
    excluded: HashSet<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl FileEnumerator {
    /// Creates an enumerator accepting files with one of `extensions`.
    ///
    /// Excluded directories are expanded eagerly into the files they
    /// contain; excluded files are taken as-is.
    pub fn new<S: AsRef<str>>(
        extensions: &[S],
        exclude: &[PathBuf],
    ) -> Result<Self, PipelineError> {
        let mut excluded = HashSet::new();
        for path in exclude {
            if path.is_dir() {
                excluded.extend(walk_files(path)?);
            } else {
                excluded.insert(path.clone());
            }
        }
        Ok(Self {
            extensions: extensions.iter().map(|e| e.as_ref().to_string()).collect(),
            excluded,
            seen: HashSet::new(),
        })
    }

    /// Number of files in the expanded exclusion set.
    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }

    /// Returns the candidate files of `root` in stable order.
    pub fn candidates(&mut self, root: &SourceRoot) -> Result<Vec<CandidateFile>, PipelineError> {
        let files = if root.path.is_dir() {
            walk_files(&root.path)?
        } else {
            vec![root.path.clone()]
        };

        let mut out = Vec::new();
        for path in files {
            if !self.is_source_file(&path) || self.excluded.contains(&path) {
                continue;
            }
            if !self.seen.insert(path.clone()) {
                continue;
            }
            out.push(CandidateFile {
                path,
                module: root.module.clone(),
            });
        }
        Ok(out)
    }

    /// Enumerates every root in order.
    pub fn candidates_all(
        &mut self,
        roots: &[SourceRoot],
    ) -> Result<Vec<CandidateFile>, PipelineError> {
        let mut out = Vec::new();
        for root in roots {
            out.extend(self.candidates(root)?);
        }
        Ok(out)
    }

    fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

/// Recursively lists the regular files under `dir`, sorted by file name.
fn walk_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(dir).to_path_buf();
            PipelineError::Io {
                path,
                source: err.into(),
            }
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
