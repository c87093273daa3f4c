//! Scan resolution: turning configured strings into concrete paths.

use crate::types::QuillConfig;
use std::path::{Path, PathBuf};

/// A configuration with every path resolved against the config file's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScan {
    /// Source roots, each paired with its module name.
    pub roots: Vec<(PathBuf, Option<String>)>,
    /// Excluded files and directories.
    pub exclude: Vec<PathBuf>,
    /// Force-parse names.
    pub force_parse: Vec<String>,
    /// Whether documentation comments are captured.
    pub parse_documentation: bool,
    /// Serial execution.
    pub serial: bool,
    /// Worker thread count for parallel mode.
    pub threads: Option<usize>,
    /// Whether the cache is disabled.
    pub cache_disabled: bool,
    /// Base directory for per-root caches, if configured.
    pub cache_base: Option<PathBuf>,
}

/// Resolves a validated configuration against `base_dir`.
///
/// Relative paths are joined onto `base_dir`; absolute paths are kept.
/// Module names are paired with roots positionally; the loader has
/// already checked that the counts agree.
pub fn resolve_scan(config: &QuillConfig, base_dir: &Path) -> ResolvedScan {
    let roots = config
        .scan
        .sources
        .iter()
        .enumerate()
        .map(|(i, source)| {
            let module = config
                .scan
                .modules
                .as_ref()
                .and_then(|modules| modules.get(i).cloned());
            (base_dir.join(source), module)
        })
        .collect();

    ResolvedScan {
        roots,
        exclude: config.scan.exclude.iter().map(|p| base_dir.join(p)).collect(),
        force_parse: config.scan.force_parse.clone(),
        parse_documentation: config.scan.parse_documentation,
        serial: config.parallel.serial,
        threads: config.parallel.threads,
        cache_disabled: config.cache.disabled,
        cache_base: config.cache.base_path.as_ref().map(|p| base_dir.join(p)),
    }
}
