//! Project discovery and merging of `quill.toml` with command-line flags.

use std::path::{Path, PathBuf};

use quill_config::{load_config, resolve_scan, ConfigError, ResolvedScan, CONFIG_FILE};
use quill_parse::{PipelineOptions, ScanRequest};

use crate::{GlobalArgs, ScanArgs};

/// Walks up from `start` looking for the nearest directory containing `quill.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Loads the project configuration, if there is one.
///
/// With `--config`, the named file (or the `quill.toml` in the named
/// directory) must exist. Without it, the nearest `quill.toml` above the
/// current directory is used when present.
pub fn load_project(global: &GlobalArgs) -> Result<Option<ResolvedScan>, Box<dyn std::error::Error>> {
    let dir = match &global.config {
        Some(path) => {
            let p = PathBuf::from(path);
            if p.is_file() {
                p.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."))
            } else {
                p
            }
        }
        None => match find_project_root(&std::env::current_dir()?) {
            Some(dir) => dir,
            None => return Ok(None),
        },
    };
    let config = load_config(&dir)?;
    tracing::debug!(dir = %dir.display(), "loaded {CONFIG_FILE}");
    Ok(Some(resolve_scan(&config, &dir)))
}

/// Applies command-line overrides on top of the project configuration.
///
/// Sources given on the command line replace the configured roots and their
/// modules. `--module` names the effective roots in order. Exclusions and
/// force-parse names are added to the configured ones; switches turn
/// features on; values replace configured values.
pub fn merge_scan(
    project: Option<ResolvedScan>,
    args: &ScanArgs,
    global: &GlobalArgs,
) -> Result<(ScanRequest, PipelineOptions), ConfigError> {
    let project = project.unwrap_or_else(empty_scan);

    let mut roots: Vec<PathBuf> = project.roots.iter().map(|(p, _)| p.clone()).collect();
    let mut modules: Option<Vec<String>> = project
        .roots
        .iter()
        .map(|(_, m)| m.clone())
        .collect::<Option<Vec<_>>>();
    if !args.sources.is_empty() {
        roots = args.sources.iter().map(PathBuf::from).collect();
        modules = None;
    }
    if !args.modules.is_empty() {
        modules = Some(args.modules.clone());
    }

    if roots.is_empty() {
        return Err(ConfigError::MissingField("scan.sources".to_string()));
    }
    if let Some(modules) = &modules {
        if modules.len() != roots.len() {
            return Err(ConfigError::ValidationError(format!(
                "{} module names given for {} sources",
                modules.len(),
                roots.len()
            )));
        }
    }
    let threads = args.threads.or(project.threads);
    if threads == Some(0) {
        return Err(ConfigError::ValidationError(
            "threads must be at least 1".to_string(),
        ));
    }

    let mut exclude = project.exclude;
    exclude.extend(args.exclude.iter().map(PathBuf::from));
    let mut force_parse = project.force_parse;
    force_parse.extend(args.force_parse.iter().cloned());

    let request = ScanRequest::new(roots, modules).exclude(exclude);
    let options = PipelineOptions {
        serial: args.serial || project.serial,
        threads,
        cache_disabled: args.disable_cache || project.cache_disabled,
        cache_base: args.cache_path.as_ref().map(PathBuf::from).or(project.cache_base),
        force_parse,
        parse_documentation: args.parse_documentation || project.parse_documentation,
        keep_raw: false,
        verbose: global.verbose,
        ..PipelineOptions::default()
    };
    Ok((request, options))
}

fn empty_scan() -> ResolvedScan {
    ResolvedScan {
        roots: Vec::new(),
        exclude: Vec::new(),
        force_parse: Vec::new(),
        parse_documentation: false,
        serial: false,
        threads: None,
        cache_disabled: false,
        cache_base: None,
    }
}
