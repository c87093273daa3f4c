//! `quill clean`: remove cached parse artifacts.

use std::path::PathBuf;

use quill_parse::clear_caches;

use crate::project::load_project;
use crate::{CleanArgs, GlobalArgs};

/// Runs the `quill clean` command.
///
/// Clears the caches of the roots given on the command line, or of the
/// configured roots when none are given.
pub fn run(args: &CleanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = if args.sources.is_empty() || args.cache_path.is_none() {
        load_project(global)?
    } else {
        None
    };

    let roots: Vec<PathBuf> = if args.sources.is_empty() {
        project
            .as_ref()
            .map(|p| p.roots.iter().map(|(path, _)| path.clone()).collect())
            .unwrap_or_default()
    } else {
        args.sources.iter().map(PathBuf::from).collect()
    };
    if roots.is_empty() {
        return Err("no sources to clean: pass them or configure scan.sources".into());
    }

    let base = args
        .cache_path
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| project.and_then(|p| p.cache_base));
    let removed = clear_caches(base.as_deref(), &roots)?;
    if !global.quiet {
        println!("Removed {removed} cached artifacts from {} roots", roots.len());
    }
    Ok(0)
}
