//! `quill scan`: run the scan pipeline and print the result.

use std::sync::Arc;

use quill_parse::{Pipeline, ScanReport};
use quill_swift::{DeclarationScanner, ExtensionComposer, MarkerVerifier};

use crate::project::{load_project, merge_scan};
use crate::{GlobalArgs, ReportFormat, ScanArgs};

/// Runs the `quill scan` command.
///
/// Returns exit code 0 on success; every pipeline failure is an error.
pub fn run(args: &ScanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let (request, options) = merge_scan(project, args, global)?;

    let pipeline = Pipeline::new(
        Arc::new(DeclarationScanner),
        Arc::new(MarkerVerifier),
        Arc::new(ExtensionComposer),
    )
    .with_options(options);
    let report = pipeline.run(&request)?;

    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        ReportFormat::Text => {
            if !global.quiet {
                println!("{}", summary(&report));
            }
        }
    }
    Ok(0)
}

/// One-line human-readable summary of a report.
fn summary(report: &ScanReport) -> String {
    format!(
        "Scanned {} files ({} changed): {} types, {} functions, {} type aliases",
        report.total_files,
        report.changed_count(),
        report.model.types.len(),
        report.model.functions.len(),
        report.model.typealiases.len(),
    )
}
