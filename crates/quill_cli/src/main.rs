//! Quill CLI: scans Swift sources into a declaration model.
//!
//! Provides `quill scan` to run the incremental scan pipeline and print the
//! result, and `quill clean` to drop the cached parse artifacts of a set of
//! source roots.

#![warn(missing_docs)]

mod clean;
mod project;
mod scan;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Quill: incremental, cache-aware source scanning.
#[derive(Parser, Debug)]
#[command(name = "quill", version, about = "Quill source scanner")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `quill.toml` file or the directory containing it.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan source roots and print the resulting model.
    Scan(ScanArgs),
    /// Remove cached parse artifacts.
    Clean(CleanArgs),
}

/// Arguments for the `quill scan` subcommand.
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Files or directories to scan. Replaces `scan.sources` from the config.
    pub sources: Vec<String>,

    /// Module name for each source, in order.
    #[arg(short, long = "module")]
    pub modules: Vec<String>,

    /// Files or directories to leave out.
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// File names that are parsed even when generated or cached.
    #[arg(long)]
    pub force_parse: Vec<String>,

    /// Parse files one at a time.
    #[arg(long)]
    pub serial: bool,

    /// Worker threads for parallel parsing.
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Neither read nor write the artifact cache.
    #[arg(long)]
    pub disable_cache: bool,

    /// Base directory for the artifact cache.
    #[arg(long)]
    pub cache_path: Option<String>,

    /// Capture `///` documentation comments.
    #[arg(long)]
    pub parse_documentation: bool,

    /// Output format for the result.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `quill clean` subcommand.
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Roots whose caches are removed. Defaults to `scan.sources`.
    pub sources: Vec<String>,

    /// Base directory for the artifact cache.
    #[arg(long)]
    pub cache_path: Option<String>,
}

/// Output format for scan results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable summary.
    Text,
    /// The full report as JSON.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a config file or its directory.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Scan(ref args) => scan::run(args, &global),
        Command::Clean(ref args) => clean::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug output,
/// `--quiet` errors only, and the default is info.
fn init_logging(quiet: bool, verbose: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
