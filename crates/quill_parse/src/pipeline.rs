//! The run facade: roots in, [`ScanReport`] out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use quill_cache::ArtifactCache;

use crate::aggregate::{ResultAggregator, ScanReport};
use crate::collab::{Composer, GenerationVerifier, StructuralParser, GENERATION_MARKER};
use crate::enumerate::{FileEnumerator, SourceRoot};
use crate::error::PipelineError;
use crate::observe::{Clock, EventSink, PipelineEvent, SystemClock, TracingSink};
use crate::orchestrate::ParseOrchestrator;

/// Version stamped into cache entries. Entries from other versions miss.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// What to scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRequest {
    /// Source roots, processed in order.
    pub roots: Vec<SourceRoot>,
    /// Files and directories excluded from every root.
    pub exclude: Vec<PathBuf>,
}

impl ScanRequest {
    /// Creates a request from root paths and optional module names.
    ///
    /// # Panics
    ///
    /// Panics if `modules` is given with a different length than `paths`.
    pub fn new(paths: Vec<PathBuf>, modules: Option<Vec<String>>) -> Self {
        Self {
            roots: SourceRoot::zip(paths, modules),
            exclude: Vec::new(),
        }
    }

    /// Sets the exclusion list.
    pub fn exclude(mut self, exclude: Vec<PathBuf>) -> Self {
        self.exclude = exclude;
        self
    }
}

/// How to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Process files one at a time in enumeration order.
    pub serial: bool,
    /// Worker threads for parallel mode; the global rayon pool when `None`.
    pub threads: Option<usize>,
    /// Never read or write the artifact cache.
    pub cache_disabled: bool,
    /// Base directory of the per-root caches; the platform default when `None`.
    pub cache_base: Option<PathBuf>,
    /// Names of files that are always parsed.
    pub force_parse: Vec<String>,
    /// Capture `///` documentation.
    pub parse_documentation: bool,
    /// Keep a copy of the merged model in the report.
    pub keep_raw: bool,
    /// List changed files however many there are.
    pub verbose: bool,
    /// Header identifying generated files.
    pub marker: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            serial: false,
            threads: None,
            cache_disabled: false,
            cache_base: None,
            force_parse: Vec::new(),
            parse_documentation: false,
            keep_raw: false,
            verbose: false,
            marker: GENERATION_MARKER.to_string(),
        }
    }
}

/// A configured scanner.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use quill_parse::{Pipeline, PipelineOptions, ScanRequest, StructuralParser, GenerationVerifier, Composer};
/// # fn demo(parser: Arc<dyn StructuralParser>, verifier: Arc<dyn GenerationVerifier>, composer: Arc<dyn Composer>) {
/// let pipeline = Pipeline::new(parser, verifier, composer).with_options(PipelineOptions::default());
/// let report = pipeline.run(&ScanRequest::new(vec!["Sources".into()], None)).unwrap();
/// println!("{} types", report.model.types.len());
/// # }
/// ```
pub struct Pipeline {
    parser: Arc<dyn StructuralParser>,
    verifier: Arc<dyn GenerationVerifier>,
    composer: Arc<dyn Composer>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    options: PipelineOptions,
}

impl Pipeline {
    /// Creates a pipeline with default options, the system clock and a
    /// `tracing` event sink.
    pub fn new(
        parser: Arc<dyn StructuralParser>,
        verifier: Arc<dyn GenerationVerifier>,
        composer: Arc<dyn Composer>,
    ) -> Self {
        Self {
            parser,
            verifier,
            composer,
            clock: Arc::new(SystemClock::new()),
            sink: Arc::new(TracingSink),
            options: PipelineOptions::default(),
        }
    }

    /// Replaces the options.
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The active options.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Runs one scan.
    ///
    /// Roots are processed one after another; files within a root are
    /// processed serially or in parallel according to the options. Any
    /// hard error fails the whole run and no report is produced.
    pub fn run(&self, request: &ScanRequest) -> Result<ScanReport, PipelineError> {
        let started = self.clock.now();
        self.sink.emit(PipelineEvent::ScanStarted {
            roots: request.roots.len(),
        });

        let pool = self.build_pool()?;
        let mut enumerator = FileEnumerator::new(self.parser.extensions(), &request.exclude)?;
        let orchestrator =
            ParseOrchestrator::new(self.parser.as_ref(), self.verifier.as_ref(), self.sink.as_ref())
                .marker(&self.options.marker)
                .force_parse(&self.options.force_parse)
                .parse_documentation(self.options.parse_documentation);

        let mut outcomes = Vec::new();
        let mut total_files = 0;
        for root in &request.roots {
            let files = enumerator.candidates(root)?;
            total_files += files.len();
            self.sink.emit(PipelineEvent::RootEnumerated {
                root: root.path.clone(),
                candidates: files.len(),
            });

            let cache = self.cache_for(&root.path)?;
            let root_outcomes = if self.options.serial {
                orchestrator.run_serial(&files, &cache)?
            } else {
                orchestrator.run_parallel(&files, &cache, pool.as_ref())?
            };
            outcomes.extend(root_outcomes);
        }

        let report = ResultAggregator::new(
            self.composer.as_ref(),
            self.clock.as_ref(),
            self.sink.as_ref(),
        )
        .keep_raw(self.options.keep_raw)
        .verbose(self.options.verbose)
        .aggregate(outcomes, total_files, started);
        Ok(report)
    }

    fn build_pool(&self) -> Result<Option<rayon::ThreadPool>, PipelineError> {
        match self.options.threads {
            Some(threads) if !self.options.serial => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map(Some)
                .map_err(|e| PipelineError::ThreadPool(e.to_string())),
            _ => Ok(None),
        }
    }

    fn cache_for(&self, root: &Path) -> Result<ArtifactCache, PipelineError> {
        if self.options.cache_disabled {
            return Ok(ArtifactCache::disabled());
        }
        let base = cache_base(self.options.cache_base.as_deref());
        ArtifactCache::open(&base, root, TOOL_VERSION).map_err(|source| PipelineError::CacheOpen {
            root: root.to_path_buf(),
            source,
        })
    }
}

/// Removes the cached artifacts of each root. Returns the entries removed.
///
/// Roots without a cache directory are skipped.
pub fn clear_caches(base: Option<&Path>, roots: &[PathBuf]) -> Result<usize, PipelineError> {
    let base = cache_base(base);
    let mut removed = 0;
    for root in roots {
        if !ArtifactCache::dir_for_root(&base, root).is_dir() {
            continue;
        }
        let cache = ArtifactCache::open(&base, root, TOOL_VERSION).map_err(|source| {
            PipelineError::CacheOpen {
                root: root.clone(),
                source,
            }
        })?;
        removed += cache.clear().map_err(|source| PipelineError::CacheClear {
            root: root.clone(),
            source,
        })?;
    }
    Ok(removed)
}

fn cache_base(configured: Option<&Path>) -> PathBuf {
    configured
        .map(Path::to_path_buf)
        .unwrap_or_else(ArtifactCache::default_base_dir)
}
