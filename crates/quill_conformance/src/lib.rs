//! Scenario test helpers for the Quill scan pipeline.
//!
//! Provides an on-disk [`Fixture`] project with its own cache directory, a
//! [`CountingParser`] that records how often the Swift scanner actually ran,
//! and [`Harness`], which wires both into a [`Pipeline`] with the reference
//! Swift collaborators, a fixed clock and a recording event sink.

#![warn(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use quill_cache::{modified_time, ArtifactCache};
use quill_model::ParseArtifact;
use quill_parse::{
    ManualClock, ParseError, ParseInput, Pipeline, PipelineError, PipelineEvent, PipelineOptions,
    RecordingSink, ScanReport, ScanRequest, StructuralParser, TOOL_VERSION,
};
use quill_swift::{DeclarationScanner, ExtensionComposer, MarkerVerifier};
use tempfile::TempDir;

/// A [`DeclarationScanner`] that counts its invocations.
#[derive(Debug, Default)]
pub struct CountingParser {
    inner: DeclarationScanner,
    calls: AtomicUsize,
    parsed: Mutex<Vec<PathBuf>>,
}

impl CountingParser {
    /// Creates a parser with a zero count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `parse` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Paths passed to `parse`, in call order, draining the record.
    pub fn take_parsed(&self) -> Vec<PathBuf> {
        self.calls.store(0, Ordering::SeqCst);
        std::mem::take(&mut *self.parsed.lock().unwrap())
    }
}

impl StructuralParser for CountingParser {
    fn extensions(&self) -> &[&str] {
        self.inner.extensions()
    }

    fn parse(&self, input: &ParseInput<'_>) -> Result<Option<ParseArtifact>, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.parsed.lock().unwrap().push(input.path.to_path_buf());
        self.inner.parse(input)
    }
}

/// A temporary source tree with a separate cache directory.
pub struct Fixture {
    src: TempDir,
    cache: TempDir,
}

impl Fixture {
    /// Creates empty source and cache directories.
    pub fn new() -> Self {
        Self {
            src: TempDir::new().unwrap(),
            cache: TempDir::new().unwrap(),
        }
    }

    /// The source root.
    pub fn root(&self) -> PathBuf {
        self.src.path().to_path_buf()
    }

    /// Absolute path of `rel` under the source root.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.src.path().join(rel)
    }

    /// The cache base directory.
    pub fn cache_base(&self) -> &Path {
        self.cache.path()
    }

    /// Writes `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Writes raw `bytes` to `rel`, creating parent directories.
    pub fn write_bytes(&self, rel: &str, bytes: &[u8]) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        path
    }

    /// Moves the modification time of `rel` forward without touching its content.
    pub fn bump_mtime(&self, rel: &str) {
        let path = self.path(rel);
        let current = modified_time(&path).unwrap_or_else(SystemTime::now);
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(current + Duration::from_secs(5)).unwrap();
    }

    /// The cache entry file that belongs to `rel` under the fixture root.
    pub fn cache_entry(&self, rel: &str) -> PathBuf {
        let cache = ArtifactCache::open(self.cache_base(), &self.root(), TOOL_VERSION).unwrap();
        cache.entry_path(&self.path(rel)).unwrap()
    }

    /// Options that cache into this fixture's cache directory.
    pub fn options(&self) -> PipelineOptions {
        PipelineOptions {
            cache_base: Some(self.cache.path().to_path_buf()),
            ..PipelineOptions::default()
        }
    }

    /// A request scanning the whole fixture root.
    pub fn request(&self) -> ScanRequest {
        ScanRequest::new(vec![self.root()], None)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A pipeline over the Swift collaborators with observable parsing and events.
pub struct Harness {
    /// The parser the pipeline uses.
    pub parser: Arc<CountingParser>,
    /// The sink the pipeline reports to.
    pub sink: Arc<RecordingSink>,
    pipeline: Pipeline,
}

impl Harness {
    /// Builds a harness with `options`.
    pub fn new(options: PipelineOptions) -> Self {
        let parser = Arc::new(CountingParser::new());
        let sink = Arc::new(RecordingSink::new());
        let pipeline = Pipeline::new(
            parser.clone(),
            Arc::new(MarkerVerifier),
            Arc::new(ExtensionComposer),
        )
        .with_options(options)
        .with_clock(Arc::new(ManualClock::new(Duration::from_millis(1))))
        .with_sink(sink.clone());
        Self {
            parser,
            sink,
            pipeline,
        }
    }

    /// Runs one scan.
    pub fn run(&self, request: &ScanRequest) -> Result<ScanReport, PipelineError> {
        self.pipeline.run(request)
    }

    /// Paths reported as failed since the last call.
    pub fn failed_paths(&self) -> Vec<PathBuf> {
        self.sink
            .take_all()
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::FileFailed { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }
}

/// A Swift file's text with the generated-file header prepended.
pub fn generated(body: &str) -> String {
    format!("{}\n{body}", quill_parse::GENERATION_MARKER)
}

/// A Swift file's text with an unresolved merge conflict.
pub fn conflicted(name: &str) -> String {
    format!(
        "struct {name} {{\n<<<<<<< HEAD\n    let a: Int\n=======\n    let b: Int\n>>>>>>> feature\n}}\n"
    )
}
