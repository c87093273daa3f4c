//! Per-file load-or-parse with serial and parallel execution.

use std::io;
use std::sync::Mutex;

use quill_cache::{modified_time, ArtifactCache};
use quill_model::ParseArtifact;
use rayon::prelude::*;

use crate::collab::{is_force_parsed, GenerationVerifier, ParseInput, StructuralParser, Verdict};
use crate::enumerate::CandidateFile;
use crate::error::PipelineError;
use crate::observe::{EventSink, PipelineEvent};

/// Whether an outcome was parsed in this run or served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Parsed in this run.
    Changed,
    /// Loaded from a valid cache entry.
    Unchanged,
}

/// The result of processing one candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// Where the artifact came from.
    pub freshness: Freshness,
    /// The file's parse result.
    pub artifact: ParseArtifact,
}

impl PipelineOutcome {
    /// Returns `true` if the file was parsed in this run.
    pub fn is_changed(&self) -> bool {
        self.freshness == Freshness::Changed
    }
}

/// Holds the single error surfaced by a parallel run.
///
/// The first recorded error is kept, except that a fatal error replaces a
/// non-fatal one. Recorded errors are never dropped without a replacement.
#[derive(Debug, Default)]
pub struct ErrorSlot {
    inner: Mutex<Option<PipelineError>>,
}

impl ErrorSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers `err` to the slot.
    pub fn record(&self, err: PipelineError) {
        let mut slot = self.inner.lock().unwrap();
        match slot.as_ref() {
            None => *slot = Some(err),
            Some(kept) if !kept.is_fatal() && err.is_fatal() => *slot = Some(err),
            Some(_) => {}
        }
    }

    /// Returns `true` if an error has been recorded.
    pub fn is_set(&self) -> bool {
        self.inner.lock().unwrap().is_some()
    }

    /// Consumes the slot, returning the kept error.
    pub fn into_inner(self) -> Option<PipelineError> {
        self.inner.into_inner().unwrap()
    }
}

/// Turns candidate files into outcomes using the cache and the parser.
pub struct ParseOrchestrator<'a> {
    parser: &'a dyn StructuralParser,
    verifier: &'a dyn GenerationVerifier,
    sink: &'a dyn EventSink,
    marker: &'a str,
    force_parse: &'a [String],
    parse_documentation: bool,
}

impl<'a> ParseOrchestrator<'a> {
    /// Creates an orchestrator over the given collaborators.
    pub fn new(
        parser: &'a dyn StructuralParser,
        verifier: &'a dyn GenerationVerifier,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            parser,
            verifier,
            sink,
            marker: crate::collab::GENERATION_MARKER,
            force_parse: &[],
            parse_documentation: false,
        }
    }

    /// Sets the generated-file marker passed to the verifier.
    pub fn marker(mut self, marker: &'a str) -> Self {
        self.marker = marker;
        self
    }

    /// Sets the force-parse list.
    pub fn force_parse(mut self, names: &'a [String]) -> Self {
        self.force_parse = names;
        self
    }

    /// Sets whether documentation comments are captured.
    pub fn parse_documentation(mut self, enabled: bool) -> Self {
        self.parse_documentation = enabled;
        self
    }

    /// Processes `files` one at a time, stopping at the first error.
    pub fn run_serial(
        &self,
        files: &[CandidateFile],
        cache: &ArtifactCache,
    ) -> Result<Vec<PipelineOutcome>, PipelineError> {
        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            match self.process(file, cache) {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(err) => {
                    self.report_failure(file, &err);
                    return Err(err);
                }
            }
        }
        Ok(outcomes)
    }

    /// Processes `files` concurrently on `pool`, or on the global rayon
    /// pool when `pool` is `None`.
    ///
    /// Every file is processed even after a failure; the run fails
    /// afterwards if any error was recorded.
    pub fn run_parallel(
        &self,
        files: &[CandidateFile],
        cache: &ArtifactCache,
        pool: Option<&rayon::ThreadPool>,
    ) -> Result<Vec<PipelineOutcome>, PipelineError> {
        let slot = ErrorSlot::new();
        let work = || {
            files
                .par_iter()
                .filter_map(|file| match self.process(file, cache) {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        self.report_failure(file, &err);
                        slot.record(err);
                        None
                    }
                })
                .collect::<Vec<_>>()
        };
        let outcomes = match pool {
            Some(pool) => pool.install(work),
            None => work(),
        };

        match slot.into_inner() {
            Some(err) => Err(err),
            None => Ok(outcomes),
        }
    }

    /// Loads or parses a single file.
    ///
    /// Returns `Ok(None)` for files that contribute nothing: files that
    /// vanished since enumeration, generated files, and parser skips.
    pub fn process(
        &self,
        file: &CandidateFile,
        cache: &ArtifactCache,
    ) -> Result<Option<PipelineOutcome>, PipelineError> {
        let path = file.path.as_path();

        // Read the timestamp before the content so an edit racing this read
        // leaves a stale entry behind rather than a wrong one.
        let modified = modified_time(path);
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PipelineError::Io {
                    path: file.path.clone(),
                    source,
                })
            }
        };

        let forced = is_force_parsed(path, self.force_parse);
        match self
            .verifier
            .verify(&content, path, self.marker, self.force_parse)
        {
            Verdict::ConflictMarkers => {
                return Err(PipelineError::ConflictMarkers {
                    path: file.path.clone(),
                })
            }
            Verdict::AlreadyGenerated => {
                self.sink.emit(PipelineEvent::SkippedGenerated {
                    path: file.path.clone(),
                });
                return Ok(None);
            }
            Verdict::Approved => {}
        }

        if !forced {
            if let Some(artifact) = modified.and_then(|m| cache.lookup_at(path, m)) {
                return Ok(Some(PipelineOutcome {
                    freshness: Freshness::Unchanged,
                    artifact,
                }));
            }
        }

        let input = ParseInput {
            content: &content,
            path,
            module: file.module.as_deref(),
            parse_documentation: self.parse_documentation,
            force_parse: forced,
        };
        let parsed = self
            .parser
            .parse(&input)
            .map_err(|source| PipelineError::Parse {
                path: file.path.clone(),
                source,
            })?;
        let Some(mut artifact) = parsed else {
            return Ok(None);
        };
        artifact.modified = modified;

        match modified {
            Some(modified) => {
                cache
                    .store(path, &artifact, modified)
                    .map_err(|source| PipelineError::CacheWrite {
                        path: file.path.clone(),
                        source,
                    })?;
            }
            None => {
                tracing::debug!(path = %path.display(), "no modification time, not caching");
            }
        }

        Ok(Some(PipelineOutcome {
            freshness: Freshness::Changed,
            artifact,
        }))
    }

    fn report_failure(&self, file: &CandidateFile, err: &PipelineError) {
        self.sink.emit(PipelineEvent::FileFailed {
            path: file.path.clone(),
            message: err.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::observe::RecordingSink;
    use quill_cache::CacheError;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Parses `fail` as an error, `skip` as a skip, anything else as one artifact.
    struct StubParser {
        calls: AtomicUsize,
    }

    impl StubParser {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl StructuralParser for StubParser {
        fn extensions(&self) -> &[&str] {
            &["swift"]
        }

        fn parse(&self, input: &ParseInput<'_>) -> Result<Option<ParseArtifact>, ParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match input.content.trim() {
                "fail" => Err(ParseError::new("stub failure")),
                "skip" => Ok(None),
                _ => Ok(Some(ParseArtifact::empty(
                    input.path,
                    input.module.map(str::to_string),
                ))),
            }
        }
    }

    struct StubVerifier;

    impl GenerationVerifier for StubVerifier {
        fn verify(&self, content: &str, path: &Path, marker: &str, force: &[String]) -> Verdict {
            if content.starts_with("<<<<<<<") {
                Verdict::ConflictMarkers
            } else if content.starts_with(marker) && !is_force_parsed(path, force) {
                Verdict::AlreadyGenerated
            } else {
                Verdict::Approved
            }
        }
    }

    fn write(dir: &Path, name: &str, content: &str) -> CandidateFile {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        CandidateFile {
            path,
            module: Some("App".to_string()),
        }
    }

    fn pipe_error() -> PipelineError {
        PipelineError::Parse {
            path: PathBuf::from("A.swift"),
            source: ParseError::new("bad"),
        }
    }

    fn fatal_error() -> PipelineError {
        PipelineError::CacheWrite {
            path: PathBuf::from("B.swift"),
            source: CacheError::Serialization {
                reason: "disk".to_string(),
            },
        }
    }

    #[test]
    fn error_slot_keeps_first() {
        let slot = ErrorSlot::new();
        assert!(!slot.is_set());
        slot.record(pipe_error());
        slot.record(PipelineError::ConflictMarkers {
            path: PathBuf::from("C.swift"),
        });
        assert!(matches!(slot.into_inner(), Some(PipelineError::Parse { .. })));
    }

    #[test]
    fn error_slot_fatal_replaces_ordinary() {
        let slot = ErrorSlot::new();
        slot.record(pipe_error());
        slot.record(fatal_error());
        slot.record(pipe_error());
        assert!(matches!(
            slot.into_inner(),
            Some(PipelineError::CacheWrite { .. })
        ));
    }

    #[test]
    fn miss_parses_and_stores() {
        let src = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::open(cache_dir.path(), src.path(), "test").unwrap();
        let file = write(src.path(), "A.swift", "struct A {}");

        let parser = StubParser::new();
        let sink = RecordingSink::new();
        let orch = ParseOrchestrator::new(&parser, &StubVerifier, &sink);

        let first = orch.process(&file, &cache).unwrap().unwrap();
        assert!(first.is_changed());
        assert_eq!(first.artifact.module.as_deref(), Some("App"));
        assert!(first.artifact.modified.is_some());
        assert_eq!(cache.entry_count(), 1);

        let second = orch.process(&file, &cache).unwrap().unwrap();
        assert_eq!(second.freshness, Freshness::Unchanged);
        assert_eq!(second.artifact, first.artifact);
        assert_eq!(parser.calls(), 1);
    }

    #[test]
    fn force_parse_bypasses_cache_and_marker() {
        let src = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::open(cache_dir.path(), src.path(), "test").unwrap();
        let content = format!("{}\nstruct Mock {{}}", crate::collab::GENERATION_MARKER);
        let file = write(src.path(), "Mock.generated.swift", &content);

        let parser = StubParser::new();
        let sink = RecordingSink::new();
        let force = vec!["generated".to_string()];
        let orch = ParseOrchestrator::new(&parser, &StubVerifier, &sink).force_parse(&force);

        assert!(orch.process(&file, &cache).unwrap().unwrap().is_changed());
        assert!(orch.process(&file, &cache).unwrap().unwrap().is_changed());
        assert_eq!(parser.calls(), 2);
        assert_eq!(cache.entry_count(), 1);
    }

    #[test]
    fn generated_file_is_skipped_without_parsing() {
        let src = tempfile::tempdir().unwrap();
        let content = format!("{}\nstruct C {{}}", crate::collab::GENERATION_MARKER);
        let file = write(src.path(), "C.swift", &content);

        let parser = StubParser::new();
        let sink = RecordingSink::new();
        let orch = ParseOrchestrator::new(&parser, &StubVerifier, &sink);

        assert!(orch
            .process(&file, &ArtifactCache::disabled())
            .unwrap()
            .is_none());
        assert_eq!(parser.calls(), 0);
        assert_eq!(
            sink.events(),
            vec![PipelineEvent::SkippedGenerated { path: file.path }]
        );
    }

    #[test]
    fn vanished_file_is_skipped() {
        let parser = StubParser::new();
        let sink = RecordingSink::new();
        let orch = ParseOrchestrator::new(&parser, &StubVerifier, &sink);
        let file = CandidateFile {
            path: PathBuf::from("/nonexistent/Gone.swift"),
            module: None,
        };
        assert!(orch
            .process(&file, &ArtifactCache::disabled())
            .unwrap()
            .is_none());
    }

    #[test]
    fn parser_skip_yields_no_outcome() {
        let src = tempfile::tempdir().unwrap();
        let file = write(src.path(), "S.swift", "skip");
        let parser = StubParser::new();
        let sink = RecordingSink::new();
        let orch = ParseOrchestrator::new(&parser, &StubVerifier, &sink);
        assert!(orch
            .process(&file, &ArtifactCache::disabled())
            .unwrap()
            .is_none());
        assert_eq!(parser.calls(), 1);
    }

    #[test]
    fn serial_stops_at_first_error() {
        let src = tempfile::tempdir().unwrap();
        let files = vec![
            write(src.path(), "A.swift", "fail"),
            write(src.path(), "B.swift", "struct B {}"),
        ];
        let parser = StubParser::new();
        let sink = RecordingSink::new();
        let orch = ParseOrchestrator::new(&parser, &StubVerifier, &sink);

        let err = orch
            .run_serial(&files, &ArtifactCache::disabled())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
        assert_eq!(parser.calls(), 1);
        assert!(matches!(
            sink.events().as_slice(),
            [PipelineEvent::FileFailed { .. }]
        ));
    }

    #[test]
    fn parallel_finishes_siblings_then_fails() {
        let src = tempfile::tempdir().unwrap();
        let files: Vec<_> = (0..6)
            .map(|i| {
                let content = if i == 2 { "fail" } else { "struct X {}" };
                write(src.path(), &format!("F{i}.swift"), content)
            })
            .collect();
        let parser = StubParser::new();
        let sink = RecordingSink::new();
        let orch = ParseOrchestrator::new(&parser, &StubVerifier, &sink);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .unwrap();

        let err = orch
            .run_parallel(&files, &ArtifactCache::disabled(), Some(&pool))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
        assert_eq!(parser.calls(), 6);
    }

    #[test]
    fn parallel_matches_serial() {
        let src = tempfile::tempdir().unwrap();
        let files: Vec<_> = (0..10)
            .map(|i| write(src.path(), &format!("F{i}.swift"), "struct X {}"))
            .collect();
        let parser = StubParser::new();
        let sink = RecordingSink::new();
        let orch = ParseOrchestrator::new(&parser, &StubVerifier, &sink);
        let cache = ArtifactCache::disabled();

        let mut serial = orch.run_serial(&files, &cache).unwrap();
        let mut parallel = orch.run_parallel(&files, &cache, None).unwrap();
        serial.sort_by(|a, b| a.artifact.path.cmp(&b.artifact.path));
        parallel.sort_by(|a, b| a.artifact.path.cmp(&b.artifact.path));
        assert_eq!(serial, parallel);
    }

    #[test]
    fn conflict_marker_is_an_error() {
        let src = tempfile::tempdir().unwrap();
        let file = write(src.path(), "B.swift", "<<<<<<< HEAD\n");
        let parser = StubParser::new();
        let sink = RecordingSink::new();
        let orch = ParseOrchestrator::new(&parser, &StubVerifier, &sink);
        let err = orch
            .process(&file, &ArtifactCache::disabled())
            .unwrap_err();
        assert!(matches!(err, PipelineError::ConflictMarkers { .. }));
        assert_eq!(parser.calls(), 0);
    }

    #[test]
    fn store_failure_is_cache_write_error() {
        let src = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::open(cache_dir.path(), src.path(), "test").unwrap();
        fs::remove_dir_all(cache.dir().unwrap()).unwrap();
        let file = write(src.path(), "A.swift", "struct A {}");

        let parser = StubParser::new();
        let sink = RecordingSink::new();
        let orch = ParseOrchestrator::new(&parser, &StubVerifier, &sink);
        let err = orch.process(&file, &cache).unwrap_err();
        assert!(err.is_fatal());
    }
}
