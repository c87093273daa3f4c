//! Time and event reporting seams.
//!
//! The pipeline never reads the wall clock or calls `tracing` directly: it
//! measures phases through a [`Clock`] and reports progress as
//! [`PipelineEvent`]s to an [`EventSink`]. [`SystemClock`] and
//! [`TracingSink`] are the production defaults; [`ManualClock`] and
//! [`RecordingSink`] make runs observable in tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Changed-file lists at or above this length are only logged verbosely.
pub const CHANGED_LIST_LIMIT: usize = 50;

/// A monotonic time source.
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Monotonic clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that advances by a fixed step on every reading.
///
/// With a zero step it always reports the same time.
#[derive(Debug)]
pub struct ManualClock {
    nanos: AtomicU64,
    step: u64,
}

impl ManualClock {
    /// Creates a clock at zero that advances by `step` per reading.
    pub fn new(step: Duration) -> Self {
        Self {
            nanos: AtomicU64::new(0),
            step: u64::try_from(step.as_nanos()).unwrap_or(u64::MAX),
        }
    }

    /// Creates a clock that never advances.
    pub fn fixed() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(by, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.fetch_add(self.step, Ordering::Relaxed))
    }
}

/// Durations of the phases of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    /// Enumeration, cache lookups and parsing across all roots.
    pub load_or_parse: Duration,
    /// Folding artifacts into the merged model.
    pub reduce: Duration,
    /// The composer.
    pub compose: Duration,
    /// The whole run.
    pub total: Duration,
}

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A run started over the given number of roots.
    ScanStarted {
        /// Number of source roots.
        roots: usize,
    },
    /// A root was enumerated.
    RootEnumerated {
        /// The root path.
        root: PathBuf,
        /// Candidate files found under it.
        candidates: usize,
    },
    /// A file was skipped because it is generated output.
    SkippedGenerated {
        /// The skipped file.
        path: PathBuf,
    },
    /// A file failed with a hard error.
    FileFailed {
        /// The failing file.
        path: PathBuf,
        /// Rendered error.
        message: String,
    },
    /// Summary of a successful run.
    Completed {
        /// Types in the composed model.
        types: usize,
        /// Files that contributed an artifact.
        files: usize,
        /// Files that were parsed rather than served from cache.
        changed: usize,
    },
    /// The files parsed in this run.
    ChangedFiles {
        /// Changed file paths.
        files: Vec<PathBuf>,
    },
    /// Phase durations of a successful run.
    Timings(PhaseTimings),
}

/// Receives pipeline events. Shared across worker threads.
pub trait EventSink: Send + Sync {
    /// Handles one event.
    fn emit(&self, event: PipelineEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::ScanStarted { roots } => {
                tracing::debug!(roots, "scan started");
            }
            PipelineEvent::RootEnumerated { root, candidates } => {
                tracing::debug!(root = %root.display(), candidates, "root enumerated");
            }
            PipelineEvent::SkippedGenerated { path } => {
                tracing::trace!(path = %path.display(), "skipping generated file");
            }
            PipelineEvent::FileFailed { path, message } => {
                tracing::error!(path = %path.display(), "{message}");
            }
            PipelineEvent::Completed {
                types,
                files,
                changed,
            } => {
                tracing::info!("Found {types} types in {files} files, {changed} changed from last run.");
            }
            PipelineEvent::ChangedFiles { files } => {
                let listing = files
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join("\n");
                tracing::info!("Files changed:\n{listing}");
            }
            PipelineEvent::Timings(t) => {
                tracing::debug!(
                    load_or_parse = ?t.load_or_parse,
                    reduce = ?t.reduce,
                    compose = ?t.compose,
                    total = ?t.total,
                    "phase timings"
                );
            }
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Takes all recorded events, leaving the sink empty.
    pub fn take_all(&self) -> Vec<PipelineEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: PipelineEvent) {
        self.events.lock().unwrap().push(event);
    }
}
