//! Folding outcomes into the run's report.

use std::path::PathBuf;
use std::time::Duration;

use quill_model::{ComposedModel, InlineRegions, MergedModel};
use serde::Serialize;

use crate::collab::Composer;
use crate::observe::{Clock, EventSink, PhaseTimings, PipelineEvent, CHANGED_LIST_LIMIT};
use crate::orchestrate::PipelineOutcome;

/// The output of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// The composed model.
    pub model: ComposedModel,
    /// The merged model before composition, when requested.
    pub raw: Option<MergedModel>,
    /// Inline-region metadata of every file that declared regions.
    pub inline_regions: Vec<InlineRegions>,
    /// Candidate files considered across all roots.
    pub total_files: usize,
    /// Files that contributed an artifact, parsed or cached.
    pub scanned_files: usize,
    /// Files parsed in this run, in outcome order.
    pub changed_files: Vec<PathBuf>,
}

impl ScanReport {
    /// Number of files parsed in this run.
    pub fn changed_count(&self) -> usize {
        self.changed_files.len()
    }
}

/// Merges outcomes, runs the composer and reports the summary.
pub struct ResultAggregator<'a> {
    composer: &'a dyn Composer,
    clock: &'a dyn Clock,
    sink: &'a dyn EventSink,
    keep_raw: bool,
    verbose: bool,
}

impl<'a> ResultAggregator<'a> {
    /// Creates an aggregator.
    pub fn new(composer: &'a dyn Composer, clock: &'a dyn Clock, sink: &'a dyn EventSink) -> Self {
        Self {
            composer,
            clock,
            sink,
            keep_raw: false,
            verbose: false,
        }
    }

    /// Keeps a copy of the merged model in the report.
    pub fn keep_raw(mut self, keep: bool) -> Self {
        self.keep_raw = keep;
        self
    }

    /// Lists changed files regardless of how many there are.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Builds the report.
    ///
    /// `started` is the clock reading taken when the run began and
    /// `total_files` the number of candidates enumerated.
    pub fn aggregate(
        &self,
        outcomes: Vec<PipelineOutcome>,
        total_files: usize,
        started: Duration,
    ) -> ScanReport {
        let reduce_start = self.clock.now();

        let mut merged = MergedModel::default();
        let mut inline_regions = Vec::new();
        let mut changed_files = Vec::new();
        for outcome in &outcomes {
            merged.extend_from(&outcome.artifact);
            if !outcome.artifact.inline_ranges.is_empty() {
                inline_regions.push(outcome.artifact.inline_regions());
            }
            if outcome.is_changed() {
                changed_files.push(outcome.artifact.path.clone());
            }
        }
        let raw = self.keep_raw.then(|| merged.clone());

        let compose_start = self.clock.now();
        let model = self.composer.compose(merged);
        let end = self.clock.now();

        self.sink.emit(PipelineEvent::Completed {
            types: model.types.len(),
            files: outcomes.len(),
            changed: changed_files.len(),
        });
        if !changed_files.is_empty() && (changed_files.len() < CHANGED_LIST_LIMIT || self.verbose)
        {
            self.sink.emit(PipelineEvent::ChangedFiles {
                files: changed_files.clone(),
            });
        }
        self.sink.emit(PipelineEvent::Timings(PhaseTimings {
            load_or_parse: reduce_start.saturating_sub(started),
            reduce: compose_start.saturating_sub(reduce_start),
            compose: end.saturating_sub(compose_start),
            total: end.saturating_sub(started),
        }));

        ScanReport {
            model,
            raw,
            inline_regions,
            total_files,
            scanned_files: outcomes.len(),
            changed_files,
        }
    }
}
