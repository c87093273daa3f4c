//! The scan → cache → parse → merge pipeline.
//!
//! A [`Pipeline`] expands source roots into candidate files
//! ([`FileEnumerator`]), serves unchanged files from the per-root
//! [`ArtifactCache`](quill_cache::ArtifactCache), parses the rest with a
//! [`StructuralParser`] serially or on a rayon pool ([`ParseOrchestrator`]),
//! and folds every artifact into one model handed to a [`Composer`]
//! ([`ResultAggregator`]). The parser, the generation-marker verifier and the
//! composer are collaborators supplied by the caller.

#![warn(missing_docs)]

pub mod aggregate;
pub mod collab;
pub mod enumerate;
pub mod error;
pub mod observe;
pub mod orchestrate;
pub mod pipeline;

pub use aggregate::{ResultAggregator, ScanReport};
pub use collab::{
    is_force_parsed, Composer, GenerationVerifier, ParseInput, StructuralParser, Verdict,
    GENERATION_MARKER,
};
pub use enumerate::{CandidateFile, FileEnumerator, SourceRoot};
pub use error::{ParseError, PipelineError};
pub use observe::{
    Clock, EventSink, ManualClock, PhaseTimings, PipelineEvent, RecordingSink, SystemClock,
    TracingSink,
};
pub use orchestrate::{ErrorSlot, Freshness, ParseOrchestrator, PipelineOutcome};
pub use pipeline::{clear_caches, Pipeline, PipelineOptions, ScanRequest, TOOL_VERSION};
