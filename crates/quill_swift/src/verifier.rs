//! Pre-parse screening of Swift sources.

use std::path::Path;

use quill_parse::{is_force_parsed, GenerationVerifier, Verdict};

const CONFLICT_OURS: &str = "<<<<<<<";
const CONFLICT_THEIRS: &str = ">>>>>>>";

/// Detects generated files and unresolved merge conflicts.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerVerifier;

impl GenerationVerifier for MarkerVerifier {
    fn verify(&self, content: &str, path: &Path, marker: &str, force_parse: &[String]) -> Verdict {
        if content.is_empty() {
            return Verdict::Approved;
        }
        if content.starts_with(marker) && !is_force_parsed(path, force_parse) {
            return Verdict::AlreadyGenerated;
        }
        let conflicted = content
            .lines()
            .any(|line| line.starts_with(CONFLICT_OURS) || line.starts_with(CONFLICT_THEIRS));
        if conflicted {
            Verdict::ConflictMarkers
        } else {
            Verdict::Approved
        }
    }
}
