//! Swift collaborators for the Quill pipeline.
//!
//! - [`DeclarationScanner`]: a line-oriented [`StructuralParser`](quill_parse::StructuralParser)
//!   that extracts type, member, function and type alias declarations,
//!   `// sourcery:` annotations and inline regions.
//! - [`MarkerVerifier`]: rejects files with merge conflict markers and skips
//!   generated output.
//! - [`ExtensionComposer`]: folds extensions into their base types and
//!   resolves superclasses.

#![warn(missing_docs)]

pub mod composer;
mod lexer;
pub mod scanner;
pub mod verifier;

pub use composer::ExtensionComposer;
pub use scanner::DeclarationScanner;
pub use verifier::MarkerVerifier;
