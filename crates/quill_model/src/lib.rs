//! Structural model of scanned source files.
//!
//! This crate defines the per-file [`ParseArtifact`] produced by a structural
//! parser, the declaration types it carries ([`TypeDecl`], [`Function`],
//! [`TypeAlias`]), the raw [`MergedModel`] folded from all artifacts of a run,
//! and the [`ComposedModel`] a composer derives from it.

#![warn(missing_docs)]

pub mod artifact;
pub mod decl;
pub mod model;

pub use artifact::{InlineRange, InlineRegions, ParseArtifact};
pub use decl::{EnumCase, Function, TypeAlias, TypeDecl, TypeKind, Variable};
pub use model::{ComposedModel, MergedModel};
