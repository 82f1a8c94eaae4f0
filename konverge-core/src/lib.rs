//! Konverge core library — definition model, manifest loading, structural diff.
//!
//! Public API surface:
//! - [`types`] — [`ResourceDefinition`], [`State`], alias stripping
//! - [`manifest`] — [`DefinitionInput`] resolution and multi-document loading
//! - [`diff`] — desired-driven structural diff
//! - [`error`] — [`DefinitionError`]

pub mod diff;
pub mod error;
pub mod manifest;
pub mod types;

pub use diff::{diff, matches, DiffEntry, DiffKind};
pub use error::DefinitionError;
pub use manifest::{load_definitions, DefinitionInput};
pub use types::{ResourceDefinition, State};
