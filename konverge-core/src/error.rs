//! Error types for konverge-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while building resource definitions.
///
/// Every variant is a configuration-time failure: none of them involves a
/// cluster call, and all of them are reported before one is attempted.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// Both an inline definition and a source file were supplied.
    #[error("resource_definition and src are mutually exclusive; supply one or the other")]
    InlineAndSrc,

    /// No `kind` after resolving parameters against the definition body.
    #[error("no kind specified; use the kind parameter or include kind in the resource definition")]
    MissingKind,

    /// No `apiVersion` after resolving parameters against the definition body.
    #[error(
        "no apiVersion specified; use the api_version parameter or include apiVersion in the resource definition"
    )]
    MissingApiVersion,

    /// A definition body that is not a mapping (scalar or sequence document).
    #[error("document {index} in {path} is not a mapping")]
    NotAMapping { path: PathBuf, index: usize },

    /// Underlying I/O failure reading a manifest, with the path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse manifest at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
