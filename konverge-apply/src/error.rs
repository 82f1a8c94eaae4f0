//! Error types for konverge-apply.
//!
//! Every mutation-failure variant formats its [`ClientError`] source, so the
//! HTTP status and response body surface uniformly across get, list, create,
//! delete, replace and patch failures.

use thiserror::Error;

use konverge_client::ClientError;
use konverge_core::DefinitionError;

/// All errors that can abort a reconciliation run.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// A configuration error from definition resolution or loading.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// No discovered endpoint matches the definition's kind and apiVersion.
    #[error("no API resource matches kind '{kind}' with apiVersion '{api_version}'")]
    UnknownResourceType { kind: String, api_version: String },

    /// The definition names no object and no name parameter was given.
    #[error("definition for kind '{kind}' names no object; set metadata.name or the name parameter")]
    MissingName { kind: String },

    #[error("failed to retrieve object '{name}': {source}")]
    Get {
        name: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to list {kind}: {source}")]
    List {
        kind: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to create object '{name}': {source}")]
    Create {
        name: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to delete object '{name}': {source}")]
    Delete {
        name: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to replace object '{name}': {source}")]
    Replace {
        name: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to patch object '{name}': {source}")]
    Patch {
        name: String,
        #[source]
        source: ClientError,
    },
}
