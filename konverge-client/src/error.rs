//! Error types for konverge-client.

use thiserror::Error;

/// All errors a cluster call can produce.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API server answered with a non-success status.
    #[error("API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    /// Connection-level failure before any HTTP status was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered 2xx but the body was not the expected JSON.
    #[error("malformed response body: {0}")]
    Body(String),

    /// The discovery walk produced no usable resource table.
    #[error("unusable discovery document: {0}")]
    Discovery(String),
}

impl ClientError {
    /// The HTTP status, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for the 404 answer that reads as "object does not exist".
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
