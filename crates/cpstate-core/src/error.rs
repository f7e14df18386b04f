//! Error types for the live control plane boundary

use thiserror::Error;

/// Result type for control plane operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to a control plane
#[derive(Error, Debug)]
pub enum ClientError {
    /// Object does not exist
    #[error("{kind} {name:?} not found")]
    NotFound { kind: String, name: String },

    /// Object with the same identity already exists
    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: String, name: String },

    /// Update rejected because the stored object changed
    #[error("conflict updating {kind} {name:?}: {message}")]
    Conflict {
        kind: String,
        name: String,
        message: String,
    },

    /// Kind is not served by the control plane
    #[error("no resource mapping for kind {0}")]
    NoMapping(String),

    /// Discovery documents could not be fetched or parsed
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// Control plane answered with an unexpected status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Request never reached the control plane
    #[error("Transport error: {0}")]
    Transport(String),

    /// Manifest is missing required fields or is not an object
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClientError::AlreadyExists { .. })
    }
}
