//! Client construction errors and HTTP status mapping

use cpstate_core::ClientError;
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors building a client from a [`crate::ClusterConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read certificate authority {path:?}: {source}")]
    ReadCertificate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid certificate authority {path:?}: {source}")]
    InvalidCertificate {
        path: PathBuf,
        source: reqwest::Error,
    },

    #[error("Failed to create HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("invalid server URL {0:?}")]
    InvalidServer(String),
}

/// What a request was doing, which decides how a 409 is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Read,
    Create,
    Update,
}

/// Body of a failed API call
#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    message: String,
}

fn status_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<Status>(body) {
        Ok(parsed) if !parsed.message.is_empty() => parsed.message,
        _ if body.is_empty() => status.to_string(),
        _ => body.to_string(),
    }
}

/// Map a non-success response to a [`ClientError`]
pub(crate) fn status_error(
    status: StatusCode,
    body: &str,
    operation: Operation,
    kind: &str,
    name: &str,
) -> ClientError {
    match (status, operation) {
        (StatusCode::NOT_FOUND, _) => ClientError::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        },
        (StatusCode::CONFLICT, Operation::Create) => ClientError::AlreadyExists {
            kind: kind.to_string(),
            name: name.to_string(),
        },
        (StatusCode::CONFLICT, _) => ClientError::Conflict {
            kind: kind.to_string(),
            name: name.to_string(),
            message: status_message(status, body),
        },
        _ => ClientError::Api {
            status: status.as_u16(),
            message: status_message(status, body),
        },
    }
}

pub(crate) fn transport_error(e: reqwest::Error) -> ClientError {
    ClientError::Transport(e.to_string())
}
