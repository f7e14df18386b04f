//! Error types for the import pipeline

use cpstate_core::ClientError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;

/// Errors that can occur while importing an exported state
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("cannot open archive {path:?}: {source}")]
    ArchiveOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input is not a gzip stream
    #[error("cannot create gzip reader for {path:?}: {message}")]
    Decompress { path: PathBuf, message: String },

    #[error("cannot read archive {path:?}: {source}")]
    ArchiveRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot read {entry:?} from archive {path:?}: {source}")]
    ArchiveEntryRead {
        path: PathBuf,
        entry: String,
        source: std::io::Error,
    },

    /// Entry is neither a directory nor a regular file
    #[error("unsupported entry {entry:?} of type {entry_type} in archive")]
    UnsupportedEntry { entry: String, entry_type: String },

    #[error("invalid path {0:?} in exported state")]
    InvalidPath(String),

    #[error("{0:?} already exists with a different type in exported state")]
    PathConflict(String),

    #[error("{0:?} not found in exported state")]
    NotFound(String),

    #[error("{0:?} is not a regular file")]
    NotAFile(String),

    #[error("{0:?} is not a directory")]
    NotADirectory(String),

    #[error("unexpected file {0:?} in root directory of exported state")]
    UnexpectedRootFile(String),

    #[error("cannot unmarshal export metadata: {0}")]
    Metadata(#[from] serde_yaml::Error),

    #[error("cannot read resource {file:?}: {source}")]
    Manifest { file: String, source: ClientError },

    #[error("cannot apply {resource}: {source}")]
    Apply {
        resource: String,
        source: ClientError,
    },

    #[error("{file:?}: {source}")]
    ManifestFile {
        file: String,
        source: Box<ImportError>,
    },

    #[error("cannot import {group:?} resources: {source}")]
    ImportGroup {
        group: String,
        source: Box<ImportError>,
    },

    #[error("timeout waiting for conditions {conditions:?} to be satisfied for all {kind:?}")]
    WaitTimeout { kind: String, conditions: String },

    #[error("cannot modify {category:?} resources: {source}")]
    Category {
        category: String,
        source: Box<ImportError>,
    },

    /// A failed step of the import, with the phase that was running
    #[error("{context}: {source}")]
    Phase {
        context: String,
        source: Box<ImportError>,
    },

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ImportError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ImportError::Cancelled)
    }

    pub(crate) fn in_group(self, group: &str) -> Self {
        match self {
            ImportError::Cancelled => ImportError::Cancelled,
            other => ImportError::ImportGroup {
                group: group.to_string(),
                source: Box::new(other),
            },
        }
    }

    pub(crate) fn in_file(self, file: &str) -> Self {
        match self {
            ImportError::Cancelled => ImportError::Cancelled,
            other => ImportError::ManifestFile {
                file: file.to_string(),
                source: Box::new(other),
            },
        }
    }

    pub(crate) fn in_category(self, category: &str) -> Self {
        match self {
            ImportError::Cancelled => ImportError::Cancelled,
            other => ImportError::Category {
                category: category.to_string(),
                source: Box::new(other),
            },
        }
    }

    pub(crate) fn in_phase(self, context: impl Into<String>) -> Self {
        match self {
            ImportError::Cancelled => ImportError::Cancelled,
            other => ImportError::Phase {
                context: context.into(),
                source: Box::new(other),
            },
        }
    }
}
