//! Error types for the catalog pipeline.
//!
//! Only whole-input failures are errors that abort a run. Lookup failures are
//! recorded as [`crate::models::UnmatchReason`] values and tag/copy failures are
//! recorded per file, so neither shows up here as a fatal variant.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal problems with the run's inputs or configuration.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failures of the external tagging capability.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("cannot read tags from {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("cannot write tags to {path}: {message}")]
    Write { path: PathBuf, message: String },
}

impl TagError {
    pub fn path(&self) -> &PathBuf {
        match self {
            TagError::Read { path, .. } | TagError::Write { path, .. } => path,
        }
    }
}

pub type InputResult<T> = std::result::Result<T, InputError>;
