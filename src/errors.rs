//! Typed error hierarchy for the triage service.
//!
//! Four enums cover the four layers:
//! - `StoreError`: JSON document load/save failures
//! - `RunnerError`: external `gh` invocation failures
//! - `ActionError`: triage action sequencing failures
//! - `RequestError`: client input validation failures

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the on-disk JSON document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize document for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store task failed: {0}")]
    Join(String),
}

/// Errors from a single external tool invocation.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Non-zero exit; carries the tool's stderr text.
    #[error("{0}")]
    Failed(String),

    #[error("Command timed out")]
    TimedOut,

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from applying a triage action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Comment cannot be empty")]
    EmptyComment,

    #[error("Failed to add label '{label}': {source}")]
    LabelFailed {
        label: String,
        #[source]
        source: RunnerError,
    },

    #[error("Failed to post comment: {0}")]
    CommentFailed(#[source] RunnerError),

    #[error("Failed to close issue: {0}")]
    CloseFailed(#[source] RunnerError),

    #[error("Failed to stage comment body: {0}")]
    BodyFile(#[source] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ActionError {
    /// True when an external call in the sequence failed.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::LabelFailed { .. } | Self::CommentFailed(_) | Self::CloseFailed(_)
        )
    }
}

/// Validation errors for `POST /api/action` bodies and query parameters.
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("Invalid JSON body")]
    InvalidJson,

    #[error("Invalid issue number")]
    InvalidNumber,

    #[error("Action must be 'close', 'close_wontfix', 'comment', or 'skip'")]
    InvalidAction,

    #[error("Invalid comment")]
    InvalidComment,

    #[error("Invalid labels")]
    InvalidLabels,

    #[error("Invalid {field}: {value}")]
    InvalidFilter { field: &'static str, value: String },
}
