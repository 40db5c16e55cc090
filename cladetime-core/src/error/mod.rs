//! Core error types for Cladetime

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for Cladetime operations
#[derive(Error, Debug)]
pub enum CladetimeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Object store error: {0}")]
    Storage(String),

    #[error("Table error: {0}")]
    Table(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Data not available for {date}: earliest available date is {floor} ({reason})")]
    DateUnavailable {
        date: DateTime<Utc>,
        floor: DateTime<Utc>,
        reason: String,
    },

    #[error("No version of {key} found at or before {as_of}")]
    NoEligibleVersion { key: String, as_of: DateTime<Utc> },

    #[error("No archived pipeline metadata found within {lookback_days} days before {as_of}")]
    ArchiveNotFound {
        as_of: DateTime<Utc>,
        lookback_days: u32,
    },

    #[error("Archive does not cover {as_of}: the archive series begins on {start}")]
    ArchiveNotApplicable {
        as_of: DateTime<Utc>,
        start: DateTime<Utc>,
    },

    #[error("Malformed archive document: {0}")]
    MalformedArchive(String),

    #[error("Reference tree not available: {0}")]
    TreeNotAvailable(String),

    #[error("Nextclade not available: {0}")]
    NextcladeNotAvailable(String),

    #[error("Clade classification failed: {0}")]
    ClassificationFailed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Clade assignment output contains duplicate sequence: {0}")]
    DuplicateAssignment(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CladetimeError {
    /// Wrap an error raised by the tabular engine
    pub fn table(err: impl std::fmt::Display) -> Self {
        CladetimeError::Table(err.to_string())
    }

    /// Hard failures caused by asking for data older than it exists
    pub fn is_data_unavailable(&self) -> bool {
        matches!(
            self,
            CladetimeError::DateUnavailable { .. }
                | CladetimeError::TreeNotAvailable(_)
                | CladetimeError::ArchiveNotApplicable { .. }
        )
    }

    /// Failures a caller may reasonably retry or route around
    pub fn is_resource_unavailable(&self) -> bool {
        matches!(
            self,
            CladetimeError::NextcladeNotAvailable(_)
                | CladetimeError::ArchiveNotFound { .. }
                | CladetimeError::NoEligibleVersion { .. }
                | CladetimeError::Network(_)
                | CladetimeError::Storage(_)
        )
    }
}

/// Result type alias for Cladetime operations
pub type CladetimeResult<T> = Result<T, CladetimeError>;

impl From<serde_json::Error> for CladetimeError {
    fn from(err: serde_json::Error) -> Self {
        CladetimeError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for CladetimeError {
    fn from(err: anyhow::Error) -> Self {
        CladetimeError::InvalidInput(err.to_string())
    }
}
