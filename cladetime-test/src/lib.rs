//! Test utilities for the Cladetime workspace
//!
//! Mock collaborators (object store, HTTP, classifier) and fixture data so
//! the time-travel and assignment logic can be tested without the network
//! or a container runtime.

pub mod fixtures;
pub mod mock;

pub use cladetime_core::FixedClock;
pub use fixtures::{
    archive_document, fasta, pipeline_metadata_json, xz_bytes, zstd_bytes, SAMPLE_METADATA_TSV,
};
pub use mock::{MockClassifier, MockFetcher, MockVersionedStore};

// Re-export test dependencies for convenience
pub use anyhow::{Context, Result};
pub use tempfile;

/// Initialize test logging (call once per test module)
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Parse an RFC 3339 timestamp, panicking on bad input
pub fn utc(s: &str) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .unwrap_or_else(|e| panic!("bad test timestamp {s}: {e}"))
        .with_timezone(&chrono::Utc)
}
