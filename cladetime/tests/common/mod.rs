//! Shared harness: a mock Nextstrain bucket with two snapshots, a mock
//! archive, a mock classifier and a frozen clock.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use cladetime::{AsOf, CladeTime, CladetimeResult, Config, Providers};
use cladetime_core::{version_url, FixedClock};
use cladetime_test::{
    archive_document, fasta, pipeline_metadata_json, tempfile, utc, xz_bytes, zstd_bytes, MockClassifier,
    MockFetcher, MockVersionedStore, SAMPLE_METADATA_TSV,
};
use std::sync::Arc;

pub const BUCKET: &str = "nextstrain-data";
pub const SEQUENCE_KEY: &str = "files/ncov/open/sequences.fasta.xz";
pub const METADATA_KEY: &str = "files/ncov/open/metadata.tsv.zst";
pub const PIPELINE_KEY: &str = "files/ncov/open/metadata_version.json";
pub const ARCHIVE_BASE: &str = "https://example.org/modeled-clades";

pub const DATASET_VERSION: &str = "2024-10-17--16-48-48Z";
pub const ARCHIVED_DATASET_VERSION: &str = "2024-09-25--21-50-30Z";
pub const NEXTCLADE_VERSION: &str = "3.9.1";

/// Uncompressed sequence metadata
pub const PLAIN_METADATA_URL: &str = "https://example.org/files/ncov/open/metadata.tsv?versionId=plain-1";

pub fn now() -> DateTime<Utc> {
    utc("2025-10-20T12:00:00Z")
}

pub fn sequence_fasta() -> String {
    fasta(&[("X/1", "ACGTACGT"), ("X/2", "TTGACCA"), ("X/3", "GGGCCCAA"), ("Y/9", "AAAA")])
}

pub struct World {
    pub store: Arc<MockVersionedStore>,
    pub fetcher: Arc<MockFetcher>,
    pub classifier: Arc<MockClassifier>,
    pub config: Config,
    pub scratch: tempfile::TempDir,
}

impl World {
    pub fn new() -> Self {
        Self::with_classifier(MockClassifier::new().with_label("X/1", "24C").with_label("X/2", "24B"))
    }

    pub fn with_classifier(classifier: MockClassifier) -> Self {
        cladetime_test::init_test_logging();

        let store = MockVersionedStore::new()
            .with_version(SEQUENCE_KEY, "seq-0", utc("2024-06-01T00:00:00Z"))
            .with_version(SEQUENCE_KEY, "seq-1", utc("2024-11-01T10:00:00Z"))
            .with_version(SEQUENCE_KEY, "seq-2", utc("2025-10-01T10:00:00Z"))
            .with_version(METADATA_KEY, "meta-0", utc("2024-06-01T00:00:00Z"))
            .with_version(METADATA_KEY, "meta-1", utc("2024-11-01T10:00:00Z"))
            .with_version(METADATA_KEY, "meta-2", utc("2025-10-01T10:00:00Z"))
            .with_version(PIPELINE_KEY, "pipe-1", utc("2024-11-01T10:00:00Z"));

        let sequences = xz_bytes(sequence_fasta().as_bytes());
        let metadata = zstd_bytes(SAMPLE_METADATA_TSV.as_bytes());
        let fetcher = MockFetcher::new()
            .with_bytes(&version_url(BUCKET, SEQUENCE_KEY, "seq-0"), sequences.clone())
            .with_bytes(&version_url(BUCKET, SEQUENCE_KEY, "seq-1"), sequences.clone())
            .with_bytes(&version_url(BUCKET, SEQUENCE_KEY, "seq-2"), sequences)
            .with_bytes(&version_url(BUCKET, METADATA_KEY, "meta-2"), metadata)
            .with_bytes(PLAIN_METADATA_URL, SAMPLE_METADATA_TSV.as_bytes().to_vec())
            .with_json(
                &version_url(BUCKET, PIPELINE_KEY, "pipe-1"),
                &pipeline_metadata_json(DATASET_VERSION, NEXTCLADE_VERSION),
            )
            .with_json(
                &format!("{ARCHIVE_BASE}/2024-10-16.json"),
                &archive_document(ARCHIVED_DATASET_VERSION, "3.8.2"),
            );

        let scratch = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.archive.base_url = ARCHIVE_BASE.to_string();
        config.cache_dir = Some(scratch.path().join("cache"));
        config.assignment.output_path = Some(scratch.path().join("out/clade_assignments.tsv"));

        Self {
            store: Arc::new(store),
            fetcher: Arc::new(fetcher),
            classifier: Arc::new(classifier),
            config,
            scratch,
        }
    }

    pub fn providers(&self) -> Providers {
        Providers::new(
            self.store.clone(),
            self.fetcher.clone(),
            self.classifier.clone(),
            Arc::new(FixedClock(now())),
        )
    }

    pub fn clade_time(&self, sequence_as_of: Option<&str>, tree_as_of: Option<&str>) -> CladetimeResult<CladeTime> {
        CladeTime::new(
            self.config.clone(),
            self.providers(),
            sequence_as_of.map(AsOf::from),
            tree_as_of.map(AsOf::from),
        )
    }
}
