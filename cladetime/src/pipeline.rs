//! Two-tier pipeline metadata resolution
//!
//! The primary source is the versioned `metadata_version.json` in the
//! bucket. When the bucket no longer holds a version for the date, the
//! archive series is consulted instead, but only when the metadata is
//! actually requested.

use chrono::{DateTime, Utc};
use cladetime_core::{CladetimeError, CladetimeResult, Config, PipelineMetadata};
use cladetime_remote::{resolve_version, ArchiveResolver, Fetcher, VersionedStore};
use std::fmt;
use tracing::{debug, warn};

/// Where pipeline metadata for a date comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataSource {
    /// A specific version of the metadata file
    Url(String),
    /// The bucket has no version for the date; ask the archive
    Archive,
    /// The date precedes any published pipeline metadata
    Unavailable,
}

impl MetadataSource {
    pub fn url(&self) -> Option<&str> {
        match self {
            MetadataSource::Url(url) => Some(url),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataSource::Url(url) => write!(f, "{}", url),
            MetadataSource::Archive => write!(f, "(archive)"),
            MetadataSource::Unavailable => write!(f, "(unavailable)"),
        }
    }
}

/// Decide where metadata for `as_of` lives. "No eligible version" is not
/// an error here; it selects the archive.
pub fn resolve_metadata_source(
    config: &Config,
    store: &dyn VersionedStore,
    as_of: DateTime<Utc>,
) -> CladetimeResult<MetadataSource> {
    if as_of < config.nextstrain.pipeline_metadata_min_date {
        return Ok(MetadataSource::Unavailable);
    }

    match resolve_version(
        store,
        &config.nextstrain.bucket,
        &config.nextstrain.pipeline_metadata_key,
        as_of,
    ) {
        Ok(version) => Ok(MetadataSource::Url(version.url)),
        Err(CladetimeError::NoEligibleVersion { .. }) => {
            debug!(%as_of, "No pipeline metadata version in bucket, deferring to archive");
            Ok(MetadataSource::Archive)
        }
        Err(e) => Err(e),
    }
}

/// Outcome of a fetch, so callers can tell a tolerated miss from real data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Found(PipelineMetadata),
    Missing,
}

impl Fetched {
    pub fn into_metadata(self) -> PipelineMetadata {
        match self {
            Fetched::Found(metadata) => metadata,
            Fetched::Missing => PipelineMetadata::default(),
        }
    }
}

/// Fetch metadata from its source. An unsuccessful HTTP fetch is tolerated
/// and reported as `Missing`; archive failures propagate.
pub fn fetch_pipeline_metadata(
    config: &Config,
    fetcher: &dyn Fetcher,
    source: &MetadataSource,
    as_of: DateTime<Utc>,
) -> CladetimeResult<Fetched> {
    match source {
        MetadataSource::Unavailable => Ok(Fetched::Missing),
        MetadataSource::Archive => {
            let archive = ArchiveResolver::from_config(&config.archive);
            Ok(Fetched::Found(archive.resolve(fetcher, as_of)?))
        }
        MetadataSource::Url(url) => {
            let response = match fetcher.get(url) {
                Ok(response) => response,
                Err(CladetimeError::Network(reason)) => {
                    warn!(url = %url, %reason, "Failed to retrieve pipeline metadata");
                    return Ok(Fetched::Missing);
                }
                Err(e) => return Err(e),
            };
            if !response.is_success() {
                warn!(
                    url = %url,
                    status = response.status,
                    body = %response.text(),
                    "Failed to retrieve pipeline metadata"
                );
                return Ok(Fetched::Missing);
            }
            let metadata: PipelineMetadata = response.json()?;
            Ok(Fetched::Found(metadata.normalized()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cladetime_core::ObjectVersion;
    use cladetime_remote::HttpResponse;
    use std::path::Path;

    struct OneVersion(DateTime<Utc>);

    impl VersionedStore for OneVersion {
        fn list_versions(&self, _bucket: &str, key: &str) -> CladetimeResult<Vec<ObjectVersion>> {
            Ok(vec![ObjectVersion {
                key: key.to_string(),
                version_id: "only".to_string(),
                last_modified: self.0,
            }])
        }
    }

    struct Status(u16, &'static str);

    impl Fetcher for Status {
        fn get(&self, _url: &str) -> CladetimeResult<HttpResponse> {
            Ok(HttpResponse {
                status: self.0,
                body: self.1.as_bytes().to_vec(),
            })
        }

        fn download(&self, _url: &str, _dest: &Path) -> CladetimeResult<u64> {
            Ok(0)
        }
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_source_selection() {
        let config = Config::default();
        let store = OneVersion(at(2024, 10, 1));

        assert_eq!(
            resolve_metadata_source(&config, &store, at(2024, 7, 1)).unwrap(),
            MetadataSource::Unavailable
        );
        assert_eq!(
            resolve_metadata_source(&config, &store, at(2024, 9, 1)).unwrap(),
            MetadataSource::Archive
        );
        let source = resolve_metadata_source(&config, &store, at(2024, 10, 2)).unwrap();
        assert!(source.url().unwrap().ends_with("metadata_version.json?versionId=only"));
    }

    #[test]
    fn test_failed_fetch_is_missing() {
        let config = Config::default();
        let source = MetadataSource::Url("https://example.org/meta.json".to_string());
        let fetched = fetch_pipeline_metadata(&config, &Status(404, "gone"), &source, at(2024, 10, 2)).unwrap();
        assert_eq!(fetched, Fetched::Missing);
        assert!(fetched.into_metadata().is_empty());
    }

    #[test]
    fn test_successful_fetch_is_normalized() {
        let config = Config::default();
        let source = MetadataSource::Url("https://example.org/meta.json".to_string());
        let body = r#"{"nextclade_dataset_name": "SARS-CoV-2", "nextclade_dataset_version": "v4", "nextclade_version": "nextclade 3.8.2"}"#;
        let fetched = fetch_pipeline_metadata(&config, &Status(200, body), &source, at(2024, 10, 2)).unwrap();
        let metadata = fetched.into_metadata();
        assert_eq!(metadata.nextclade_version_num, "3.8.2");
        assert_eq!(metadata.nextclade_dataset_name_full, "nextstrain/sars-cov-2/wuhan-hu-1/orfs");
    }
}
