//! Versioned object store access and as-of version resolution

pub mod s3;

use chrono::{DateTime, Utc};
use cladetime_core::{version_url, CladetimeError, CladetimeResult, ObjectVersion, ResolvedVersion};
use tracing::debug;

pub use s3::S3VersionedStore;

/// Enumerates the history of objects in a versioned bucket
pub trait VersionedStore: Send + Sync {
    /// All known versions of `key`, in no particular order
    fn list_versions(&self, bucket: &str, key: &str) -> CladetimeResult<Vec<ObjectVersion>>;
}

/// Pick the version of `key` that was current at `as_of`.
///
/// That is the version with the latest modification time not after `as_of`.
/// Versions sharing that exact time are ordered by version id so the
/// choice is stable. Not retried here.
pub fn resolve_version(
    store: &dyn VersionedStore,
    bucket: &str,
    key: &str,
    as_of: DateTime<Utc>,
) -> CladetimeResult<ResolvedVersion> {
    let versions = store.list_versions(bucket, key)?;
    let total = versions.len();

    let chosen = versions
        .into_iter()
        .filter(|v| v.key == key && v.last_modified <= as_of)
        .max_by(|a, b| {
            a.last_modified
                .cmp(&b.last_modified)
                .then_with(|| a.version_id.cmp(&b.version_id))
        })
        .ok_or_else(|| CladetimeError::NoEligibleVersion {
            key: key.to_string(),
            as_of,
        })?;

    debug!(
        key,
        %as_of,
        version_id = %chosen.version_id,
        last_modified = %chosen.last_modified,
        candidates = total,
        "Resolved object version"
    );

    Ok(ResolvedVersion {
        url: version_url(bucket, key, &chosen.version_id),
        version_id: chosen.version_id,
        last_modified: chosen.last_modified,
    })
}
