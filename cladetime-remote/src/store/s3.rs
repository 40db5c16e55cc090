/// Anonymous read access to a public, versioned S3 bucket
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use cladetime_core::{CladetimeError, CladetimeResult, ObjectVersion};
use tokio::runtime::Runtime;
use tracing::debug;

use super::VersionedStore;

pub const DEFAULT_REGION: &str = "us-east-1";

pub struct S3VersionedStore {
    client: Client,
    runtime: Runtime,
}

impl S3VersionedStore {
    /// Unsigned client for public buckets
    pub fn new(region: &str) -> CladetimeResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let sdk_config = runtime.block_on(
            aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region.to_string()))
                .no_credentials()
                .load(),
        );
        let client = Client::new(&sdk_config);

        Ok(Self { client, runtime })
    }

    async fn list_all(&self, bucket: &str, key: &str) -> CladetimeResult<Vec<ObjectVersion>> {
        let mut versions = Vec::new();
        let mut key_marker: Option<String> = None;
        let mut version_id_marker: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_object_versions()
                .bucket(bucket)
                .prefix(key);

            if let Some(marker) = key_marker.take() {
                request = request.key_marker(marker);
            }
            if let Some(marker) = version_id_marker.take() {
                request = request.version_id_marker(marker);
            }

            let response = request.send().await.map_err(|e| {
                CladetimeError::Storage(format!(
                    "Failed to list versions of s3://{}/{}: {}",
                    bucket,
                    key,
                    e.into_service_error()
                ))
            })?;

            for object in response.versions() {
                let (Some(object_key), Some(version_id), Some(modified)) =
                    (object.key(), object.version_id(), object.last_modified())
                else {
                    continue;
                };
                let Some(last_modified) =
                    DateTime::<Utc>::from_timestamp(modified.secs(), modified.subsec_nanos())
                else {
                    continue;
                };
                versions.push(ObjectVersion {
                    key: object_key.to_string(),
                    version_id: version_id.to_string(),
                    last_modified,
                });
            }

            if response.is_truncated().unwrap_or(false) {
                key_marker = response.next_key_marker().map(str::to_string);
                version_id_marker = response.next_version_id_marker().map(str::to_string);
                if key_marker.is_none() && version_id_marker.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(versions)
    }
}

impl VersionedStore for S3VersionedStore {
    fn list_versions(&self, bucket: &str, key: &str) -> CladetimeResult<Vec<ObjectVersion>> {
        let versions = self.runtime.block_on(self.list_all(bucket, key))?;
        debug!(bucket, key, count = versions.len(), "Listed object versions");
        Ok(versions)
    }
}
