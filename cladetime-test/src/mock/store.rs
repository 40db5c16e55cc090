//! In-memory versioned object store

use chrono::{DateTime, Utc};
use cladetime_core::{CladetimeError, CladetimeResult, ObjectVersion};
use cladetime_remote::VersionedStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockVersionedStore {
    versions: Mutex<Vec<ObjectVersion>>,
    list_calls: AtomicUsize,
    failure: Option<String>,
}

impl MockVersionedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a version of `key` last modified at `at`
    pub fn with_version(self, key: &str, version_id: &str, at: DateTime<Utc>) -> Self {
        self.add_version(key, version_id, at);
        self
    }

    pub fn add_version(&self, key: &str, version_id: &str, at: DateTime<Utc>) {
        if let Ok(mut versions) = self.versions.lock() {
            versions.push(ObjectVersion {
                key: key.to_string(),
                version_id: version_id.to_string(),
                last_modified: at,
            });
        }
    }

    /// Make every listing fail with a storage error
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

impl VersionedStore for MockVersionedStore {
    fn list_versions(&self, bucket: &str, key: &str) -> CladetimeResult<Vec<ObjectVersion>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(CladetimeError::Storage(format!("{}: {}", bucket, message)));
        }
        let versions = self
            .versions
            .lock()
            .map_err(|_| CladetimeError::Storage("mock store poisoned".to_string()))?;
        // prefix listing, like S3
        Ok(versions.iter().filter(|v| v.key.starts_with(key)).cloned().collect())
    }
}
