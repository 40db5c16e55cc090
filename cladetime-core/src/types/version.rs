//! Object versions in a versioned store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One historical version of an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: String,
    pub last_modified: DateTime<Utc>,
}

/// The version chosen for a given as-of date, with a URL that fetches it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVersion {
    pub version_id: String,
    pub url: String,
    pub last_modified: DateTime<Utc>,
}

/// Public HTTPS URL for a specific object version
pub fn version_url(bucket: &str, key: &str, version_id: &str) -> String {
    format!("https://{}.s3.amazonaws.com/{}?versionId={}", bucket, key, version_id)
}
