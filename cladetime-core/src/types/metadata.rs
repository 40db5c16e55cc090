//! Nextstrain pipeline-run metadata

use serde::{Deserialize, Serialize};
use std::fmt;

/// Full dataset path the short `sars-cov-2` name refers to
pub const SARS_COV_2_FULL_NAME: &str = "nextstrain/sars-cov-2/wuhan-hu-1/orfs";

/// Which classifier and reference dataset produced a data snapshot.
///
/// Every field may be empty: an unsuccessful fetch yields the default value
/// rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    #[serde(default)]
    pub nextclade_dataset_name: String,
    #[serde(default)]
    pub nextclade_dataset_name_full: String,
    #[serde(default)]
    pub nextclade_dataset_version: String,
    #[serde(default)]
    pub nextclade_version: String,
    #[serde(default)]
    pub nextclade_version_num: String,
}

impl PipelineMetadata {
    /// Fill in the full dataset name and numeric classifier version when the
    /// source only carried the short forms
    pub fn normalized(mut self) -> Self {
        if self.nextclade_dataset_name.to_lowercase() == "sars-cov-2" {
            self.nextclade_dataset_name_full = SARS_COV_2_FULL_NAME.to_string();
        }
        if self.nextclade_version_num.is_empty() {
            if let Some(num) = parse_version_num(&self.nextclade_version) {
                self.nextclade_version_num = num;
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &PipelineMetadata::default()
    }

    /// Classifier version, dataset name and dataset version are all present
    pub fn is_complete(&self) -> bool {
        !self.nextclade_version_num.is_empty()
            && !self.nextclade_dataset_name.is_empty()
            && !self.nextclade_dataset_version.is_empty()
    }

    /// Dataset path used in tree URLs; the short name if no full name is known
    pub fn dataset_path(&self) -> &str {
        if self.nextclade_dataset_name_full.is_empty() {
            &self.nextclade_dataset_name
        } else {
            &self.nextclade_dataset_name_full
        }
    }
}

/// Pull `3.8.2` out of strings like `nextclade 3.8.2`
fn parse_version_num(version: &str) -> Option<String> {
    version
        .split_whitespace()
        .map(|token| token.trim_start_matches('v'))
        .find(|token| {
            !token.is_empty()
                && token.split('.').count() >= 2
                && token.split('.').all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
        })
        .map(str::to_string)
}

impl fmt::Display for PipelineMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(no pipeline metadata)");
        }
        write!(
            f,
            "dataset {} ({}) version {}, nextclade {}",
            self.nextclade_dataset_name,
            self.dataset_path(),
            self.nextclade_dataset_version,
            self.nextclade_version_num
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalizes_sars_cov_2_name() {
        let json = r#"{
            "schema_version": "v1",
            "nextclade_version": "nextclade 3.8.2",
            "nextclade_dataset_name": "SARS-CoV-2",
            "nextclade_dataset_version": "2024-07-17--12-57-03Z"
        }"#;
        let meta: PipelineMetadata = serde_json::from_str(json).unwrap();
        let meta = meta.normalized();

        assert_eq!(meta.nextclade_dataset_name_full, SARS_COV_2_FULL_NAME);
        assert_eq!(meta.nextclade_version_num, "3.8.2");
        assert!(meta.is_complete());
        assert_eq!(meta.dataset_path(), SARS_COV_2_FULL_NAME);
    }

    #[test]
    fn test_keeps_explicit_fields() {
        let meta = PipelineMetadata {
            nextclade_dataset_name: "flu".to_string(),
            nextclade_dataset_name_full: "data/clades".to_string(),
            nextclade_dataset_version: "v1".to_string(),
            nextclade_version: "nextclade 3.9.1".to_string(),
            nextclade_version_num: "3.9.0".to_string(),
        }
        .normalized();
        assert_eq!(meta.nextclade_dataset_name_full, "data/clades");
        assert_eq!(meta.nextclade_version_num, "3.9.0");
    }

    #[test]
    fn test_empty_and_incomplete() {
        let empty = PipelineMetadata::default();
        assert!(empty.is_empty());
        assert!(!empty.is_complete());
        assert_eq!(empty.to_string(), "(no pipeline metadata)");

        let partial = PipelineMetadata {
            nextclade_dataset_name: "SARS-CoV-2".to_string(),
            ..Default::default()
        };
        assert!(!partial.is_empty());
        assert!(!partial.is_complete());
    }

    #[test]
    fn test_parse_version_num() {
        assert_eq!(parse_version_num("nextclade 3.8.2").as_deref(), Some("3.8.2"));
        assert_eq!(parse_version_num("v3.10.0").as_deref(), Some("3.10.0"));
        assert_eq!(parse_version_num("nextclade"), None);
        assert_eq!(parse_version_num(""), None);
    }
}
