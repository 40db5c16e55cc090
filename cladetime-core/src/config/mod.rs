//! Configuration types for Cladetime
//!
//! Every knob that used to live in process-wide state is carried here and
//! handed to `CladeTime` and the clade assignment pipeline explicitly.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::CladetimeError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub nextstrain: NextstrainConfig,
    #[serde(default)]
    pub nextclade: NextcladeConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub assignment: AssignmentConfig,
    #[serde(default)]
    pub dates: DateConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Where decompressed sequence metadata is staged
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextstrainConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_sequence_key")]
    pub sequence_key: String,
    #[serde(default = "default_sequence_metadata_key")]
    pub sequence_metadata_key: String,
    #[serde(default = "default_pipeline_metadata_key")]
    pub pipeline_metadata_key: String,
    /// Sequence files in their current format go back to this date
    #[serde(default = "default_min_sequence_date")]
    pub min_sequence_date: DateTime<Utc>,
    /// Days of object history the bucket keeps; `None` means no rolling horizon
    #[serde(default)]
    pub sequence_retention_days: Option<u32>,
    /// Pipeline metadata (and therefore reference trees) starts here
    #[serde(default = "default_pipeline_metadata_min_date")]
    pub pipeline_metadata_min_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextcladeConfig {
    #[serde(default = "default_data_url")]
    pub data_url: String,
    #[serde(default = "default_data_url_version")]
    pub data_url_version: String,
    #[serde(default = "default_tree_name")]
    pub tree_name: String,
    #[serde(default = "default_image")]
    pub image: String,
    /// Container runtime executable
    #[serde(default = "default_container_runtime")]
    pub container_runtime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Base URL of the date-named (`YYYY-MM-DD.json`) document series
    #[serde(default = "default_archive_base_url")]
    pub base_url: String,
    /// First date the series was published
    #[serde(default = "default_archive_start_date")]
    pub start_date: DateTime<Utc>,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentConfig {
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: usize,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// Sequence name column in the classifier output
    #[serde(default = "default_result_id_column")]
    pub result_id_column: String,
    #[serde(default = "default_clade_column")]
    pub clade_column: String,
    /// Standard Nextstrain metadata fields kept before assignment
    #[serde(default = "default_standard_metadata_fields")]
    pub standard_metadata_fields: Vec<String>,
    #[serde(default = "default_summary_group_by")]
    pub summary_group_by: Vec<String>,
    /// Output TSV for classifier results; defaults under `cladetime_home()`
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// Keep the scratch directory around after the run
    #[serde(default)]
    pub preserve_scratch: bool,
}

/// What to do with an as-of date that cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatePolicy {
    /// Warn and use the current time
    #[default]
    Lenient,
    /// Fail construction with `InvalidDate`
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DateConfig {
    #[serde(default)]
    pub policy: DatePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

// Default value functions
fn default_bucket() -> String { "nextstrain-data".to_string() }
fn default_sequence_key() -> String { "files/ncov/open/sequences.fasta.xz".to_string() }
fn default_sequence_metadata_key() -> String { "files/ncov/open/metadata.tsv.zst".to_string() }
fn default_pipeline_metadata_key() -> String { "files/ncov/open/metadata_version.json".to_string() }
fn default_min_sequence_date() -> DateTime<Utc> { Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).single().unwrap_or_default() }
fn default_pipeline_metadata_min_date() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 8, 1, 1, 26, 29).single().unwrap_or_default() }
fn default_data_url() -> String { "https://data.clades.nextstrain.org".to_string() }
fn default_data_url_version() -> String { "v3".to_string() }
fn default_tree_name() -> String { "tree.json".to_string() }
fn default_image() -> String { "nextstrain/nextclade".to_string() }
fn default_container_runtime() -> String { "docker".to_string() }
fn default_archive_base_url() -> String {
    "https://raw.githubusercontent.com/reichlab/variant-nowcast-hub/main/auxiliary-data/modeled-clades".to_string()
}
fn default_archive_start_date() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 10, 9, 0, 0, 0).single().unwrap_or_default() }
fn default_lookback_days() -> u32 { 30 }
fn default_warning_threshold() -> usize { 10_000 }
fn default_id_column() -> String { "strain".to_string() }
fn default_result_id_column() -> String { "seqName".to_string() }
fn default_clade_column() -> String { "clade_nextstrain".to_string() }
fn default_summary_group_by() -> Vec<String> {
    ["clade_nextstrain", "country", "date", "host", "location"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_standard_metadata_fields() -> Vec<String> {
    [
        "strain",
        "virus",
        "gisaid_epi_isl",
        "genbank_accession",
        "date",
        "region",
        "country",
        "division",
        "location",
        "region_exposure",
        "country_exposure",
        "division_exposure",
        "segment",
        "length",
        "host",
        "age",
        "sex",
        "originating_lab",
        "submitting_lab",
        "authors",
        "url",
        "title",
        "date_submitted",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_timeout_secs() -> u64 { 300 }
fn default_retry_attempts() -> u32 { 3 }

impl Default for NextstrainConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            sequence_key: default_sequence_key(),
            sequence_metadata_key: default_sequence_metadata_key(),
            pipeline_metadata_key: default_pipeline_metadata_key(),
            min_sequence_date: default_min_sequence_date(),
            sequence_retention_days: None,
            pipeline_metadata_min_date: default_pipeline_metadata_min_date(),
        }
    }
}

impl NextstrainConfig {
    /// Earliest sequence date that can be resolved at `now`
    pub fn sequence_floor(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.sequence_retention_days {
            Some(days) => {
                let horizon = now - chrono::Duration::days(i64::from(days));
                horizon.max(self.min_sequence_date)
            }
            None => self.min_sequence_date,
        }
    }
}

impl Default for NextcladeConfig {
    fn default() -> Self {
        Self {
            data_url: default_data_url(),
            data_url_version: default_data_url_version(),
            tree_name: default_tree_name(),
            image: default_image(),
            container_runtime: default_container_runtime(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: default_archive_base_url(),
            start_date: default_archive_start_date(),
            lookback_days: default_lookback_days(),
        }
    }
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            warning_threshold: default_warning_threshold(),
            id_column: default_id_column(),
            result_id_column: default_result_id_column(),
            clade_column: default_clade_column(),
            standard_metadata_fields: default_standard_metadata_fields(),
            summary_group_by: default_summary_group_by(),
            output_path: None,
            preserve_scratch: false,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
        }
    }
}

impl Config {
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(crate::system::paths::cladetime_cache_dir)
    }

    pub fn assignment_output_path(&self) -> PathBuf {
        self.assignment
            .output_path
            .clone()
            .unwrap_or_else(crate::system::paths::default_assignment_output)
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, CladetimeError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| CladetimeError::Configuration(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), CladetimeError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| CladetimeError::Configuration(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.nextstrain.bucket, "nextstrain-data");
        assert_eq!(config.nextstrain.sequence_key, "files/ncov/open/sequences.fasta.xz");
        assert_eq!(
            config.nextstrain.pipeline_metadata_min_date,
            Utc.with_ymd_and_hms(2024, 8, 1, 1, 26, 29).unwrap()
        );
        assert_eq!(config.nextclade.data_url_version, "v3");
        assert_eq!(config.archive.lookback_days, 30);
        assert_eq!(config.assignment.warning_threshold, 10_000);
        assert_eq!(config.assignment.standard_metadata_fields.len(), 23);
        assert_eq!(config.dates.policy, DatePolicy::Lenient);
        assert!(!config.assignment.preserve_scratch);
    }

    #[test]
    fn test_sequence_floor_with_retention() {
        let mut config = NextstrainConfig::default();
        let now = Utc.with_ymd_and_hms(2025, 7, 13, 16, 21, 34).unwrap();
        assert_eq!(config.sequence_floor(now), config.min_sequence_date);

        config.sequence_retention_days = Some(90);
        assert_eq!(
            config.sequence_floor(now),
            Utc.with_ymd_and_hms(2025, 4, 14, 16, 21, 34).unwrap()
        );

        // a horizon older than the hard floor never lowers it
        config.sequence_retention_days = Some(5000);
        assert_eq!(config.sequence_floor(now), config.min_sequence_date);
    }

    #[test]
    fn test_load_partial_config() {
        let toml_content = r#"
[archive]
lookback_days = 14

[dates]
policy = "strict"

[assignment]
warning_threshold = 50
summary_group_by = ["clade_nextstrain", "location"]
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.archive.lookback_days, 14);
        assert_eq!(config.dates.policy, DatePolicy::Strict);
        assert_eq!(config.assignment.warning_threshold, 50);
        assert_eq!(config.assignment.summary_group_by, vec!["clade_nextstrain", "location"]);
        // untouched sections keep their defaults
        assert_eq!(config.nextstrain.bucket, "nextstrain-data");
        assert_eq!(config.assignment.id_column, "strain");
    }

    #[test]
    fn test_load_invalid_config() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[dates]\npolicy = 7\n").unwrap();

        match load_config(file.path()) {
            Err(CladetimeError::Configuration(msg)) => assert!(msg.contains("Failed to parse config")),
            other => panic!("Expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cladetime.toml");

        let mut config = Config::default();
        config.archive.lookback_days = 7;
        config.nextstrain.sequence_retention_days = Some(120);
        save_config(&path, &config).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.archive.lookback_days, 7);
        assert_eq!(loaded.nextstrain.sequence_retention_days, Some(120));
        assert_eq!(loaded.archive.start_date, config.archive.start_date);
    }
}
