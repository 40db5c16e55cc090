/// Traits for clade classification tools
use cladetime_core::CladetimeResult;
use std::path::{Path, PathBuf};

/// Identifies one reference dataset bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRequest {
    /// Classifier release used to fetch and run, e.g. `3.8.2`
    pub classifier_version: String,
    /// Lower-cased dataset name, e.g. `sars-cov-2`
    pub dataset_name: String,
    /// Dataset version tag
    pub dataset_version: String,
}

impl DatasetRequest {
    pub fn new(
        classifier_version: impl Into<String>,
        dataset_name: impl Into<String>,
        dataset_version: impl Into<String>,
    ) -> Self {
        Self {
            classifier_version: classifier_version.into(),
            dataset_name: dataset_name.into().to_lowercase(),
            dataset_version: dataset_version.into(),
        }
    }

    /// File name the bundle is saved under
    pub fn bundle_file_name(&self) -> String {
        format!(
            "nextclade_{}_{}.zip",
            self.dataset_name.replace('/', "_"),
            self.dataset_version
        )
    }
}

/// A classifier that turns a FASTA file plus a dataset bundle into a
/// per-sequence TSV of clade labels
pub trait CladeClassifier: Send + Sync {
    /// Fetch a dataset bundle (a zip archive) into `output_dir`
    fn fetch_dataset(&self, request: &DatasetRequest, output_dir: &Path) -> CladetimeResult<PathBuf>;

    /// Classify `sequences` against `dataset`, writing a TSV to `output`
    fn assign(
        &self,
        classifier_version: &str,
        sequences: &Path,
        dataset: &Path,
        output: &Path,
    ) -> CladetimeResult<PathBuf>;

    /// Check if the execution environment is present
    fn is_available(&self) -> bool;
}
