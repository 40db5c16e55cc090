//! Mock clade classifier
//!
//! Labels sequences from a lookup table and writes the same TSV layout the
//! Nextclade CLI produces.

use cladetime_bio::read_fasta_ids;
use cladetime_core::{CladetimeError, CladetimeResult};
use cladetime_tools::{CladeClassifier, DatasetRequest};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use zip::write::FileOptions;

pub struct MockClassifier {
    labels: HashMap<String, String>,
    tree: serde_json::Value,
    available: bool,
    duplicate_rows: bool,
    fail_assign: bool,
    fetches: Mutex<Vec<DatasetRequest>>,
    assigned: Mutex<Vec<Vec<String>>>,
    inputs: Mutex<Vec<PathBuf>>,
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self {
            labels: HashMap::new(),
            tree: serde_json::json!({"version": "v2", "meta": {"title": "mock"}, "tree": {"name": "root"}}),
            available: true,
            duplicate_rows: false,
            fail_assign: false,
            fetches: Mutex::new(Vec::new()),
            assigned: Mutex::new(Vec::new()),
            inputs: Mutex::new(Vec::new()),
        }
    }
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label sequence `id` with `clade`; unlisted sequences get no label
    pub fn with_label(mut self, id: &str, clade: &str) -> Self {
        self.labels.insert(id.to_string(), clade.to_string());
        self
    }

    pub fn with_tree(mut self, tree: serde_json::Value) -> Self {
        self.tree = tree;
        self
    }

    /// Behave as if the container runtime is missing
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Emit every result row twice
    pub fn with_duplicate_rows(mut self) -> Self {
        self.duplicate_rows = true;
        self
    }

    /// Fetch datasets normally but fail every classification run
    pub fn failing_assign(mut self) -> Self {
        self.fail_assign = true;
        self
    }

    pub fn fetches(&self) -> Vec<DatasetRequest> {
        self.fetches.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// Sequence IDs passed to each `assign` call
    pub fn assigned(&self) -> Vec<Vec<String>> {
        self.assigned.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Sequence files passed to each `assign` call, including failed ones
    pub fn inputs(&self) -> Vec<PathBuf> {
        self.inputs.lock().map(|i| i.clone()).unwrap_or_default()
    }

    fn not_available() -> CladetimeError {
        CladetimeError::NextcladeNotAvailable("mock classifier is unavailable".to_string())
    }
}

impl CladeClassifier for MockClassifier {
    fn fetch_dataset(&self, request: &DatasetRequest, output_dir: &Path) -> CladetimeResult<PathBuf> {
        if !self.available {
            return Err(Self::not_available());
        }
        if let Ok(mut fetches) = self.fetches.lock() {
            fetches.push(request.clone());
        }

        std::fs::create_dir_all(output_dir)?;
        let bundle = output_dir.join(request.bundle_file_name());
        let io_err = |e: zip::result::ZipError| CladetimeError::Io(std::io::Error::other(e.to_string()));

        let mut writer = zip::ZipWriter::new(File::create(&bundle)?);
        writer.start_file("pathogen.json", FileOptions::default()).map_err(io_err)?;
        writer.write_all(br#"{"schemaVersion": "3.0.0"}"#)?;
        writer.start_file("tree.json", FileOptions::default()).map_err(io_err)?;
        writer.write_all(self.tree.to_string().as_bytes())?;
        writer.finish().map_err(io_err)?;

        Ok(bundle)
    }

    fn assign(
        &self,
        _classifier_version: &str,
        sequences: &Path,
        dataset: &Path,
        output: &Path,
    ) -> CladetimeResult<PathBuf> {
        if !self.available {
            return Err(Self::not_available());
        }
        if let Ok(mut inputs) = self.inputs.lock() {
            inputs.push(sequences.to_path_buf());
        }
        if self.fail_assign {
            return Err(CladetimeError::ClassificationFailed(
                "mock classifier exited with status 1".to_string(),
            ));
        }
        if !dataset.exists() {
            return Err(CladetimeError::ClassificationFailed(format!(
                "dataset {} missing",
                dataset.display()
            )));
        }

        let ids = read_fasta_ids(sequences)?;
        if let Ok(mut assigned) = self.assigned.lock() {
            assigned.push(ids.clone());
        }

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(output)?;
        writeln!(out, "index\tseqName\tclade\tclade_nextstrain\tclade_who\tNextclade_pango")?;
        let repeats = if self.duplicate_rows { 2 } else { 1 };
        for (index, id) in ids.iter().enumerate() {
            let clade = self.labels.get(id).map(String::as_str).unwrap_or("");
            let pango = if clade.is_empty() { "" } else { "JN.1" };
            for _ in 0..repeats {
                writeln!(out, "{}\t{}\t{}\t{}\t\t{}", index, id, clade, clade, pango)?;
            }
        }
        Ok(output.to_path_buf())
    }

    fn is_available(&self) -> bool {
        self.available
    }
}
