//! Nextclade CLI run inside its published container image

mod bundle;

pub use bundle::read_bundle_json;

use cladetime_core::config::NextcladeConfig;
use cladetime_core::{CladetimeError, CladetimeResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, info};

use crate::traits::{CladeClassifier, DatasetRequest};

pub struct DockerNextclade {
    runtime: String,
    image: String,
}

impl DockerNextclade {
    pub fn new(runtime: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
            image: image.into(),
        }
    }

    pub fn from_config(config: &NextcladeConfig) -> Self {
        Self::new(config.container_runtime.clone(), config.image.clone())
    }

    fn image_tag(&self, classifier_version: &str) -> String {
        format!("{}:{}", self.image, classifier_version)
    }

    /// `docker run` arguments for the dataset download
    pub fn dataset_args(&self, request: &DatasetRequest, output_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["run".into(), "--rm".into(), "-v".into()];
        args.push(mount(output_dir, "/data"));
        args.push(self.image_tag(&request.classifier_version).into());
        for arg in [
            "nextclade",
            "dataset",
            "get",
            "--name",
            request.dataset_name.as_str(),
            "--tag",
            request.dataset_version.as_str(),
            "--output-zip",
        ] {
            args.push(arg.into());
        }
        args.push(format!("/data/{}", request.bundle_file_name()).into());
        args
    }

    /// `docker run` arguments for clade assignment
    pub fn run_args(
        &self,
        classifier_version: &str,
        sequences: &Path,
        dataset: &Path,
        output: &Path,
    ) -> CladetimeResult<Vec<OsString>> {
        let (seq_dir, seq_name) = split_path(sequences)?;
        let (dataset_dir, dataset_name) = split_path(dataset)?;
        let (out_dir, out_name) = split_path(output)?;

        let mut args: Vec<OsString> = vec!["run".into(), "--rm".into()];
        for (dir, target) in [(seq_dir, "/input"), (dataset_dir, "/dataset"), (out_dir, "/output")] {
            args.push("-v".into());
            args.push(mount(dir, target));
        }
        args.push(self.image_tag(classifier_version).into());
        for arg in ["nextclade", "run", "--input-dataset"] {
            args.push(arg.into());
        }
        args.push(format!("/dataset/{}", dataset_name).into());
        args.push("--output-tsv".into());
        args.push(format!("/output/{}", out_name).into());
        args.push(format!("/input/{}", seq_name).into());
        Ok(args)
    }

    fn execute(&self, args: &[OsString]) -> CladetimeResult<Output> {
        debug!(runtime = %self.runtime, ?args, "Invoking container");
        Command::new(&self.runtime).args(args).output().map_err(|e| {
            CladetimeError::NextcladeNotAvailable(format!(
                "Failed to run {}: {}. Is Docker installed and running?",
                self.runtime, e
            ))
        })
    }

    fn probe(&self, arg: &str) -> bool {
        Command::new(&self.runtime)
            .arg(arg)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

impl CladeClassifier for DockerNextclade {
    fn fetch_dataset(&self, request: &DatasetRequest, output_dir: &Path) -> CladetimeResult<PathBuf> {
        std::fs::create_dir_all(output_dir)?;
        let output_dir = output_dir.canonicalize()?;
        let bundle = output_dir.join(request.bundle_file_name());

        info!(
            dataset = %request.dataset_name,
            version = %request.dataset_version,
            nextclade = %request.classifier_version,
            "Fetching Nextclade dataset"
        );
        let output = self.execute(&self.dataset_args(request, &output_dir))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CladetimeError::NextcladeNotAvailable(format!(
                "Nextclade dataset get failed: {}",
                stderr.trim()
            )));
        }
        if !bundle.exists() {
            return Err(CladetimeError::NextcladeNotAvailable(format!(
                "Nextclade dataset get did not produce {}",
                bundle.display()
            )));
        }
        Ok(bundle)
    }

    fn assign(
        &self,
        classifier_version: &str,
        sequences: &Path,
        dataset: &Path,
        output: &Path,
    ) -> CladetimeResult<PathBuf> {
        if !self.is_available() {
            return Err(CladetimeError::NextcladeNotAvailable(format!(
                "{} is not installed or not running",
                self.runtime
            )));
        }

        let sequences = sequences.canonicalize()?;
        let dataset = dataset.canonicalize()?;
        let out_dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(out_dir)?;
        let output = out_dir.canonicalize()?.join(output.file_name().unwrap_or_default());

        info!(sequences = %sequences.display(), output = %output.display(), "Assigning clades");
        let args = self.run_args(classifier_version, &sequences, &dataset, &output)?;
        let result = self.execute(&args)?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(CladetimeError::ClassificationFailed(format!(
                "nextclade run exited with {}: {}",
                result.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        if !output.exists() {
            return Err(CladetimeError::ClassificationFailed(format!(
                "nextclade run did not produce {}",
                output.display()
            )));
        }
        Ok(output)
    }

    fn is_available(&self) -> bool {
        self.probe("--version") && self.probe("info")
    }
}

fn mount(host: &Path, container: &str) -> OsString {
    let mut spec = host.as_os_str().to_os_string();
    spec.push(":");
    spec.push(container);
    spec
}

fn split_path(path: &Path) -> CladetimeResult<(&Path, String)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CladetimeError::InvalidInput(format!("{} has no file name", path.display())))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok((dir, name.to_string()))
}
