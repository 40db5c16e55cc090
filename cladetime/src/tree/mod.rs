//! Reference tree resolution
//!
//! A `Tree` re-resolves pipeline metadata for its own `tree_as_of`, which
//! may differ from the sequence snapshot date.

use chrono::{DateTime, Utc};
use cladetime_core::{CladetimeError, CladetimeResult, Config, PipelineMetadata};
use cladetime_tools::{read_bundle_json, DatasetRequest};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::pipeline::{fetch_pipeline_metadata, resolve_metadata_source, MetadataSource};
use crate::providers::Providers;
use crate::scratch::ScratchDir;

pub struct Tree {
    config: Arc<Config>,
    providers: Providers,
    tree_as_of: DateTime<Utc>,
    sequence_url: String,
    metadata_source: MetadataSource,
    pipeline_metadata: PipelineMetadata,
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("config", &self.config)
            .field("tree_as_of", &self.tree_as_of)
            .field("sequence_url", &self.sequence_url)
            .field("metadata_source", &self.metadata_source)
            .field("pipeline_metadata", &self.pipeline_metadata)
            .finish_non_exhaustive()
    }
}

impl Tree {
    /// Resolve the pipeline metadata in effect at `tree_as_of`.
    ///
    /// `sequence_url` is carried along only so the sequence codec can be
    /// determined later.
    pub fn new(
        config: Arc<Config>,
        providers: Providers,
        tree_as_of: DateTime<Utc>,
        sequence_url: impl Into<String>,
    ) -> CladetimeResult<Self> {
        let floor = config.nextstrain.pipeline_metadata_min_date;
        if tree_as_of < floor {
            return Err(CladetimeError::TreeNotAvailable(format!(
                "tree_as_of {} precedes the earliest pipeline metadata ({})",
                tree_as_of, floor
            )));
        }

        let metadata_source = resolve_metadata_source(&config, providers.store.as_ref(), tree_as_of)?;
        let pipeline_metadata = fetch_pipeline_metadata(
            &config,
            providers.fetcher.as_ref(),
            &metadata_source,
            tree_as_of,
        )?
        .into_metadata();
        debug!(%tree_as_of, source = %metadata_source, "Resolved tree pipeline metadata");

        Ok(Self {
            config,
            providers,
            tree_as_of,
            sequence_url: sequence_url.into(),
            metadata_source,
            pipeline_metadata,
        })
    }

    pub fn tree_as_of(&self) -> DateTime<Utc> {
        self.tree_as_of
    }

    pub fn sequence_url(&self) -> &str {
        &self.sequence_url
    }

    pub fn pipeline_metadata(&self) -> &PipelineMetadata {
        &self.pipeline_metadata
    }

    pub fn url_pipeline_metadata(&self) -> Option<&str> {
        self.metadata_source.url()
    }

    /// Dataset request for the classifier, if the metadata names one
    pub fn dataset_request(&self) -> CladetimeResult<DatasetRequest> {
        self.require_complete()?;
        let metadata = &self.pipeline_metadata;
        Ok(DatasetRequest::new(
            metadata.nextclade_version_num.as_str(),
            metadata.nextclade_dataset_name.as_str(),
            metadata.nextclade_dataset_version.as_str(),
        ))
    }

    /// `{data_url}/{api version}/{dataset}/{dataset version}/{tree name}`
    pub fn tree_url(&self) -> CladetimeResult<String> {
        let metadata = &self.pipeline_metadata;
        if metadata.is_empty()
            || metadata.dataset_path().is_empty()
            || metadata.nextclade_dataset_version.is_empty()
        {
            return Err(CladetimeError::TreeNotAvailable(format!(
                "no dataset name or version for {}",
                self.tree_as_of
            )));
        }

        let nextclade = &self.config.nextclade;
        let mut base = nextclade.data_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(|e| CladetimeError::InvalidUrl(format!("{}: {}", base, e)))?;
        let path = format!(
            "{}/{}/{}/{}",
            nextclade.data_url_version.trim_matches('/'),
            metadata.dataset_path().trim_matches('/'),
            metadata.nextclade_dataset_version,
            nextclade.tree_name
        );
        let url = base
            .join(&path)
            .map_err(|e| CladetimeError::InvalidUrl(format!("{}{}: {}", base, path, e)))?;
        Ok(url.to_string())
    }

    /// Download the dataset bundle and parse its tree document
    pub fn tree(&self) -> CladetimeResult<serde_json::Value> {
        let request = self.dataset_request()?;
        let scratch = ScratchDir::new("tree", self.config.assignment.preserve_scratch)?;
        let dataset_dir = scratch.subdir("dataset")?;

        let bundle = self
            .providers
            .classifier
            .fetch_dataset(&request, &dataset_dir)?;
        info!(
            dataset = %request.dataset_name,
            version = %request.dataset_version,
            "Reading reference tree from dataset bundle"
        );
        read_bundle_json(&bundle, &self.config.nextclade.tree_name)
    }

    fn require_complete(&self) -> CladetimeResult<()> {
        if self.pipeline_metadata.is_complete() {
            Ok(())
        } else {
            Err(CladetimeError::TreeNotAvailable(format!(
                "incomplete pipeline metadata for {}: classifier version, dataset name and dataset version are all required",
                self.tree_as_of
            )))
        }
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tree")?;
        writeln!(f, "  tree_as_of:        {}", self.tree_as_of)?;
        writeln!(f, "  dataset:           {}", self.pipeline_metadata.dataset_path())?;
        writeln!(f, "  dataset version:   {}", self.pipeline_metadata.nextclade_dataset_version)?;
        write!(f, "  nextclade version: {}", self.pipeline_metadata.nextclade_version_num)
    }
}
