//! Temporal context: one point in time for sequences, one for the tree
//!
//! Both dates are validated independently at construction, then the
//! sequence and sequence-metadata URLs are resolved against the versioned
//! bucket. Pipeline metadata is fetched on first use and memoized.

use chrono::{DateTime, Utc};
use cladetime_core::{
    AsOf, CladetimeError, CladetimeResult, Config, DateField, DatePolicy, DateRule, DateWarning,
    PipelineMetadata, ResolvedVersion,
};
use cladetime_remote::resolve_version;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

use crate::assign::{self, Clade};
use crate::pipeline::{fetch_pipeline_metadata, resolve_metadata_source, Fetched, MetadataSource};
use crate::providers::Providers;
use crate::table::{LazyTable, TableEngine};
use crate::tree::Tree;

pub struct CladeTime {
    config: Arc<Config>,
    providers: Providers,
    engine: Arc<TableEngine>,
    sequence_as_of: DateTime<Utc>,
    tree_as_of: DateTime<Utc>,
    sequence: Option<ResolvedVersion>,
    sequence_metadata: Option<ResolvedVersion>,
    metadata_source: MetadataSource,
    pipeline_metadata: OnceLock<PipelineMetadata>,
    warnings: Vec<DateWarning>,
}

impl CladeTime {
    /// Validate both dates and resolve the sequence URLs.
    ///
    /// `None` means "now" for `sequence_as_of`; for `tree_as_of` it means
    /// "same as `sequence_as_of`".
    pub fn new(
        config: Config,
        providers: Providers,
        sequence_as_of: Option<AsOf>,
        tree_as_of: Option<AsOf>,
    ) -> CladetimeResult<Self> {
        let now = providers.clock.now_seconds();
        let mut warnings = Vec::new();

        let sequence_rule = DateRule::new(
            DateField::SequenceAsOf,
            config.nextstrain.sequence_floor(now),
            "sequence data retention policy",
            config.dates.policy,
        );
        let tree_rule = DateRule::new(
            DateField::TreeAsOf,
            config.nextstrain.pipeline_metadata_min_date,
            "earliest published pipeline metadata",
            config.dates.policy,
        );

        let sequence_as_of = sequence_rule.apply(sequence_as_of.as_ref(), now, &mut warnings)?;
        let tree_as_of = match tree_as_of {
            Some(input) => tree_rule.apply(Some(&input), now, &mut warnings)?,
            None => default_tree_as_of(&tree_rule, sequence_as_of, now, &mut warnings)?,
        };

        let bucket = &config.nextstrain.bucket;
        let sequence = resolve_version(
            providers.store.as_ref(),
            bucket,
            &config.nextstrain.sequence_key,
            sequence_as_of,
        )?;
        let sequence_metadata = resolve_version(
            providers.store.as_ref(),
            bucket,
            &config.nextstrain.sequence_metadata_key,
            sequence_as_of,
        )?;
        let metadata_source = resolve_metadata_source(&config, providers.store.as_ref(), sequence_as_of)?;

        info!(
            %sequence_as_of,
            %tree_as_of,
            sequence_version = %sequence.version_id,
            metadata_source = %metadata_source,
            "CladeTime resolved"
        );

        Ok(Self {
            config: Arc::new(config),
            providers,
            engine: TableEngine::new()?,
            sequence_as_of,
            tree_as_of,
            sequence: Some(sequence),
            sequence_metadata: Some(sequence_metadata),
            metadata_source,
            pipeline_metadata: OnceLock::new(),
            warnings,
        })
    }

    /// Build with live S3, HTTP and Docker collaborators
    pub fn live(config: Config, sequence_as_of: Option<AsOf>, tree_as_of: Option<AsOf>) -> CladetimeResult<Self> {
        let providers = Providers::live(&config)?;
        Self::new(config, providers, sequence_as_of, tree_as_of)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    pub fn engine(&self) -> &Arc<TableEngine> {
        &self.engine
    }

    pub fn sequence_as_of(&self) -> DateTime<Utc> {
        self.sequence_as_of
    }

    pub fn tree_as_of(&self) -> DateTime<Utc> {
        self.tree_as_of
    }

    /// Adjustments made to the requested dates
    pub fn warnings(&self) -> &[DateWarning] {
        &self.warnings
    }

    pub fn url_sequence(&self) -> Option<&str> {
        self.sequence.as_ref().map(|v| v.url.as_str())
    }

    pub fn url_sequence_metadata(&self) -> Option<&str> {
        self.sequence_metadata.as_ref().map(|v| v.url.as_str())
    }

    pub fn sequence_version(&self) -> Option<&ResolvedVersion> {
        self.sequence.as_ref()
    }

    pub fn sequence_metadata_version(&self) -> Option<&ResolvedVersion> {
        self.sequence_metadata.as_ref()
    }

    pub fn metadata_source(&self) -> &MetadataSource {
        &self.metadata_source
    }

    /// URL of the pipeline metadata version, if the bucket still holds one
    pub fn url_pipeline_metadata(&self) -> Option<&str> {
        self.metadata_source.url()
    }

    /// Pipeline metadata in effect at `sequence_as_of`.
    ///
    /// A failed HTTP fetch yields an empty record and is retried on the
    /// next call; archive failures are returned as errors.
    pub fn pipeline_metadata(&self) -> CladetimeResult<PipelineMetadata> {
        if let Some(metadata) = self.pipeline_metadata.get() {
            return Ok(metadata.clone());
        }
        match fetch_pipeline_metadata(
            &self.config,
            self.providers.fetcher.as_ref(),
            &self.metadata_source,
            self.sequence_as_of,
        )? {
            Fetched::Found(metadata) => Ok(self.pipeline_metadata.get_or_init(|| metadata).clone()),
            Fetched::Missing => Ok(PipelineMetadata::default()),
        }
    }

    /// Lazy scan of the sequence metadata file as it was at `sequence_as_of`.
    ///
    /// The compressed file is downloaded once per version and staged,
    /// decompressed, in the cache directory.
    pub fn sequence_metadata(&self) -> CladetimeResult<LazyTable> {
        let url = self.url_sequence_metadata().ok_or_else(|| {
            CladetimeError::InvalidUrl("no sequence metadata URL was resolved".to_string())
        })?;
        let version_id = self
            .sequence_metadata
            .as_ref()
            .map(|v| v.version_id.clone())
            .unwrap_or_default();
        let staged = self.stage_sequence_metadata(url, &version_id)?;
        self.engine.read_tsv(&staged)
    }

    fn stage_sequence_metadata(&self, url: &str, version_id: &str) -> CladetimeResult<PathBuf> {
        let codec = cladetime_bio::Codec::from_name(url)?;
        let dir = self
            .config
            .cache_dir()
            .join("sequence_metadata")
            .join(cache_key(url, version_id));
        let staged = dir.join("metadata.tsv");
        if staged.exists() {
            info!(path = %staged.display(), "Using cached sequence metadata");
            return Ok(staged);
        }

        std::fs::create_dir_all(&dir)?;
        let download = dir.join(codec.file_name("download.tsv"));
        self.providers.fetcher.download(url, &download)?;

        let partial = dir.join("metadata.tsv.partial");
        cladetime_bio::decompress_file(&download, &partial)?;
        std::fs::rename(&partial, &staged)?;
        if let Err(e) = std::fs::remove_file(&download) {
            warn!(path = %download.display(), error = %e, "Failed to remove downloaded file");
        }
        Ok(staged)
    }

    /// Reference tree resolver keyed by `tree_as_of`
    pub fn tree(&self) -> CladetimeResult<Tree> {
        let sequence_url = self.url_sequence().unwrap_or_default().to_string();
        Tree::new(
            self.config.clone(),
            self.providers.clone(),
            self.tree_as_of,
            sequence_url,
        )
    }

    /// Assign clades to the sequences listed in `metadata`
    pub fn assign_clades(&self, metadata: &LazyTable, output: Option<&Path>) -> CladetimeResult<Clade> {
        assign::assign_clades(self, metadata, output)
    }

    #[doc(hidden)]
    pub fn override_sequence_url(&mut self, url: Option<String>) {
        self.sequence = url.map(override_version);
    }

    #[doc(hidden)]
    pub fn override_sequence_metadata_url(&mut self, url: Option<String>) {
        self.sequence_metadata = url.map(override_version);
    }

    #[doc(hidden)]
    pub fn override_pipeline_metadata_url(&mut self, url: Option<String>) {
        self.metadata_source = match url {
            Some(url) => MetadataSource::Url(url),
            None => MetadataSource::Unavailable,
        };
        self.pipeline_metadata = OnceLock::new();
    }
}

fn default_tree_as_of(
    rule: &DateRule,
    sequence_as_of: DateTime<Utc>,
    now: DateTime<Utc>,
    warnings: &mut Vec<DateWarning>,
) -> CladetimeResult<DateTime<Utc>> {
    if sequence_as_of >= rule.floor {
        return rule.check(sequence_as_of, now, warnings);
    }
    match rule.policy {
        DatePolicy::Strict => Err(CladetimeError::DateUnavailable {
            date: sequence_as_of,
            floor: rule.floor,
            reason: rule.reason.clone(),
        }),
        DatePolicy::Lenient => {
            let warning = DateWarning::DefaultBelowFloor {
                field: DateField::TreeAsOf,
                requested: sequence_as_of,
                floor: rule.floor,
                substituted: now,
            };
            warn!("{}", warning);
            warnings.push(warning);
            Ok(now)
        }
    }
}

fn override_version(url: String) -> ResolvedVersion {
    let version_id = url::Url::parse(&url)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "versionId")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or_default();
    ResolvedVersion {
        version_id,
        url,
        last_modified: DateTime::<Utc>::MIN_UTC,
    }
}

/// Directory name for a staged file: the version id, or a digest of the URL
fn cache_key(url: &str, version_id: &str) -> String {
    let key: String = version_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect();
    if key.is_empty() || key.chars().all(|c| c == '.') {
        // FNV-1a keeps the name stable across runs
        let hash = url
            .bytes()
            .fold(0xcbf29ce484222325u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x100000001b3));
        format!("url-{:016x}", hash)
    } else {
        key
    }
}

impl fmt::Display for CladeTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CladeTime")?;
        writeln!(f, "  sequence_as_of:          {}", self.sequence_as_of)?;
        writeln!(f, "  tree_as_of:              {}", self.tree_as_of)?;
        writeln!(f, "  url_sequence:            {}", self.url_sequence().unwrap_or("(none)"))?;
        writeln!(
            f,
            "  url_sequence_metadata:   {}",
            self.url_sequence_metadata().unwrap_or("(none)")
        )?;
        write!(f, "  pipeline metadata:       {}", self.metadata_source)
    }
}

impl fmt::Debug for CladeTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CladeTime")
            .field("sequence_as_of", &self.sequence_as_of)
            .field("tree_as_of", &self.tree_as_of)
            .field("metadata_source", &self.metadata_source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key("https://x/y?versionId=abc.DEF_1", "abc.DEF_1"), "abc.DEF_1");
        assert_eq!(cache_key("https://x/y", "a/b"), "a_b");
        let hashed = cache_key("https://x/y", "");
        assert!(hashed.starts_with("url-"));
        assert_eq!(hashed, cache_key("https://x/y", ""));
        assert_ne!(hashed, cache_key("https://x/z", ""));
    }

    #[test]
    fn test_override_version_parses_id() {
        let version = override_version("https://b.s3.amazonaws.com/k.tsv.zst?versionId=v9".to_string());
        assert_eq!(version.version_id, "v9");
        assert_eq!(override_version("not a url".to_string()).version_id, "");
    }
}
