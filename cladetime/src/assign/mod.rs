//! Clade assignment orchestration
//!
//! Steps run strictly in order: normalize columns, derive the ID set,
//! resolve the tree, filter sequences, fetch the dataset, classify, then
//! join and summarize. Everything after the ID set runs inside one scratch
//! directory that is removed on every exit path.

use cladetime_bio::{filter_sequence_file, Codec};
use cladetime_core::{CladetimeError, CladetimeResult, Config, Provenance};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::scratch::ScratchDir;
use crate::table::{quote_ident, quote_literal, LazyTable};
use crate::temporal::CladeTime;

/// Name given to the parsed sequence ID in classifier output
const RESULT_KEY: &str = "_cladetime_seq_id";

/// Non-fatal conditions raised during assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentWarning {
    /// The input contained no sequence IDs; nothing was assigned
    NoSequences,
    /// The ID column is absent; nothing was assigned
    MissingIdColumn { column: String },
    /// More sequences than the configured threshold
    LargeRequest { count: usize, threshold: usize },
}

impl fmt::Display for AssignmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentWarning::NoSequences => {
                write!(f, "sequence metadata is empty; stopping clade assignment")
            }
            AssignmentWarning::MissingIdColumn { column } => write!(
                f,
                "sequence metadata has no {:?} column; stopping clade assignment",
                column
            ),
            AssignmentWarning::LargeRequest { count, threshold } => write!(
                f,
                "sequence count is {} (threshold {}): clade assignment will run longer than usual; \
                 consider assigning smaller subsets",
                count, threshold
            ),
        }
    }
}

/// Result of a clade assignment run
pub struct Clade {
    /// `None` when assignment was not performed
    pub provenance: Option<Provenance>,
    /// One row per input metadata row, with classifier columns joined on
    pub detail: LazyTable,
    /// Row counts grouped by the configured summary columns
    pub summary: LazyTable,
    pub warnings: Vec<AssignmentWarning>,
}

impl Clade {
    /// Provenance as a JSON object; `{}` if nothing was assigned
    pub fn meta(&self) -> serde_json::Value {
        self.provenance
            .as_ref()
            .and_then(|p| serde_json::to_value(p).ok())
            .unwrap_or_else(|| serde_json::json!({}))
    }

    pub fn is_assigned(&self) -> bool {
        self.provenance.is_some()
    }

    fn skipped(metadata: &LazyTable, warning: AssignmentWarning) -> CladetimeResult<Self> {
        warn!("{}", warning);
        let engine = metadata.engine();
        Ok(Self {
            provenance: None,
            detail: engine.empty()?,
            summary: engine.empty()?,
            warnings: vec![warning],
        })
    }
}

impl fmt::Debug for Clade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clade")
            .field("provenance", &self.provenance)
            .field("warnings", &self.warnings)
            .finish()
    }
}

/// Outcome of pulling sequence IDs from the metadata
#[derive(Debug, PartialEq, Eq)]
pub enum IdSet {
    Found(HashSet<String>),
    Empty,
    MissingColumn,
}

/// Distinct non-empty values of `column`
pub fn sequence_ids(table: &LazyTable, column: &str) -> CladetimeResult<IdSet> {
    if !table.has_column(column) {
        return Ok(IdSet::MissingColumn);
    }
    let ids: HashSet<String> = table
        .string_values(column)?
        .into_iter()
        .flatten()
        .filter(|id| !id.is_empty())
        .collect();
    if ids.is_empty() {
        Ok(IdSet::Empty)
    } else {
        Ok(IdSet::Found(ids))
    }
}

/// Keep only the standard metadata fields, in input order
fn normalize_columns(metadata: &LazyTable, config: &Config) -> CladetimeResult<LazyTable> {
    let allowed: HashSet<&str> = config
        .assignment
        .standard_metadata_fields
        .iter()
        .map(String::as_str)
        .collect();
    let columns = metadata.columns();
    let keep: Vec<&str> = columns
        .iter()
        .map(String::as_str)
        .filter(|c| allowed.contains(c))
        .collect();
    metadata.select_columns(&keep)
}

fn resolve_output_path(output: Option<&Path>, config: &Config) -> CladetimeResult<PathBuf> {
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.assignment_output_path());
    if path.is_dir() || path.file_name().is_none() {
        return Err(CladetimeError::InvalidInput(format!(
            "clade assignment output must be a file path, got {}",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(path)
}

pub(crate) fn assign_clades(
    ct: &CladeTime,
    metadata: &LazyTable,
    output: Option<&Path>,
) -> CladetimeResult<Clade> {
    let config = ct.config();
    let id_column = config.assignment.id_column.as_str();
    let mut warnings = Vec::new();

    if !metadata.has_column(id_column) {
        return Clade::skipped(
            metadata,
            AssignmentWarning::MissingIdColumn {
                column: id_column.to_string(),
            },
        );
    }
    let normalized = normalize_columns(metadata, config)?;

    let ids = match sequence_ids(&normalized, id_column)? {
        IdSet::Found(ids) => ids,
        IdSet::Empty => return Clade::skipped(metadata, AssignmentWarning::NoSequences),
        IdSet::MissingColumn => {
            return Clade::skipped(
                metadata,
                AssignmentWarning::MissingIdColumn {
                    column: id_column.to_string(),
                },
            )
        }
    };

    let threshold = config.assignment.warning_threshold;
    if ids.len() > threshold {
        let warning = AssignmentWarning::LargeRequest {
            count: ids.len(),
            threshold,
        };
        warn!("{}", warning);
        warnings.push(warning);
    }

    let output = resolve_output_path(output, config)?;

    info!(
        sequence_as_of = %ct.sequence_as_of(),
        tree_as_of = %ct.tree_as_of(),
        sequences = ids.len(),
        "Starting clade assignment"
    );

    let sequence_url = ct
        .url_sequence()
        .ok_or_else(|| CladetimeError::InvalidUrl("no sequence URL was resolved".to_string()))?;
    let scratch = ScratchDir::new("assign", config.assignment.preserve_scratch)?;
    let tree = ct.tree()?;

    let codec = Codec::from_name(sequence_url)?;
    let raw = scratch.join(&codec.file_name("sequences.fasta"));
    ct.providers().fetcher.download(sequence_url, &raw)?;
    let filtered = scratch.join("sequences_filtered.fasta");
    let stats = filter_sequence_file(&raw, &filtered, &ids)?;
    if stats.records_kept < ids.len() {
        warn!(
            requested = ids.len(),
            found = stats.records_kept,
            "Some sequences were not found in the sequence file"
        );
    }

    let request = tree.dataset_request()?;
    let classifier = &ct.providers().classifier;
    let dataset = classifier.fetch_dataset(&request, &scratch.subdir("dataset")?)?;

    info!(
        sequences = stats.records_kept,
        dataset_version = %request.dataset_version,
        "Assigning clades"
    );
    let assignments = classifier.assign(&request.classifier_version, &filtered, &dataset, &output)?;
    info!(output = %assignments.display(), "Clade assignments done");

    let results = ct.engine().load_tsv(&assignments)?;
    let keyed = key_results(&results, config)?;
    check_duplicates(&keyed)?;

    let detail = join_assignments(&normalized, &keyed, config)?;
    let summary = summarize(&detail, &config.assignment.summary_group_by)?;
    let sequences_assigned = count_labeled(&results, &config.assignment.clade_column)?;

    let metadata = tree.pipeline_metadata();
    let provenance = Provenance {
        sequences_to_assign: ids.len(),
        sequences_assigned,
        sequence_as_of: ct.sequence_as_of(),
        tree_as_of: ct.tree_as_of(),
        nextclade_dataset_version: metadata.nextclade_dataset_version.clone(),
        nextclade_dataset_name: metadata.nextclade_dataset_name.clone(),
        nextclade_version_num: metadata.nextclade_version_num.clone(),
        assignment_as_of: ct.providers().clock.now_seconds(),
    };

    Ok(Clade {
        provenance: Some(provenance),
        detail,
        summary,
        warnings,
    })
}

/// Add the sequence ID parsed from the classifier's name column
fn key_results(results: &LazyTable, config: &Config) -> CladetimeResult<LazyTable> {
    let name_column = config.assignment.result_id_column.as_str();
    if !results.has_column(name_column) {
        return Err(CladetimeError::MissingColumn(format!(
            "{} in clade assignment output",
            name_column
        )));
    }
    let engine = results.engine();
    engine.query(&[results], |names| {
        format!(
            "SELECT *, split_part({}, {}, 1) AS {} FROM {}",
            quote_ident(name_column),
            quote_literal(" "),
            quote_ident(RESULT_KEY),
            names[0]
        )
    })
}

fn check_duplicates(keyed: &LazyTable) -> CladetimeResult<()> {
    let engine = keyed.engine();
    let key = quote_ident(RESULT_KEY);
    let duplicates = engine
        .query(&[keyed], |names| {
            format!(
                "SELECT {key} FROM {} GROUP BY {key} HAVING COUNT(*) > 1 ORDER BY {key} LIMIT 1",
                names[0]
            )
        })?
        .string_values(RESULT_KEY)?;
    match duplicates.into_iter().next() {
        Some(id) => Err(CladetimeError::DuplicateAssignment(id.unwrap_or_default())),
        None => Ok(()),
    }
}

/// Left join classifier columns onto the metadata. Metadata columns win on
/// name collisions.
fn join_assignments(
    metadata: &LazyTable,
    keyed: &LazyTable,
    config: &Config,
) -> CladetimeResult<LazyTable> {
    let metadata_columns = metadata.columns();
    let taken: HashSet<&str> = metadata_columns.iter().map(String::as_str).collect();

    let mut select: Vec<String> = metadata_columns
        .iter()
        .map(|c| format!("m.{}", quote_ident(c)))
        .collect();
    select.extend(
        keyed
            .columns()
            .iter()
            .filter(|c| {
                c.as_str() != RESULT_KEY
                    && c.as_str() != config.assignment.result_id_column
                    && !taken.contains(c.as_str())
            })
            .map(|c| format!("r.{}", quote_ident(c))),
    );

    let engine = metadata.engine();
    engine.query(&[metadata, keyed], |names| {
        format!(
            "SELECT {} FROM {} m LEFT JOIN {} r ON m.{} = r.{}",
            select.join(", "),
            names[0],
            names[1],
            quote_ident(&config.assignment.id_column),
            quote_ident(RESULT_KEY)
        )
    })
}

/// Counts grouped by whichever of `group_by` exist in `detail`
pub fn summarize(detail: &LazyTable, group_by: &[String]) -> CladetimeResult<LazyTable> {
    let columns: Vec<String> = group_by
        .iter()
        .filter(|c| detail.has_column(c))
        .map(|c| quote_ident(c))
        .collect();
    let engine = detail.engine();
    engine.query(&[detail], |names| {
        let table = &names[0];
        if columns.is_empty() {
            format!("SELECT COUNT(*) AS \"count\" FROM {}", table)
        } else {
            let list = columns.join(", ");
            format!(
                "SELECT {list}, COUNT(*) AS \"count\" FROM {table} GROUP BY {list} ORDER BY {list}"
            )
        }
    })
}

fn count_labeled(results: &LazyTable, clade_column: &str) -> CladetimeResult<usize> {
    if !results.has_column(clade_column) {
        return Err(CladetimeError::MissingColumn(format!(
            "{} in clade assignment output",
            clade_column
        )));
    }
    Ok(results
        .string_values(clade_column)?
        .into_iter()
        .flatten()
        .filter(|label| !label.is_empty())
        .count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableEngine;

    #[test]
    fn test_sequence_ids() {
        let engine = TableEngine::new().unwrap();
        let table = engine
            .from_string_columns(&[("strain", vec![Some("a"), Some("b"), Some("a"), None, Some("")])])
            .unwrap();
        let expected: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(sequence_ids(&table, "strain").unwrap(), IdSet::Found(expected));
        assert_eq!(sequence_ids(&table, "accession").unwrap(), IdSet::MissingColumn);

        let blank = engine.from_string_columns(&[("strain", vec![None, Some("")])]).unwrap();
        assert_eq!(sequence_ids(&blank, "strain").unwrap(), IdSet::Empty);
    }

    #[test]
    fn test_normalize_drops_nonstandard_columns() {
        let engine = TableEngine::new().unwrap();
        let table = engine
            .from_string_columns(&[
                ("strain", vec![Some("X/1")]),
                ("clade_nextstrain", vec![Some("23A")]),
                ("QC_overall_status", vec![Some("good")]),
                ("host", vec![Some("Homo sapiens")]),
            ])
            .unwrap();
        let normalized = normalize_columns(&table, &Config::default()).unwrap();
        assert_eq!(normalized.columns(), vec!["strain", "host"]);
    }

    #[test]
    fn test_summarize_skips_absent_columns() {
        let engine = TableEngine::new().unwrap();
        let detail = engine
            .from_string_columns(&[
                ("clade_nextstrain", vec![Some("24C"), Some("24C"), None]),
                ("country", vec![Some("USA"), Some("USA"), Some("USA")]),
            ])
            .unwrap();
        let group_by = vec!["clade_nextstrain".to_string(), "location".to_string()];
        let summary = summarize(&detail, &group_by).unwrap();
        assert_eq!(summary.columns(), vec!["clade_nextstrain", "count"]);
        assert_eq!(summary.count().unwrap(), 2);

        let totals = summarize(&detail, &["location".to_string()]).unwrap();
        assert_eq!(totals.string_values("count").unwrap(), vec![Some("3".to_string())]);
    }

    #[test]
    fn test_output_path_must_be_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let err = resolve_output_path(Some(dir.path()), &config).unwrap_err();
        assert!(matches!(err, CladetimeError::InvalidInput(_)));

        let nested = dir.path().join("a/b/assignments.tsv");
        assert_eq!(resolve_output_path(Some(&nested), &config).unwrap(), nested);
        assert!(dir.path().join("a/b").is_dir());
    }

    #[test]
    fn test_empty_meta() {
        let engine = TableEngine::new().unwrap();
        let table = engine.from_string_columns(&[("strain", vec![])]).unwrap();
        let clade = Clade::skipped(&table, AssignmentWarning::NoSequences).unwrap();
        assert_eq!(clade.meta(), serde_json::json!({}));
        assert!(!clade.is_assigned());
        assert_eq!(clade.detail.count().unwrap(), 0);
    }
}
