use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use cladetime::{filter_collection_dates, filter_sequence_metadata, CladeTime, Config, StateFormat};
use std::path::PathBuf;

use crate::cli::output::*;
use crate::cli::AsOfArgs;

/// Columns pulled from Nextstrain metadata before assignment
const METADATA_COLUMNS: &[&str] = &["strain", "clade_nextstrain", "country", "date", "division", "host"];

#[derive(Args)]
pub struct AssignArgs {
    #[command(flatten)]
    pub dates: AsOfArgs,

    /// Earliest sequence collection date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub collection_min_date: Option<NaiveDate>,

    /// Latest sequence collection date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub collection_max_date: Option<NaiveDate>,

    /// How locations are written: abbr, name or fips
    #[arg(long, default_value = "abbr")]
    pub state_format: StateFormat,

    /// Directory for the detail, summary and provenance files
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,
}

pub fn run(args: AssignArgs, config: Config) -> Result<()> {
    if let (Some(min), Some(max)) = (args.collection_min_date, args.collection_max_date) {
        anyhow::ensure!(min <= max, "collection window is empty: {} is after {}", min, max);
    }

    let ct = CladeTime::live(config, args.dates.sequence(), args.dates.tree())?;
    super::report_date_warnings(ct.warnings());

    action(&format!("Loading sequence metadata as of {}", ct.sequence_as_of()));
    let metadata = ct.sequence_metadata()?;
    let filtered = filter_sequence_metadata(&metadata, Some(METADATA_COLUMNS), args.state_format)?;
    let filtered = filter_collection_dates(&filtered, args.collection_min_date, args.collection_max_date)?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;
    let nextclade_output = args.output_dir.join("nextclade_assignments.tsv");

    action(&format!("Assigning clades with the reference tree as of {}", ct.tree_as_of()));
    let clade = ct.assign_clades(&filtered, Some(&nextclade_output))?;
    for warning in &clade.warnings {
        crate::cli::output::warning(&warning.to_string());
    }
    if !clade.is_assigned() {
        return Ok(());
    }

    let detail_path = args.output_dir.join("clade_assignments.tsv");
    let summary_path = args.output_dir.join("clade_summary.tsv");
    let meta_path = args.output_dir.join("provenance.json");
    let rows = clade.detail.write_tsv(&detail_path)?;
    let groups = clade.summary.write_tsv(&summary_path)?;
    std::fs::write(&meta_path, serde_json::to_vec_pretty(&clade.meta())?)
        .with_context(|| format!("Failed to write {}", meta_path.display()))?;

    success(&format!("Assigned clades to {} sequences", rows));
    tree_items(&[
        ("detail", detail_path.display().to_string()),
        ("summary", format!("{} ({} groups)", summary_path.display(), groups)),
        ("provenance", meta_path.display().to_string()),
    ]);
    Ok(())
}
