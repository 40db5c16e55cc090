use anyhow::Result;
use clap::Args;
use cladetime::{CladeTime, Config};

use crate::cli::output::*;
use crate::cli::AsOfArgs;

#[derive(Args)]
pub struct UrlsArgs {
    #[command(flatten)]
    pub dates: AsOfArgs,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: UrlsArgs, config: Config) -> Result<()> {
    let ct = CladeTime::live(config, args.dates.sequence(), args.dates.tree())?;
    super::report_date_warnings(ct.warnings());
    let metadata = ct.pipeline_metadata()?;

    if args.json {
        let value = serde_json::json!({
            "sequence_as_of": ct.sequence_as_of(),
            "tree_as_of": ct.tree_as_of(),
            "url_sequence": ct.url_sequence(),
            "url_sequence_metadata": ct.url_sequence_metadata(),
            "url_pipeline_metadata": ct.url_pipeline_metadata(),
            "pipeline_metadata": metadata,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    section_header("Resolved data versions");
    tree_items(&[
        ("sequence_as_of", ct.sequence_as_of().to_string()),
        ("tree_as_of", ct.tree_as_of().to_string()),
        ("sequences", ct.url_sequence().unwrap_or_default().to_string()),
        ("sequence metadata", ct.url_sequence_metadata().unwrap_or_default().to_string()),
        ("pipeline metadata", ct.metadata_source().to_string()),
    ]);

    section_header("Pipeline metadata");
    tree_items(&[
        ("nextclade version", metadata.nextclade_version_num.clone()),
        ("dataset", metadata.dataset_path().to_string()),
        ("dataset version", metadata.nextclade_dataset_version.clone()),
    ]);
    Ok(())
}
