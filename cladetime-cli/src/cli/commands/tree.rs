use anyhow::{Context, Result};
use clap::Args;
use cladetime::{CladeTime, Config};
use std::path::PathBuf;

use crate::cli::output::*;
use crate::cli::AsOfArgs;

#[derive(Args)]
pub struct TreeArgs {
    #[command(flatten)]
    pub dates: AsOfArgs,

    /// Download the tree and save it here (needs Docker)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(args: TreeArgs, config: Config) -> Result<()> {
    let ct = CladeTime::live(config, args.dates.sequence(), args.dates.tree())?;
    super::report_date_warnings(ct.warnings());
    let tree = ct.tree()?;

    println!("{}", tree);
    println!("{}", tree.tree_url()?);

    if let Some(path) = args.output {
        action("Fetching reference tree from the Nextclade dataset");
        let document = tree.tree()?;
        std::fs::write(&path, serde_json::to_vec(&document)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        success(&format!("Saved tree to {}", path.display()));
    }
    Ok(())
}
