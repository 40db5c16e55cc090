pub mod commands;
pub mod output;

use clap::{Args, Parser, Subcommand};
use cladetime::{AsOf, Config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cladetime",
    version,
    about = "Time-travel access to Nextstrain SARS-CoV-2 sequence data",
    long_about = "Cladetime resolves the Nextstrain SARS-CoV-2 sequence files, sequence metadata \
                  and Nextclade reference data exactly as they were published at a past date, \
                  and assigns clades to sequences using the reference tree of that date."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (TOML); built-in defaults when omitted
    #[arg(short, long, global = true, value_name = "PATH", env = "CLADETIME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Fail on unparseable dates instead of falling back to now
    #[arg(long, global = true)]
    pub strict_dates: bool,
}

impl Cli {
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => cladetime::load_config(path)?,
            None => Config::default(),
        };
        if self.strict_dates {
            config.dates.policy = cladetime::DatePolicy::Strict;
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the data versions resolved for a date
    Urls(commands::urls::UrlsArgs),

    /// Show or save the Nextclade reference tree for a date
    Tree(commands::tree::TreeArgs),

    /// Assign clades to US human sequences collected in a date window
    Assign(commands::assign::AssignArgs),
}

/// Snapshot dates shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct AsOfArgs {
    /// Sequence snapshot date (YYYY-MM-DD or timestamp); defaults to now
    #[arg(short = 's', long, value_name = "DATE")]
    pub sequence_as_of: Option<String>,

    /// Reference tree snapshot date; defaults to the sequence date
    #[arg(short = 't', long, value_name = "DATE")]
    pub tree_as_of: Option<String>,
}

impl AsOfArgs {
    pub fn sequence(&self) -> Option<AsOf> {
        self.sequence_as_of.clone().map(AsOf::from)
    }

    pub fn tree(&self) -> Option<AsOf> {
        self.tree_as_of.clone().map(AsOf::from)
    }
}
