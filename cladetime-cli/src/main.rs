use clap::Parser;
use colored::*;
use std::process;
use tracing_subscriber::EnvFilter;

mod cli;

use crate::cli::{Cli, Commands};
use cladetime_core::CladetimeError;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins, then CLADETIME_LOG, then -v
    let log_level = std::env::var("CLADETIME_LOG").unwrap_or_else(|_| {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
        .to_string()
    });

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        let exit_code = match e.downcast_ref::<CladetimeError>() {
            Some(CladetimeError::Configuration(_)) => 2,
            Some(CladetimeError::Io(_)) => 3,
            Some(err) if err.is_data_unavailable() => 4,
            Some(err) if err.is_resource_unavailable() => 5,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.load_config()?;

    match cli.command {
        Commands::Urls(args) => crate::cli::commands::urls::run(args, config),
        Commands::Tree(args) => crate::cli::commands::tree::run(args, config),
        Commands::Assign(args) => crate::cli::commands::assign::run(args, config),
    }
}
