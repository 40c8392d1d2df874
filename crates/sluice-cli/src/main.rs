//! Sluice CLI - incremental dataset curation for image collections.

mod cli;
mod commands;
mod config;
mod discover;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "sluice=debug,sluice_cli=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Build { config, output } => commands::build::run(config, output, cli.verbose),

        Commands::Populate { config } => commands::populate::run(config, cli.verbose),

        Commands::Status { store, json } => commands::status::run(store, json, cli.verbose),

        Commands::Init { output } => commands::init::run(output, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
