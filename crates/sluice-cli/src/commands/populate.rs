//! Populate command - fill missing attributes without filtering.

use std::path::PathBuf;

use colored::Colorize;
use sluice::CancelToken;

use crate::config::JobConfig;

use super::{curator_from_config, discover_candidates, print_populate_summary};

pub fn run(config_path: PathBuf, _verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = JobConfig::load(&config_path)?;
    let mut curator = curator_from_config(&config)?;

    let candidates = discover_candidates(&config)?;
    let added = curator.add_paths(candidates.clone())?;
    println!(
        "{} {} candidate files{}",
        "Discovered".cyan().bold(),
        candidates.len().to_string().white(),
        if added { "" } else { " (none new)" }
    );

    let token = CancelToken::new();
    {
        let token = token.clone();
        ctrlc::set_handler(move || token.cancel())?;
    }

    let report = curator.populate(&config.populate_options(), &token)?;
    print_populate_summary(&report);

    println!(
        "Ledger now tracks {} files at {}",
        curator.ledger().height().to_string().white().bold(),
        config.store.display().to_string().white()
    );
    Ok(())
}
