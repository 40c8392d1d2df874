//! Build command - discover, populate, filter, and emit the file list.

use std::fs;
use std::path::PathBuf;

use colored::Colorize;
use sluice::CancelToken;

use crate::config::JobConfig;

use super::{curator_from_config, discover_candidates, print_populate_summary};

pub fn run(
    config_path: PathBuf,
    output: Option<PathBuf>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = JobConfig::load(&config_path)?;
    let mut curator = curator_from_config(&config)?;

    let candidates = discover_candidates(&config)?;
    println!(
        "{} {} candidate files",
        "Discovered".cyan().bold(),
        candidates.len().to_string().white()
    );
    curator.add_paths(candidates.clone())?;

    let token = CancelToken::new();
    {
        let token = token.clone();
        ctrlc::set_handler(move || token.cancel())?;
    }

    let report = curator.populate(&config.populate_options(), &token)?;
    print_populate_summary(&report);
    if report.cancelled {
        return Ok(());
    }

    let surviving = curator.filter(&candidates, &config.filter_options())?;
    println!(
        "{} {} of {} files",
        "Keeping".green().bold(),
        surviving.len().to_string().white().bold(),
        candidates.len()
    );

    if verbose {
        for (name, params) in &config.rules {
            tracing::debug!(rule = %name, params = %params, "applied");
        }
    }

    match output.or_else(|| config.output_list.clone()) {
        Some(path) => {
            let mut body = surviving.join("\n");
            if !body.is_empty() {
                body.push('\n');
            }
            fs::write(&path, body)?;
            println!(
                "{} {}",
                "Wrote".green().bold(),
                path.display().to_string().white()
            );
        }
        None => {
            for path in &surviving {
                println!("{}", path);
            }
        }
    }

    Ok(())
}
