//! CLI subcommand implementations.

pub mod build;
pub mod init;
pub mod populate;
pub mod status;

use colored::Colorize;
use sluice::{Curator, PopulateReport, Registry};

use crate::config::JobConfig;
use crate::discover::Input;

/// Open the curator and register everything the config names. Unknown
/// names and malformed parameter bags fail here, before any work starts.
pub(crate) fn curator_from_config(
    config: &JobConfig,
) -> Result<Curator, Box<dyn std::error::Error>> {
    let registry = Registry::builtin();
    let mut curator = Curator::open(&config.store)?;
    for (name, params) in &config.producers {
        curator.add_producer(registry.producer_from_config(name, params)?)?;
    }
    for (name, params) in &config.rules {
        curator.add_rule(registry.rule_from_config(name, params)?);
    }
    Ok(curator)
}

/// Walk every configured input and collect the candidate paths.
pub(crate) fn discover_candidates(
    config: &JobConfig,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut candidates = Vec::new();
    for input_config in &config.inputs {
        let input = Input::new(&input_config.folder, &input_config.patterns)?;
        for path in input.paths() {
            candidates.push(path.to_string_lossy().into_owned());
        }
    }
    Ok(candidates)
}

/// Print what a populate run accomplished.
pub(crate) fn print_populate_summary(report: &PopulateReport) {
    println!(
        "Processed {} rows in {} chunks ({} checkpoints)",
        report.rows_processed.to_string().white().bold(),
        report.chunks_completed,
        report.checkpoints
    );
    if !report.failures.is_empty() {
        println!(
            "{} {} attribute computations failed; cells left empty",
            "warning:".yellow().bold(),
            report.failures.len().to_string().yellow()
        );
    }
    if report.cancelled {
        println!(
            "{}",
            "Interrupted - accumulated progress was saved".yellow().bold()
        );
    }
}
