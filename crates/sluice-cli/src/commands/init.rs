//! Init command - write a starter job configuration.

use std::path::PathBuf;

use colored::Colorize;
use indexmap::IndexMap;
use sluice::Registry;

use crate::config::{InputConfig, JobConfig};

pub fn run(output: PathBuf, _verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    if output.exists() {
        return Err(format!("refusing to overwrite existing '{}'", output.display()).into());
    }

    let registry = Registry::builtin();
    let producers: IndexMap<String, serde_json::Value> = registry
        .producer_templates()
        .into_iter()
        .map(|(name, template)| (name.to_string(), template))
        .collect();
    let rules: IndexMap<String, serde_json::Value> = registry
        .rule_templates()
        .into_iter()
        .map(|(name, template)| (name.to_string(), template))
        .collect();

    let config = JobConfig {
        store: PathBuf::from("dataset.ledger"),
        inputs: vec![InputConfig {
            folder: PathBuf::from("."),
            patterns: vec!["**/*.png".to_string(), "**/*.jpg".to_string()],
        }],
        producers,
        rules,
        chunk_size: 100,
        checkpoint_chunks: 8,
        checkpoint_interval_secs: 60,
        sort_by: "path".to_string(),
        output_list: Some(PathBuf::from("keep.txt")),
    };
    config.save(&output)?;

    println!(
        "{} {}",
        "Wrote starter config to".green().bold(),
        output.display().to_string().white()
    );
    println!("Every built-in producer and rule is listed; prune what you don't need.");
    Ok(())
}
