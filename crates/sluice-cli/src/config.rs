//! Job configuration: inputs, producers, rules, and engine tuning.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use sluice::{FilterOptions, PopulateOptions};

/// One input folder with its glob patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub folder: PathBuf,
    pub patterns: Vec<String>,
}

/// A full curation job. Producer and rule maps keep their declaration
/// order; rules run in the order they appear here.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobConfig {
    /// Where the ledger store lives.
    pub store: PathBuf,
    /// Input folders to discover files in.
    pub inputs: Vec<InputConfig>,
    /// Producer name to parameter bag.
    #[serde(default)]
    pub producers: IndexMap<String, JsonValue>,
    /// Rule name to parameter bag, in application order.
    #[serde(default)]
    pub rules: IndexMap<String, JsonValue>,
    /// Rows per population chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Checkpoint after this many chunks.
    #[serde(default = "default_checkpoint_chunks")]
    pub checkpoint_chunks: usize,
    /// Checkpoint after this many seconds, whichever comes first.
    #[serde(default = "default_checkpoint_interval_secs")]
    pub checkpoint_interval_secs: u64,
    /// Column the surviving list is sorted by.
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    /// Where `build` writes the surviving list; stdout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_list: Option<PathBuf>,
}

fn default_chunk_size() -> usize {
    100
}

fn default_checkpoint_chunks() -> usize {
    8
}

fn default_checkpoint_interval_secs() -> u64 {
    60
}

fn default_sort_by() -> String {
    "path".to_string()
}

impl JobConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| format!("cannot open config '{}': {}", path.display(), e))?;
        let config: JobConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| format!("cannot parse config '{}': {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| format!("cannot write config '{}': {}", path.display(), e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn populate_options(&self) -> PopulateOptions {
        PopulateOptions {
            chunk_size: self.chunk_size,
            checkpoint_chunks: self.checkpoint_chunks,
            checkpoint_interval: Duration::from_secs(self.checkpoint_interval_secs),
        }
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            sort_by: self.sort_by.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let json = r#"{
            "store": "db.ledger",
            "inputs": [{ "folder": "/data", "patterns": ["**/*.png"] }]
        }"#;
        let config: JobConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.chunk_size, 100);
        assert_eq!(config.checkpoint_interval_secs, 60);
        assert_eq!(config.sort_by, "path");
        assert!(config.producers.is_empty());
    }

    #[test]
    fn test_rule_order_is_preserved() {
        let json = r#"{
            "store": "db.ledger",
            "inputs": [],
            "rules": {
                "resolution": {},
                "modified": {},
                "duplicates": {}
            }
        }"#;
        let config: JobConfig = serde_json::from_str(json).unwrap();
        let order: Vec<&String> = config.rules.keys().collect();
        assert_eq!(order, vec!["resolution", "modified", "duplicates"]);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");

        let config: JobConfig = serde_json::from_str(
            r#"{ "store": "db.ledger", "inputs": [], "chunk_size": 25 }"#,
        )
        .unwrap();
        config.save(&path).unwrap();

        let reloaded = JobConfig::load(&path).unwrap();
        assert_eq!(reloaded.chunk_size, 25);
    }
}
