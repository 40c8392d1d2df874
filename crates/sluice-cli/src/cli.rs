//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sluice: incremental dataset curation for image collections
#[derive(Parser)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover files, fill missing attributes, filter, and emit the
    /// surviving file list
    Build {
        /// Path to the job configuration (JSON)
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Where to write the surviving list (default: config's
        /// output_list, or stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Discover files and fill missing attributes without filtering
    Populate {
        /// Path to the job configuration (JSON)
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Summarize a ledger store: rows, columns, and missing values
    Status {
        /// Path to the ledger store
        #[arg(value_name = "STORE")]
        store: PathBuf,

        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a starter job configuration with every built-in listed
    Init {
        /// Where to write the configuration
        #[arg(value_name = "FILE", default_value = "sluice.json")]
        output: PathBuf,
    },
}
