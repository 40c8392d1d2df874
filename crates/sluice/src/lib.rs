//! Sluice: an incremental file-attribute ledger and rule engine for
//! curating image datasets.
//!
//! Sluice maintains a persistent, path-keyed table of per-file attributes
//! (the *ledger*), fills missing attributes exactly once via pluggable
//! *producers*, and narrows a candidate file set through pluggable *rules*.
//! Population is crash-safe: work is chunked, checkpointed to disk, and
//! resumes from wherever the last checkpoint left off.
//!
//! # Core Principles
//!
//! - **Compute once**: every attribute is computed when first needed and
//!   cached in the ledger; reruns only touch rows with missing values.
//! - **Schema grows monotonically**: registering a new producer extends the
//!   table non-destructively; nothing already computed is lost.
//! - **Crash-safe forward progress**: periodic checkpoints bound how much
//!   work an interruption can cost.
//!
//! # Example
//!
//! ```no_run
//! use sluice::{CancelToken, Curator, FilterOptions, PopulateOptions, Registry};
//!
//! # fn main() -> sluice::Result<()> {
//! let registry = Registry::builtin();
//!
//! let mut curator = Curator::open("photos.ledger")?;
//! curator.add_producer(registry.producer_from_config("file_info", &serde_json::json!({}))?)?;
//! curator.add_rule(registry.rule_from_config(
//!     "modified",
//!     &serde_json::json!({ "after": "2015-01-01" }),
//! )?);
//!
//! let candidates = vec!["/data/a.png".to_string(), "/data/b.png".to_string()];
//! curator.add_paths(candidates.clone())?;
//! curator.populate(&PopulateOptions::default(), &CancelToken::new())?;
//!
//! let surviving = curator.filter(&candidates, &FilterOptions::default())?;
//! println!("keeping {} files", surviving.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod filter;
pub mod frame;
pub mod ledger;
pub mod populate;
pub mod producer;
pub mod registry;
pub mod rules;

mod curator;

pub use crate::curator::Curator;
pub use crate::error::{Result, SluiceError};
pub use crate::filter::{FilterOptions, filter_paths};
pub use crate::frame::{Column, ColumnType, Expr, Frame, Schema, Value};
pub use crate::ledger::{Ledger, PATH_COLUMN};
pub use crate::populate::{
    CancelToken, PopulateOptions, PopulateReport, RowFailure, populate,
};
pub use crate::producer::{
    FileInfoProducer, HashAlgorithm, ImageHashProducer, ImageShapeProducer, Producer,
    ProducerSet, RowView, Stage, StageFn, StageOutput,
};
pub use crate::registry::Registry;
pub use crate::rules::{
    ChannelRule, ColumnRef, ContextFn, DuplicateResolver, DuplicateRule, LimitRule, Matcher,
    ModifiedRule, PathListRule, ResolutionRule, Rule,
};
